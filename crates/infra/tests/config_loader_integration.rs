//! Integration tests for configuration loader
//!
//! Loads real files from disk and checks that the result validates.

use std::path::PathBuf;

use tempfile::TempDir;
use trainpulse_domain::TrainPulseError;
use trainpulse_infra::config;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn test_full_toml_file_loads_and_validates() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        &dir,
        "trainpulse.toml",
        r#"
[device]
name = "Kitchen display"
serial_number = "TP-0100"
update_interval_secs = 45

[route]
origin = "KGX"
destination = "CBG"

[api]
username = "rttuser"
password = "rttpass"
base_url = "https://api.example.test/api/v1/json"
timeout_secs = 5
max_retries = 2

[breaker]
failure_threshold = 4
success_threshold = 1
timeout_secs = 30

[runtime]
exit_after_secs = 600
"#,
    );

    let config = config::load_from_file(Some(path)).expect("load toml");
    config.validate().expect("valid config");

    assert_eq!(config.device.name, "Kitchen display");
    assert_eq!(config.device.update_interval().as_secs(), 45);
    assert_eq!(config.api.timeout().as_secs(), 5);
    assert_eq!(config.breaker.timeout().as_secs(), 30);
    assert_eq!(config.runtime.exit_after_secs, Some(600));
}

#[test]
fn test_minimal_json_file_fills_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        &dir,
        "config.json",
        r#"{ "route": { "origin": "BTN", "destination": "VIC" },
             "api": { "username": "u", "password": "p" } }"#,
    );

    let config = config::load_from_file(Some(path)).expect("load json");
    config.validate().expect("valid config");

    assert_eq!(config.device.update_interval_secs, 60);
    assert_eq!(config.api.max_retries, 3);
    assert_eq!(config.breaker.failure_threshold, 5);
    assert_eq!(config.breaker.success_threshold, 2);
}

#[test]
fn test_file_that_parses_can_still_fail_validation() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        &dir,
        "trainpulse.toml",
        r#"
[route]
origin = "KINGS CROSS"
destination = "CBG"

[api]
username = "u"
password = "p"
"#,
    );

    let config = config::load_from_file(Some(path)).expect("parses");
    let err = config.validate().unwrap_err();

    assert!(matches!(err, TrainPulseError::Config(_)));
}

#[test]
fn test_password_is_not_serialized_back_out() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        &dir,
        "trainpulse.toml",
        "[route]\norigin = \"KGX\"\ndestination = \"CBG\"\n\n[api]\nusername = \"u\"\npassword = \"hunter2\"\n",
    );

    let config = config::load_from_file(Some(path)).expect("load");
    let json = serde_json::to_string(&config).expect("serialize");

    assert!(!json.contains("hunter2"));
    assert!(!format!("{config:?}").contains("hunter2"));
}
