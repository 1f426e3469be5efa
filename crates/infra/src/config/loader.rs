//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Attempt to load from environment variables
//! 2. If a required variable is missing, fall back to a config file
//! 3. The file is `TRAINPULSE_CONFIG` when set, otherwise the first existing
//!    candidate
//! 4. JSON and TOML are both accepted, chosen by extension
//!
//! ## Environment Variables
//! Required:
//! - `TRAINPULSE_ORIGIN`, `TRAINPULSE_DESTINATION`: CRS station codes
//! - `TRAINPULSE_API_USERNAME`, `TRAINPULSE_API_PASSWORD`: rail API credentials
//!
//! Optional:
//! - `TRAINPULSE_DEVICE_NAME`, `TRAINPULSE_DEVICE_SERIAL`
//! - `TRAINPULSE_UPDATE_INTERVAL_SECS`
//! - `TRAINPULSE_API_BASE_URL`, `TRAINPULSE_API_TIMEOUT_SECS`,
//!   `TRAINPULSE_MAX_RETRIES`
//! - `TRAINPULSE_BREAKER_FAILURE_THRESHOLD`,
//!   `TRAINPULSE_BREAKER_SUCCESS_THRESHOLD`, `TRAINPULSE_BREAKER_TIMEOUT_SECS`
//! - `TRAINPULSE_EXIT_AFTER_SECS`
//!
//! ## File Locations
//! Searched in order, first in the working directory then next to the
//! executable: `trainpulse.toml`, `trainpulse.json`, `config.toml`,
//! `config.json`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use trainpulse_domain::{
    AppConfig, BreakerSettings, DeviceConfig, RailApiConfig, Result, RouteConfig,
    RuntimeConfig, TrainPulseError,
};

const CONFIG_PATH_VAR: &str = "TRAINPULSE_CONFIG";
const PASSWORD_VAR: &str = "TRAINPULSE_API_PASSWORD";
const REQUIRED_VARS: [&str; 4] =
    ["TRAINPULSE_ORIGIN", "TRAINPULSE_DESTINATION", "TRAINPULSE_API_USERNAME", PASSWORD_VAR];
const CANDIDATE_FILES: [&str; 4] =
    ["trainpulse.toml", "trainpulse.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns the environment loader's `TrainPulseError::Config` when every
/// required variable is set but another one does not parse. Otherwise
/// returns the file loader's error when no usable file is found.
pub fn load() -> Result<AppConfig> {
    if let Some(variable) = first_missing_required() {
        tracing::debug!(variable, "Environment incomplete, trying config file");
        return load_from_file(std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));
    }

    let config = load_from_env()?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from `TRAINPULSE_*` environment variables
///
/// # Errors
/// Returns `TrainPulseError::Config` if a required variable is missing or a
/// numeric variable does not parse.
pub fn load_from_env() -> Result<AppConfig> {
    let route = RouteConfig {
        origin: env_var("TRAINPULSE_ORIGIN")?,
        destination: env_var("TRAINPULSE_DESTINATION")?,
    };

    let mut api = RailApiConfig::new(
        env_var("TRAINPULSE_API_USERNAME")?,
        env_secret(PASSWORD_VAR)?,
    );
    if let Some(base_url) = env_opt("TRAINPULSE_API_BASE_URL") {
        api.base_url = base_url;
    }
    if let Some(timeout) = env_parse("TRAINPULSE_API_TIMEOUT_SECS")? {
        api.timeout_secs = timeout;
    }
    if let Some(retries) = env_parse("TRAINPULSE_MAX_RETRIES")? {
        api.max_retries = retries;
    }

    let mut device = DeviceConfig::default();
    if let Some(name) = env_opt("TRAINPULSE_DEVICE_NAME") {
        device.name = name;
    }
    if let Some(serial) = env_opt("TRAINPULSE_DEVICE_SERIAL") {
        device.serial_number = serial;
    }
    if let Some(interval) = env_parse("TRAINPULSE_UPDATE_INTERVAL_SECS")? {
        device.update_interval_secs = interval;
    }

    let mut breaker = BreakerSettings::default();
    if let Some(threshold) = env_parse("TRAINPULSE_BREAKER_FAILURE_THRESHOLD")? {
        breaker.failure_threshold = threshold;
    }
    if let Some(threshold) = env_parse("TRAINPULSE_BREAKER_SUCCESS_THRESHOLD")? {
        breaker.success_threshold = threshold;
    }
    if let Some(timeout) = env_parse("TRAINPULSE_BREAKER_TIMEOUT_SECS")? {
        breaker.timeout_secs = timeout;
    }

    let runtime = RuntimeConfig { exit_after_secs: env_parse("TRAINPULSE_EXIT_AFTER_SECS")? };

    Ok(AppConfig { device, route, api, breaker, runtime })
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations.
///
/// # Errors
/// Returns `TrainPulseError::Config` if the file is missing, unreadable, or
/// not valid JSON/TOML for [`AppConfig`].
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TrainPulseError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            TrainPulseError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TrainPulseError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TrainPulseError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TrainPulseError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TrainPulseError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard candidates
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    first_existing_in(&dirs)
}

fn first_existing_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CANDIDATE_FILES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

fn first_missing_required() -> Option<&'static str> {
    REQUIRED_VARS.into_iter().find(|key| {
        if *key == PASSWORD_VAR {
            env_raw(key).is_none()
        } else {
            env_opt(key).is_none()
        }
    })
}

fn missing(key: &str) -> TrainPulseError {
    TrainPulseError::Config(format!("Missing required environment variable: {key}"))
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| missing(key))
}

/// Credentials keep their surrounding whitespace
fn env_secret(key: &str) -> Result<String> {
    env_raw(key).ok_or_else(|| missing(key))
}

/// Set and non-empty, untouched
fn env_raw(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Set and non-blank, trimmed
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| TrainPulseError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 15] = [
        "TRAINPULSE_CONFIG",
        "TRAINPULSE_ORIGIN",
        "TRAINPULSE_DESTINATION",
        "TRAINPULSE_API_USERNAME",
        "TRAINPULSE_API_PASSWORD",
        "TRAINPULSE_API_BASE_URL",
        "TRAINPULSE_API_TIMEOUT_SECS",
        "TRAINPULSE_MAX_RETRIES",
        "TRAINPULSE_DEVICE_NAME",
        "TRAINPULSE_DEVICE_SERIAL",
        "TRAINPULSE_UPDATE_INTERVAL_SECS",
        "TRAINPULSE_BREAKER_FAILURE_THRESHOLD",
        "TRAINPULSE_BREAKER_SUCCESS_THRESHOLD",
        "TRAINPULSE_BREAKER_TIMEOUT_SECS",
        "TRAINPULSE_EXIT_AFTER_SECS",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn set_required_env() {
        std::env::set_var("TRAINPULSE_ORIGIN", "KGX");
        std::env::set_var("TRAINPULSE_DESTINATION", "CBG");
        std::env::set_var("TRAINPULSE_API_USERNAME", "user");
        std::env::set_var("TRAINPULSE_API_PASSWORD", "pass");
    }

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create config file");
        file.write_all(contents.as_bytes()).expect("write config file");
        path
    }

    const TOML_CONFIG: &str = r#"
[device]
name = "Commute"
update_interval_secs = 30

[route]
origin = "PAD"
destination = "RDG"

[api]
username = "file-user"
password = "file-pass"
max_retries = 1

[breaker]
failure_threshold = 3
"#;

    #[test]
    fn test_load_from_env_required_only() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required_env();

        let config = load_from_env().expect("env config");

        assert_eq!(config.route.origin, "KGX");
        assert_eq!(config.route.destination, "CBG");
        assert_eq!(config.api.username, "user");
        assert_eq!(config.device, DeviceConfig::default());
        assert_eq!(config.breaker, BreakerSettings::default());
        assert_eq!(config.runtime.exit_after_secs, None);
        config.validate().expect("defaults are valid");

        clear_env();
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required_env();
        std::env::set_var("TRAINPULSE_API_BASE_URL", "http://localhost:9000");
        std::env::set_var("TRAINPULSE_API_TIMEOUT_SECS", "4");
        std::env::set_var("TRAINPULSE_MAX_RETRIES", "0");
        std::env::set_var("TRAINPULSE_DEVICE_NAME", "Morning train");
        std::env::set_var("TRAINPULSE_DEVICE_SERIAL", "TP-0042");
        std::env::set_var("TRAINPULSE_UPDATE_INTERVAL_SECS", "15");
        std::env::set_var("TRAINPULSE_BREAKER_FAILURE_THRESHOLD", "2");
        std::env::set_var("TRAINPULSE_BREAKER_SUCCESS_THRESHOLD", "1");
        std::env::set_var("TRAINPULSE_BREAKER_TIMEOUT_SECS", "5");
        std::env::set_var("TRAINPULSE_EXIT_AFTER_SECS", "120");

        let config = load_from_env().expect("env config");

        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.api.timeout_secs, 4);
        assert_eq!(config.api.max_retries, 0);
        assert_eq!(config.device.name, "Morning train");
        assert_eq!(config.device.serial_number, "TP-0042");
        assert_eq!(config.device.update_interval_secs, 15);
        assert_eq!(
            config.breaker,
            BreakerSettings { failure_threshold: 2, success_threshold: 1, timeout_secs: 5 }
        );
        assert_eq!(config.runtime.exit_after_secs, Some(120));

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("TRAINPULSE_ORIGIN", "KGX");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, TrainPulseError::Config(ref msg) if msg.contains("TRAINPULSE_DESTINATION")));

        clear_env();
    }

    #[test]
    fn test_blank_required_var_counts_as_missing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required_env();
        std::env::set_var("TRAINPULSE_API_USERNAME", "   ");

        assert!(load_from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_password_whitespace_is_preserved() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required_env();
        std::env::set_var("TRAINPULSE_API_PASSWORD", "  s3cret \t");

        let config = load_from_env().expect("env config");

        assert_eq!(config.api.password, "  s3cret \t");

        clear_env();
    }

    #[test]
    fn test_empty_password_counts_as_missing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required_env();
        std::env::set_var("TRAINPULSE_API_PASSWORD", "");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, TrainPulseError::Config(ref msg) if msg.contains("TRAINPULSE_API_PASSWORD")));

        clear_env();
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required_env();
        std::env::set_var("TRAINPULSE_UPDATE_INTERVAL_SECS", "soon");

        let err = load_from_env().unwrap_err();
        assert!(
            matches!(err, TrainPulseError::Config(ref msg) if msg.contains("TRAINPULSE_UPDATE_INTERVAL_SECS"))
        );

        clear_env();
    }

    #[test]
    fn test_load_falls_back_to_config_var_file() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(&dir, "commute.toml", TOML_CONFIG);
        std::env::set_var("TRAINPULSE_CONFIG", &path);

        let config = load().expect("file config");

        assert_eq!(config.route.origin, "PAD");
        assert_eq!(config.api.username, "file-user");

        clear_env();
    }

    #[test]
    fn test_load_reports_invalid_env_value_instead_of_falling_back() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required_env();
        std::env::set_var("TRAINPULSE_UPDATE_INTERVAL_SECS", "sixty");
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(&dir, "commute.toml", TOML_CONFIG);
        std::env::set_var("TRAINPULSE_CONFIG", &path);

        let err = load().unwrap_err();
        assert!(
            matches!(err, TrainPulseError::Config(ref msg) if msg.contains("TRAINPULSE_UPDATE_INTERVAL_SECS")),
            "{err:?}"
        );

        clear_env();
    }

    #[test]
    fn test_load_prefers_complete_env_over_file() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required_env();
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(&dir, "commute.toml", TOML_CONFIG);
        std::env::set_var("TRAINPULSE_CONFIG", &path);

        let config = load().expect("env config");

        assert_eq!(config.route.origin, "KGX");
        assert_eq!(config.api.username, "user");

        clear_env();
    }

    #[test]
    fn test_load_from_file_toml_applies_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(&dir, "trainpulse.toml", TOML_CONFIG);

        let config = load_from_file(Some(path)).expect("toml config");

        assert_eq!(config.device.name, "Commute");
        assert_eq!(config.device.update_interval_secs, 30);
        assert_eq!(config.device.serial_number, DeviceConfig::default().serial_number);
        assert_eq!(config.api.max_retries, 1);
        assert_eq!(config.api.base_url, RailApiConfig::new("u", "p").base_url);
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.breaker.success_threshold, BreakerSettings::default().success_threshold);
    }

    #[test]
    fn test_load_from_file_json() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(
            &dir,
            "trainpulse.json",
            r#"{
                "route": { "origin": "EUS", "destination": "MAN" },
                "api": { "username": "u", "password": "p", "timeout_secs": 3 },
                "runtime": { "exit_after_secs": 10 }
            }"#,
        );

        let config = load_from_file(Some(path)).expect("json config");

        assert_eq!(config.route.destination, "MAN");
        assert_eq!(config.api.timeout_secs, 3);
        assert_eq!(config.runtime.exit_after_secs, Some(10));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/trainpulse.toml"))).unwrap_err();
        assert!(matches!(err, TrainPulseError::Config(_)));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(&dir, "config.json", r#"{ "route": "#);

        let err = load_from_file(Some(path)).unwrap_err();
        assert!(matches!(err, TrainPulseError::Config(ref msg) if msg.contains("JSON")));
    }

    #[test]
    fn test_missing_route_is_rejected() {
        let err = parse_config("[api]\nusername = \"u\"\npassword = \"p\"\n", Path::new("x.toml"))
            .unwrap_err();
        assert!(matches!(err, TrainPulseError::Config(ref msg) if msg.contains("TOML")));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("route: {}", Path::new("trainpulse.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_search_prefers_trainpulse_over_generic_names() {
        let dir = TempDir::new().expect("tempdir");
        write_file(&dir, "config.toml", TOML_CONFIG);
        let preferred = write_file(&dir, "trainpulse.json", "{}");

        let found = first_existing_in(&[dir.path().to_path_buf()]);

        assert_eq!(found, Some(preferred));
    }

    #[test]
    fn test_search_in_empty_dir() {
        let dir = TempDir::new().expect("tempdir");
        assert_eq!(first_existing_in(&[dir.path().to_path_buf()]), None);
    }
}
