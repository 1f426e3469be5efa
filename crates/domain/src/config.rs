//! Configuration management
//!
//! Plain data loaded by `trainpulse-infra`'s config loader and validated once
//! at startup. Runtime components only ever see validated values.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_API_TIMEOUT_SECS, DEFAULT_BREAKER_FAILURE_THRESHOLD,
    DEFAULT_BREAKER_SUCCESS_THRESHOLD, DEFAULT_BREAKER_TIMEOUT_SECS, DEFAULT_DEVICE_NAME,
    DEFAULT_DEVICE_SERIAL, DEFAULT_MAX_RETRIES, DEFAULT_UPDATE_INTERVAL_SECS,
    MIN_UPDATE_INTERVAL_SECS,
};
use crate::errors::{Result, TrainPulseError};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    pub route: RouteConfig,
    pub api: RailApiConfig,
    #[serde(default)]
    pub breaker: BreakerSettings,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Device identity and polling cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    pub serial_number: String,
    pub update_interval_secs: u64,
}

/// Origin and destination CRS codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub origin: String,
    pub destination: String,
}

/// Rail data API access
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailApiConfig {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Circuit breaker thresholds for the rail API client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u64,
    pub success_threshold: u64,
    pub timeout_secs: u64,
}

/// Process-level behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Shut down on our own after this many seconds (verification runs)
    pub exit_after_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_API_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            serial_number: DEFAULT_DEVICE_SERIAL.to_string(),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
        }
    }
}

impl DeviceConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

impl RailApiConfig {
    /// Credentials with every other field at its default
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for RailApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RailApiConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_BREAKER_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_BREAKER_SUCCESS_THRESHOLD,
            timeout_secs: DEFAULT_BREAKER_TIMEOUT_SECS,
        }
    }
}

impl BreakerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Check every field once, before anything is wired up
    ///
    /// # Errors
    /// Returns `TrainPulseError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.device.name.trim().is_empty() {
            return Err(config_error("device name must not be empty"));
        }
        if self.device.update_interval_secs < MIN_UPDATE_INTERVAL_SECS {
            return Err(config_error(format!(
                "update interval must be at least {MIN_UPDATE_INTERVAL_SECS}s"
            )));
        }

        validate_crs("origin", &self.route.origin)?;
        validate_crs("destination", &self.route.destination)?;

        if self.api.username.trim().is_empty() {
            return Err(config_error("API username must not be empty"));
        }
        if self.api.password.is_empty() {
            return Err(config_error("API password must not be empty"));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(config_error(format!(
                "API base URL must be http(s): {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(config_error("API timeout must be greater than 0"));
        }

        if self.breaker.failure_threshold == 0 {
            return Err(config_error("breaker failure threshold must be greater than 0"));
        }
        if self.breaker.success_threshold == 0 {
            return Err(config_error("breaker success threshold must be greater than 0"));
        }
        if self.breaker.timeout_secs == 0 {
            return Err(config_error("breaker timeout must be greater than 0"));
        }

        Ok(())
    }
}

/// CRS station codes are exactly three ASCII letters
fn validate_crs(field: &str, code: &str) -> Result<()> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(config_error(format!("{field} must be a three-letter CRS code, got {code:?}")))
    }
}

fn config_error(message: impl Into<String>) -> TrainPulseError {
    TrainPulseError::Config(message.into())
}
