//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Device identity defaults
pub const DEFAULT_DEVICE_NAME: &str = "TrainPulse";
pub const DEFAULT_DEVICE_SERIAL: &str = "TP-0001";
pub const DEVICE_VENDOR_NAME: &str = "TrainPulse";
pub const DEVICE_PRODUCT_NAME: &str = "Train Punctuality Monitor";
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60;
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 1;

// Rail data API
pub const DEFAULT_API_BASE_URL: &str = "https://api.rtt.io/api/v1/json";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_INITIAL_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;
pub const MAX_RESPONSE_EXCERPT_CHARS: usize = 500;

// Circuit breaker
pub const DEFAULT_BREAKER_FAILURE_THRESHOLD: u64 = 5;
pub const DEFAULT_BREAKER_SUCCESS_THRESHOLD: u64 = 2;
pub const DEFAULT_BREAKER_TIMEOUT_SECS: u64 = 60;

// Mode thresholds (minutes of lateness, inclusive upper bounds)
pub const ON_TIME_TOLERANCE_MINUTES: i64 = 2;
pub const MINOR_DELAY_MAX_MINUTES: i64 = 5;
pub const DELAYED_MAX_MINUTES: i64 = 10;

/// Highest air-quality ordinal the device framework accepts
pub const MAX_SUPPORTED_AIR_QUALITY: u8 = 4;
