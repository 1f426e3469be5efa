//! Tracing subscriber setup and log labels

use std::str::FromStr;

use trainpulse_domain::{impl_tag_conversions, TrainPulseError};
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log output format
pub const LOG_FORMAT_VAR: &str = "TRAINPULSE_LOG_FORMAT";

/// Output format for the process-wide subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl_tag_conversions!(LogFormat {
    Pretty => "pretty",
    Json => "json",
});

impl LogFormat {
    /// Read [`LOG_FORMAT_VAR`], falling back to pretty output when unset or
    /// unrecognised
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_VAR)
            .ok()
            .and_then(|value| Self::from_str(&value).ok())
            .unwrap_or_default()
    }
}

/// Install the global subscriber, filtered by `RUST_LOG` (default `info`)
///
/// # Errors
/// Returns `TrainPulseError::Internal` if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<(), TrainPulseError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };

    installed.map_err(|err| TrainPulseError::Internal(format!("failed to install tracing: {err}")))
}

/// Stable label for an error, suitable for a structured log field
#[inline]
pub fn error_label(error: &TrainPulseError) -> &'static str {
    match error {
        TrainPulseError::Config(_) => "config",
        TrainPulseError::Api(api) => api.kind().as_str(),
        TrainPulseError::Network(_) => "network",
        TrainPulseError::Bridge(_) => "bridge",
        TrainPulseError::Internal(_) => "internal",
    }
}
