//! Error types used throughout the application
//!
//! [`ApiError`] is a closed set of tagged variants; whether a failure may be
//! retried is a pure function of the tag ([`ApiErrorKind::is_retryable`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use trainpulse_common::error::FailureKind;

use crate::constants::MAX_RESPONSE_EXCERPT_CHARS;
use crate::impl_tag_conversions;

/// Main error type for TrainPulse
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TrainPulseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Device bridge error: {0}")]
    Bridge(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrainPulseError {
    /// The wrapped API error, if this failure came from the rail API client
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for TrainPulse operations
pub type Result<T> = std::result::Result<T, TrainPulseError>;

/// Categories of rail API failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Credentials rejected (401, 403)
    Auth,
    /// Transient failure: 5xx, transport error or timeout
    Retryable,
    /// Non-retryable 4xx other than auth, or an undecodable body
    Client,
    /// The circuit breaker refused the call
    CircuitOpen,
}

impl_tag_conversions!(ApiErrorKind {
    Auth => "auth_error",
    Retryable => "retryable_error",
    Client => "client_error",
    CircuitOpen => "circuit_open_error",
});

impl ApiErrorKind {
    /// Whether the client may spend retry budget on this kind of failure
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable)
    }

    /// Classify a non-2xx HTTP status code
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            400..=499 => Self::Client,
            _ => Self::Retryable,
        }
    }
}

/// Payload shared by every [`ApiError`] variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorDetails {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Leading excerpt of the response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
}

impl ApiErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Attach the response body, truncated to
    /// [`MAX_RESPONSE_EXCERPT_CHARS`] characters. Empty bodies are dropped.
    pub fn with_response_body(mut self, body: &str) -> Self {
        if !body.is_empty() {
            self.response_body = Some(body.chars().take(MAX_RESPONSE_EXCERPT_CHARS).collect());
        }
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Classified failure of a rail API call
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum ApiError {
    #[error("Authentication failed: {}", .0.message)]
    Auth(ApiErrorDetails),

    #[error("Retryable error: {}", .0.message)]
    Retryable(ApiErrorDetails),

    #[error("Client error: {}", .0.message)]
    Client(ApiErrorDetails),

    #[error("Circuit breaker open: {}", .0.message)]
    CircuitOpen(ApiErrorDetails),
}

impl ApiError {
    /// Build an error of the given kind
    pub fn new(kind: ApiErrorKind, details: ApiErrorDetails) -> Self {
        match kind {
            ApiErrorKind::Auth => Self::Auth(details),
            ApiErrorKind::Retryable => Self::Retryable(details),
            ApiErrorKind::Client => Self::Client(details),
            ApiErrorKind::CircuitOpen => Self::CircuitOpen(details),
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Auth(_) => ApiErrorKind::Auth,
            Self::Retryable(_) => ApiErrorKind::Retryable,
            Self::Client(_) => ApiErrorKind::Client,
            Self::CircuitOpen(_) => ApiErrorKind::CircuitOpen,
        }
    }

    pub fn details(&self) -> &ApiErrorDetails {
        match self {
            Self::Auth(details)
            | Self::Retryable(details)
            | Self::Client(details)
            | Self::CircuitOpen(details) => details,
        }
    }

    pub fn message(&self) -> &str {
        &self.details().message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.details().status_code
    }

    /// Shorthand for `self.kind().is_retryable()`
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl FailureKind for ApiError {
    fn failure_kind(&self) -> &'static str {
        self.kind().as_str()
    }
}
