//! Basic authentication for the rail data API

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use trainpulse_domain::RailApiConfig;

/// Username and password sent as an HTTP basic-auth header
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    pub fn from_config(config: &RailApiConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `base64("user:pass")`
    pub fn token(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("Basic {}", self.token())
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
