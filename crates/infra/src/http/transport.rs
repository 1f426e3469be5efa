//! Pluggable request transport
//!
//! The rail API client speaks to the network only through [`Transport`], so
//! tests can swap in stubs. [`HttpTransport`] is the reqwest-backed
//! production implementation. It performs exactly one request per call;
//! retries belong to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client as ReqwestClient;
use thiserror::Error;
use tracing::debug;
use trainpulse_domain::{Result, TrainPulseError};

/// One outbound GET request
#[derive(Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    /// Full `Authorization` header value
    pub authorization: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRequest")
            .field("url", &self.url)
            .field("authorization", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Status and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Sends a single request and reports what came back
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        request: &TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// reqwest-backed [`Transport`]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        request: &TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        debug!(url = %request.url, "sending HTTP request");

        let response = self
            .client
            .get(&request.url)
            .header(AUTHORIZATION, &request.authorization)
            .header(ACCEPT, "application/json")
            .timeout(request.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(url = %request.url, status, bytes = body.len(), "received HTTP response");

        Ok(TransportResponse { status, body })
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    connect_timeout: Duration,
    user_agent: String,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("trainpulse/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpTransportBuilder {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// # Errors
    /// Returns `TrainPulseError::Network` if the TLS backend cannot be
    /// initialised.
    pub fn build(self) -> Result<HttpTransport> {
        let client = ReqwestClient::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()
            .map_err(|err| TrainPulseError::Network(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpTransport { client })
    }
}
