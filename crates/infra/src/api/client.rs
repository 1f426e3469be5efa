//! Rail data API client with circuit breaker and retry logic
//!
//! Every attempt, retries included, passes through the circuit breaker on
//! its own, so the breaker sees the dependency's real failure rate. An open
//! breaker fails the call immediately without spending retry budget.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use reqwest::StatusCode;
use trainpulse_common::resilience::{
    BackoffStrategy, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
    Clock, ResilienceError, SystemClock,
};
use trainpulse_domain::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_API_TIMEOUT_SECS, DEFAULT_BACKOFF_INITIAL_MS,
    DEFAULT_BACKOFF_MAX_MS, DEFAULT_MAX_RETRIES,
};
use trainpulse_domain::{
    ApiError, ApiErrorDetails, ApiErrorKind, BreakerSettings, RailApiConfig, Result,
    SearchResponse, TrainPulseError,
};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::auth::BasicCredentials;
use crate::http::{Transport, TransportError, TransportRequest, TransportResponse};

/// Configuration for the rail API client
#[derive(Debug, Clone)]
pub struct RailApiClientConfig {
    /// Base URL, e.g. `https://api.rtt.io/api/v1/json`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub credentials: BasicCredentials,
    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl RailApiClientConfig {
    /// Defaults for everything except the credentials
    pub fn new(credentials: BasicCredentials) -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            credentials,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffStrategy::exponential(
                Duration::from_millis(DEFAULT_BACKOFF_INITIAL_MS),
                Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
            ),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }

    /// Build from validated application settings
    pub fn from_settings(api: &RailApiConfig, breaker: &BreakerSettings) -> Self {
        Self {
            base_url: api.base_url.clone(),
            timeout: api.timeout(),
            max_retries: api.max_retries,
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: breaker.failure_threshold,
                success_threshold: breaker.success_threshold,
                timeout: breaker.timeout(),
                ..CircuitBreakerConfig::default()
            },
            ..Self::new(BasicCredentials::from_config(api))
        }
    }
}

/// Per-call overrides for [`RailApiClient::search`]
#[derive(Clone, Default)]
pub struct SearchOptions {
    pub credentials: Option<BasicCredentials>,
    pub max_retries: Option<u32>,
    pub transport: Option<Arc<dyn Transport>>,
}

impl SearchOptions {
    pub fn credentials(mut self, credentials: BasicCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

/// Breaker snapshot plus a derived health flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiHealth {
    pub stats: CircuitBreakerStats,
    /// `true` only while the breaker is `CLOSED`
    pub is_healthy: bool,
}

/// Resilient client for the rail data API's location search
pub struct RailApiClient<C: Clock = SystemClock> {
    transport: Arc<dyn Transport>,
    config: RailApiClientConfig,
    base_url: Url,
    circuit_breaker: CircuitBreaker<C>,
}

impl RailApiClient<SystemClock> {
    /// Create a new client
    ///
    /// # Errors
    /// Returns `TrainPulseError::Config` if the base URL or the breaker
    /// configuration is invalid.
    pub fn new(config: RailApiClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::with_clock(config, transport, SystemClock)
    }
}

impl<C: Clock> RailApiClient<C> {
    /// Create a client whose breaker reads time from `clock`
    ///
    /// # Errors
    /// Same as [`RailApiClient::new`].
    pub fn with_clock(
        config: RailApiClientConfig,
        transport: Arc<dyn Transport>,
        clock: C,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            TrainPulseError::Config(format!("Invalid API base URL {}: {err}", config.base_url))
        })?;

        let circuit_breaker = CircuitBreaker::with_clock(config.circuit_breaker.clone(), clock)
            .map_err(|err| {
                TrainPulseError::Config(format!("Failed to create circuit breaker: {err}"))
            })?;

        Ok(Self { transport, config, base_url, circuit_breaker })
    }

    /// Search services from `origin` to `destination` on `date`
    ///
    /// # Errors
    /// - [`ApiError::CircuitOpen`] (status 503) when the breaker refuses the
    ///   call; nothing is sent
    /// - [`ApiError::Auth`] on 401/403, never retried
    /// - [`ApiError::Client`] on other 4xx or an undecodable body, never
    ///   retried
    /// - [`ApiError::Retryable`] on 5xx or transport failure, once the retry
    ///   budget is spent
    #[instrument(skip(self, options))]
    pub async fn search(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        options: SearchOptions,
    ) -> std::result::Result<SearchResponse, ApiError> {
        let credentials = options.credentials.as_ref().unwrap_or(&self.config.credentials);
        let max_retries = options.max_retries.unwrap_or(self.config.max_retries);
        let transport = options.transport.as_deref().unwrap_or(self.transport.as_ref());

        let request = TransportRequest {
            url: self.search_url(origin, destination, date),
            authorization: credentials.header_value(),
            timeout: self.config.timeout,
        };
        debug!(url = %request.url, user = credentials.username(), max_retries, "searching services");

        let mut retries = 0;
        loop {
            let outcome =
                self.circuit_breaker.execute(|| Self::attempt(transport, &request)).await;

            match outcome {
                Ok(response) => {
                    info!(
                        services = response.services().len(),
                        retries, "search request successful"
                    );
                    return Ok(response);
                }
                Err(ResilienceError::CircuitOpen { next_attempt_time }) => {
                    warn!(?next_attempt_time, "circuit breaker open; search not attempted");
                    return Err(circuit_open_error(&request.url, next_attempt_time));
                }
                Err(ResilienceError::OperationFailed { source })
                    if source.is_retryable() && retries < max_retries =>
                {
                    retries += 1;
                    warn!(
                        error = %source,
                        retry = retries,
                        max_retries,
                        "search attempt failed; retrying"
                    );
                    self.config.backoff.wait(retries).await;
                }
                Err(ResilienceError::OperationFailed { source }) => {
                    warn!(error = %source, kind = %source.kind(), retries, "search request failed");
                    return Err(source);
                }
            }
        }
    }

    /// Breaker statistics and whether the dependency is considered healthy
    pub fn get_health(&self) -> ApiHealth {
        let stats = self.circuit_breaker.get_stats();
        let is_healthy = stats.state == CircuitState::Closed;
        ApiHealth { stats, is_healthy }
    }

    /// Force the breaker closed and clear its counters
    pub fn reset_circuit(&self) {
        self.circuit_breaker.reset();
    }

    fn search_url(&self, origin: &str, destination: &str, date: NaiveDate) -> String {
        format!(
            "{}/search/{}/to/{}/{:04}/{:02}/{:02}",
            self.base_url.as_str().trim_end_matches('/'),
            origin.trim().to_ascii_uppercase(),
            destination.trim().to_ascii_uppercase(),
            date.year(),
            date.month(),
            date.day()
        )
    }

    /// One guarded attempt: send, classify, decode
    async fn attempt(
        transport: &dyn Transport,
        request: &TransportRequest,
    ) -> std::result::Result<SearchResponse, ApiError> {
        let response = transport
            .get(request)
            .await
            .map_err(|err| transport_error(&request.url, &err))?;

        if !response.is_success() {
            return Err(status_error(&request.url, &response));
        }

        debug!(status = response.status, "decoding search response");
        serde_json::from_str(&response.body).map_err(|err| {
            ApiError::Client(
                ApiErrorDetails::new(format!("Failed to parse response: {err}"))
                    .with_status(response.status)
                    .with_endpoint(&request.url)
                    .with_response_body(&response.body),
            )
        })
    }
}

fn status_error(endpoint: &str, response: &TransportResponse) -> ApiError {
    let reason = StatusCode::from_u16(response.status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown Status");

    ApiError::new(
        ApiErrorKind::from_status(response.status),
        ApiErrorDetails::new(format!("HTTP {}: {reason}", response.status))
            .with_status(response.status)
            .with_endpoint(endpoint)
            .with_response_body(&response.body),
    )
}

fn transport_error(endpoint: &str, err: &TransportError) -> ApiError {
    let details = ApiErrorDetails::new(err.to_string()).with_endpoint(endpoint);
    match err {
        TransportError::InvalidRequest(_) => ApiError::Client(details),
        _ => ApiError::Retryable(details),
    }
}

fn circuit_open_error(endpoint: &str, next_attempt_time: Option<DateTime<Utc>>) -> ApiError {
    let mut details = ApiErrorDetails::new("Circuit breaker is open; request not attempted")
        .with_status(503)
        .with_endpoint(endpoint)
        .with_context("circuitOpen", true);
    if let Some(at) = next_attempt_time {
        details = details.with_context("nextAttemptTime", at.to_rfc3339());
    }
    ApiError::CircuitOpen(details)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use trainpulse_common::resilience::MockClock;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::HttpTransport;

    const SEARCH_PATH: &str = "/search/PAD/to/RDG/2024/03/01";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
    }

    fn config(base_url: String) -> RailApiClientConfig {
        RailApiClientConfig {
            base_url,
            timeout: Duration::from_secs(2),
            backoff: BackoffStrategy::Fixed(Duration::from_millis(1)),
            ..RailApiClientConfig::new(BasicCredentials::new("user", "pass"))
        }
    }

    fn client(server: &MockServer) -> RailApiClient {
        let transport = Arc::new(HttpTransport::new().expect("transport"));
        RailApiClient::new(config(server.uri()), transport).expect("client")
    }

    fn services_body() -> serde_json::Value {
        json!({
            "services": [{
                "serviceUid": "W12345",
                "locationDetail": { "gbttBookedDeparture": "0715", "realtimeGbttDepartureLateness": 3 }
            }]
        })
    }

    /// Transport that fails every call at the connection level
    struct UnreachableTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for UnreachableTransport {
        async fn get(
            &self,
            _request: &TransportRequest,
        ) -> std::result::Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Connect("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_search_decodes_services_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(services_body()))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .search("pad", "rdg", date(), SearchOptions::default())
            .await
            .expect("search");

        assert_eq!(response.services().len(), 1);
        assert_eq!(response.services()[0].service_uid.as_deref(), Some("W12345"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_never_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .search("PAD", "RDG", date(), SearchOptions::default().max_retries(5))
            .await
            .expect_err("auth failure");

        assert_eq!(err.kind(), ApiErrorKind::Auth);
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.details().response_body.as_deref(), Some("bad credentials"));
        assert!(err.details().endpoint.as_deref().is_some_and(|e| e.ends_with(SEARCH_PATH)));
    }

    #[tokio::test]
    async fn test_forbidden_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .search("PAD", "RDG", date(), SearchOptions::default())
            .await
            .expect_err("forbidden");
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn test_other_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .search("PAD", "RDG", date(), SearchOptions::default())
            .await
            .expect_err("not found");
        assert_eq!(err.kind(), ApiErrorKind::Client);
        assert_eq!(err.message(), "HTTP 404: Not Found");
    }

    #[tokio::test]
    async fn test_server_errors_retry_until_success() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                if attempts_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(500)
                } else {
                    ResponseTemplate::new(200).set_body_json(services_body())
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let client = client(&server);
        let response =
            client.search("PAD", "RDG", date(), SearchOptions::default()).await.expect("search");

        assert_eq!(response.services().len(), 1);
        let stats = client.get_health().stats;
        assert_eq!(stats.failure_count, 0, "success resets the failure count");
        assert_eq!(stats.last_error.map(|e| e.kind), Some("retryable_error".to_string()));
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_surfaces_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client
            .search("PAD", "RDG", date(), SearchOptions::default().max_retries(2))
            .await
            .expect_err("exhausted");

        assert_eq!(err.kind(), ApiErrorKind::Retryable);
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(client.get_health().stats.failure_count, 3);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .search("PAD", "RDG", date(), SearchOptions::default())
            .await
            .expect_err("bad body");

        assert_eq!(err.kind(), ApiErrorKind::Client);
        assert_eq!(err.details().response_body.as_deref(), Some("<html>oops</html>"));
    }

    #[tokio::test]
    async fn test_repeated_server_errors_open_the_circuit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let client = client(&server);
        for _ in 0..5 {
            let err = client
                .search("PAD", "RDG", date(), SearchOptions::default().max_retries(0))
                .await
                .expect_err("server error");
            assert_eq!(err.kind(), ApiErrorKind::Retryable);
        }

        let err = client
            .search("PAD", "RDG", date(), SearchOptions::default().max_retries(0))
            .await
            .expect_err("circuit open");

        assert_eq!(err.kind(), ApiErrorKind::CircuitOpen);
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.details().context.get("circuitOpen"), Some(&json!(true)));
        assert!(err.details().context.contains_key("nextAttemptTime"));

        let health = client.get_health();
        assert!(!health.is_healthy);
        assert_eq!(health.stats.state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_open_circuit_does_not_consume_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let client = client(&server);
        // 1 attempt + 4 retries reaches the threshold inside a single call
        let err = client
            .search("PAD", "RDG", date(), SearchOptions::default().max_retries(10))
            .await
            .expect_err("opens mid-retry");

        assert_eq!(err.kind(), ApiErrorKind::CircuitOpen);
    }

    #[tokio::test]
    async fn test_reset_circuit_restores_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client(&server);
        for _ in 0..5 {
            let _ = client.search("PAD", "RDG", date(), SearchOptions::default().max_retries(0)).await;
        }
        assert!(!client.get_health().is_healthy);

        client.reset_circuit();

        let health = client.get_health();
        assert!(health.is_healthy);
        assert_eq!(health.stats.failure_count, 0);
        assert_eq!(health.stats.next_attempt_time, None);
    }

    #[tokio::test]
    async fn test_circuit_recovers_after_cooldown() {
        let server = MockServer::start().await;
        let healthy = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let healthy_clone = healthy.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                if healthy_clone.load(Ordering::SeqCst) {
                    ResponseTemplate::new(200).set_body_json(services_body())
                } else {
                    ResponseTemplate::new(500)
                }
            })
            .mount(&server)
            .await;

        let clock = MockClock::new();
        let transport = Arc::new(HttpTransport::new().expect("transport"));
        let client = RailApiClient::with_clock(config(server.uri()), transport, clock.clone())
            .expect("client");

        for _ in 0..5 {
            let _ = client.search("PAD", "RDG", date(), SearchOptions::default().max_retries(0)).await;
        }
        assert_eq!(client.get_health().stats.state, CircuitState::Open);

        healthy.store(true, Ordering::SeqCst);
        clock.advance(Duration::from_secs(61));

        client.search("PAD", "RDG", date(), SearchOptions::default()).await.expect("trial");
        assert_eq!(client.get_health().stats.state, CircuitState::HalfOpen);

        client.search("PAD", "RDG", date(), SearchOptions::default()).await.expect("second");
        assert!(client.get_health().is_healthy);
    }

    #[tokio::test]
    async fn test_transport_failures_are_retried_via_option_override() {
        let server = MockServer::start().await;
        let unreachable = Arc::new(UnreachableTransport { calls: AtomicUsize::new(0) });

        let err = client(&server)
            .search(
                "PAD",
                "RDG",
                date(),
                SearchOptions::default().max_retries(2).transport(unreachable.clone()),
            )
            .await
            .expect_err("unreachable");

        assert_eq!(err.kind(), ApiErrorKind::Retryable);
        assert!(err.message().contains("connection refused"));
        assert_eq!(unreachable.calls.load(Ordering::SeqCst), 3);
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_credentials_override() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Basic b3RoZXI6c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "services": null })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .search(
                "PAD",
                "RDG",
                date(),
                SearchOptions::default().credentials(BasicCredentials::new("other", "secret")),
            )
            .await
            .expect("search");

        assert!(response.services().is_empty());
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let transport = Arc::new(HttpTransport::new().expect("transport"));
        let result = RailApiClient::new(config("not a url".to_string()), transport);
        assert!(matches!(result, Err(TrainPulseError::Config(_))));
    }

    #[test]
    fn test_from_settings_copies_breaker_thresholds() {
        let api = RailApiConfig::new("user", "pass");
        let breaker =
            BreakerSettings { failure_threshold: 3, success_threshold: 1, timeout_secs: 15 };
        let config = RailApiClientConfig::from_settings(&api, &breaker);

        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.success_threshold, 1);
        assert_eq!(config.circuit_breaker.timeout, Duration::from_secs(15));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.credentials.header_value(), "Basic dXNlcjpwYXNz");
    }
}
