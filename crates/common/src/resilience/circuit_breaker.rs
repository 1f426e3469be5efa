//! Circuit breaker guarding calls to a single downstream dependency
//!
//! The breaker tracks consecutive failures while `CLOSED`, fails fast while
//! `OPEN`, and lets exactly one trial call through at a time while
//! `HALF_OPEN`. All counters and the state live behind one lock so a
//! transition and the counters it resets always change together.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use crate::error::FailureKind;

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Trait for time operations to enable deterministic testing
///
/// Production code uses [`SystemClock`]; tests drive [`MockClock`] forward
/// explicitly so cooldown behaviour can be checked without sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed time, so a test can hand one clone to the
/// breaker and advance the other.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Advance the mock clock by milliseconds
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        UNIX_EPOCH + self.elapsed()
    }
}

//==============================================================================
// Error Types
//==============================================================================

/// Simple configuration error for validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Errors returned by [`CircuitBreaker::execute`]
///
/// Generic over the guarded operation's error so callers get their own error
/// back untouched when the operation itself failed.
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Circuit breaker refused the call without running the operation
    #[error("Circuit breaker is open, rejecting calls")]
    CircuitOpen {
        /// Wall-clock time from which a trial call will be admitted
        next_attempt_time: Option<DateTime<Utc>>,
    },

    /// The underlying operation failed
    #[error("Operation failed")]
    OperationFailed {
        #[source]
        source: E,
    },
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;

//==============================================================================
// State and Configuration
//==============================================================================

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, allowing one trial request at a time
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Observer invoked with `(from, to)` on every state transition
pub type StateChangeCallback = Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;
/// Observer invoked with the recorded error and the failure count after it
pub type FailureCallback = Arc<dyn Fn(&LastError, u64) + Send + Sync>;
/// Observer invoked with the state after a success was recorded
pub type SuccessCallback = Arc<dyn Fn(CircuitState) + Send + Sync>;

/// Configuration for circuit breaker behavior
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Number of failures in `CLOSED` before opening the circuit
    pub failure_threshold: u64,
    /// Number of successes in `HALF_OPEN` needed to close the circuit
    pub success_threshold: u64,
    /// Minimum time the circuit stays open before a trial call is allowed
    pub timeout: Duration,
    /// Optional state-transition observer
    pub on_state_change: Option<StateChangeCallback>,
    /// Optional failure observer
    pub on_failure: Option<FailureCallback>,
    /// Optional success observer
    pub on_success: Option<SuccessCallback>,
}

impl fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("success_threshold", &self.success_threshold)
            .field("timeout", &self.timeout)
            .field("on_state_change", &self.on_state_change.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .field("on_success", &self.on_success.is_some())
            .finish()
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
            on_state_change: None,
            on_failure: None,
            on_success: None,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".to_string(),
            });
        }

        if self.success_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "success_threshold must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn success_threshold(mut self, threshold: u64) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn on_state_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.config.on_state_change = Some(Arc::new(callback));
        self
    }

    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LastError, u64) + Send + Sync + 'static,
    {
        self.config.on_failure = Some(Arc::new(callback));
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.config.on_success = Some(Arc::new(callback));
        self
    }

    /// Set a custom clock for the circuit breaker (useful for testing)
    pub fn clock<C: Clock>(self, clock: C) -> CircuitBreakerBuilderWithClock<C> {
        CircuitBreakerBuilderWithClock { config: self.config, clock }
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Builder with custom clock that builds a CircuitBreaker directly
pub struct CircuitBreakerBuilderWithClock<C: Clock> {
    config: CircuitBreakerConfig,
    clock: C,
}

impl<C: Clock> CircuitBreakerBuilderWithClock<C> {
    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn success_threshold(mut self, threshold: u64) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreaker<C>> {
        CircuitBreaker::with_clock(self.config, self.clock)
    }
}

//==============================================================================
// Stats
//==============================================================================

/// Most recent failure observed by the breaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub message: String,
    pub kind: String,
}

/// Read-only snapshot of breaker health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u64,
    pub success_count: u64,
    pub failure_threshold: u64,
    pub success_threshold: u64,
    pub timeout: Duration,
    pub next_attempt_time: Option<DateTime<Utc>>,
    pub last_error: Option<LastError>,
}

//==============================================================================
// Circuit Breaker
//==============================================================================

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u64,
    success_count: u64,
    next_attempt: Option<Instant>,
    next_attempt_time: Option<DateTime<Utc>>,
    trial_in_flight: bool,
    last_error: Option<LastError>,
}

impl BreakerState {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            next_attempt: None,
            next_attempt_time: None,
            trial_in_flight: false,
            last_error: None,
        }
    }
}

type Transition = Option<(CircuitState, CircuitState)>;

/// Circuit breaker for one downstream dependency
///
/// Cloning yields another handle onto the same state.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: Arc<CircuitBreakerConfig>,
    inner: Arc<Mutex<BreakerState>>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .field("success_count", &inner.success_count)
            .finish()
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker using the system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a circuit breaker using the builder pattern
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            inner: Arc::new(Mutex::new(BreakerState::closed())),
            clock: Arc::new(clock),
        })
    }

    /// Execute an operation with circuit breaker protection
    ///
    /// Fails fast with [`ResilienceError::CircuitOpen`] when the breaker does
    /// not admit the call; otherwise runs `operation` and records its outcome.
    #[instrument(skip(self, operation), fields(state = %self.state()))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + FailureKind + Send + Sync + 'static,
    {
        let mut permit = match self.try_acquire() {
            Ok(permit) => permit,
            Err(next_attempt_time) => {
                debug!("Circuit breaker rejecting call");
                return Err(ResilienceError::CircuitOpen { next_attempt_time });
            }
        };

        let outcome = operation().await;
        let trial = permit.disarm();

        match outcome {
            Ok(value) => {
                self.record_success(trial);
                Ok(value)
            }
            Err(error) => {
                self.record_failure(&error, trial);
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Get the current state of the circuit breaker
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Immutable snapshot of counters, thresholds and the last error
    pub fn get_stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            failure_threshold: self.config.failure_threshold,
            success_threshold: self.config.success_threshold,
            timeout: self.config.timeout,
            next_attempt_time: inner.next_attempt_time,
            last_error: inner.last_error.clone(),
        }
    }

    /// Force the breaker back to `CLOSED` and clear all counters
    pub fn reset(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            let from = inner.state;
            *inner = BreakerState::closed();
            (from != CircuitState::Closed).then_some((from, CircuitState::Closed))
        };
        info!("Circuit breaker manually reset to closed state");
        self.notify_transition(transition);
    }

    /// Decide whether a call may proceed, moving `OPEN` to `HALF_OPEN` once
    /// the cooldown has elapsed.
    fn try_acquire(&self) -> Result<TrialPermit<'_, C>, Option<DateTime<Utc>>> {
        let now = self.clock.now();
        let (admitted, transition) = {
            let mut inner = self.inner.lock();
            match inner.state {
                CircuitState::Closed => (Ok(false), None),
                CircuitState::Open => {
                    let cooled_down = inner.next_attempt.map_or(true, |at| now >= at);
                    if cooled_down {
                        inner.state = CircuitState::HalfOpen;
                        inner.success_count = 0;
                        inner.trial_in_flight = true;
                        (Ok(true), Some((CircuitState::Open, CircuitState::HalfOpen)))
                    } else {
                        (Err(inner.next_attempt_time), None)
                    }
                }
                CircuitState::HalfOpen => {
                    if inner.trial_in_flight {
                        (Err(inner.next_attempt_time), None)
                    } else {
                        inner.trial_in_flight = true;
                        (Ok(true), None)
                    }
                }
            }
        };

        if let Some((from, to)) = transition {
            info!(%from, %to, "Circuit breaker admitting trial call");
        }
        self.notify_transition(transition);

        admitted.map(|trial| TrialPermit { breaker: self, armed: trial })
    }

    /// `trial` is whether the call held the half-open trial slot. Outcomes of
    /// calls admitted before the circuit opened never decide recovery.
    fn record_success(&self, trial: bool) {
        let (state, transition) = {
            let mut inner = self.inner.lock();
            match inner.state {
                CircuitState::Closed => {
                    inner.failure_count = 0;
                    (CircuitState::Closed, None)
                }
                CircuitState::HalfOpen if !trial => {
                    debug!("Ignoring success of a call admitted before the circuit opened");
                    (CircuitState::HalfOpen, None)
                }
                CircuitState::HalfOpen => {
                    inner.trial_in_flight = false;
                    inner.success_count += 1;
                    if inner.success_count >= self.config.success_threshold {
                        let successes = inner.success_count;
                        *inner = BreakerState::closed();
                        info!(successes, "Circuit breaker closed after successful trials");
                        (CircuitState::Closed, Some((CircuitState::HalfOpen, CircuitState::Closed)))
                    } else {
                        (CircuitState::HalfOpen, None)
                    }
                }
                CircuitState::Open => {
                    warn!("Received success while circuit is open");
                    (CircuitState::Open, None)
                }
            }
        };

        debug!(%state, "Circuit breaker: operation succeeded");
        if let Some(callback) = &self.config.on_success {
            callback(state);
        }
        self.notify_transition(transition);
    }

    fn record_failure<E>(&self, error: &E, trial: bool)
    where
        E: std::error::Error + FailureKind,
    {
        let last_error =
            LastError { message: error.to_string(), kind: error.failure_kind().to_string() };
        let now = self.clock.now();
        let wall_now = self.clock.system_time();

        let (failure_count, transition) = {
            let mut inner = self.inner.lock();
            inner.last_error = Some(last_error.clone());

            let transition = match inner.state {
                CircuitState::Closed => {
                    inner.failure_count += 1;
                    if inner.failure_count >= self.config.failure_threshold {
                        self.trip(&mut inner, now, wall_now);
                        warn!(failures = inner.failure_count, "Circuit breaker opened");
                        Some((CircuitState::Closed, CircuitState::Open))
                    } else {
                        None
                    }
                }
                CircuitState::HalfOpen if trial => {
                    inner.failure_count += 1;
                    self.trip(&mut inner, now, wall_now);
                    warn!("Circuit breaker re-opened after failed trial call");
                    Some((CircuitState::HalfOpen, CircuitState::Open))
                }
                CircuitState::HalfOpen | CircuitState::Open => {
                    debug!("Ignoring failure of a call admitted before the circuit opened");
                    None
                }
            };
            (inner.failure_count, transition)
        };

        warn!(failure_count, kind = %last_error.kind, error = %last_error.message,
            "Circuit breaker: operation failed");
        if let Some(callback) = &self.config.on_failure {
            callback(&last_error, failure_count);
        }
        self.notify_transition(transition);
    }

    fn trip(&self, inner: &mut BreakerState, now: Instant, wall_now: SystemTime) {
        inner.state = CircuitState::Open;
        inner.success_count = 0;
        inner.trial_in_flight = false;
        inner.next_attempt = Some(now + self.config.timeout);
        inner.next_attempt_time = Some(DateTime::<Utc>::from(wall_now + self.config.timeout));
    }

    /// Release a trial slot whose operation never reported back (dropped
    /// future).
    fn abandon_trial(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }

    fn notify_transition(&self, transition: Transition) {
        if let (Some((from, to)), Some(callback)) = (transition, &self.config.on_state_change) {
            callback(from, to);
        }
    }
}

/// Holds the half-open trial slot until the outcome is recorded
struct TrialPermit<'a, C: Clock> {
    breaker: &'a CircuitBreaker<C>,
    armed: bool,
}

impl<C: Clock> TrialPermit<'_, C> {
    /// Keep the slot past drop; returns whether this was the trial call
    fn disarm(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }
}

impl<C: Clock> Drop for TrialPermit<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.abandon_trial();
        }
    }
}
