//! Resilience patterns for fault tolerance
//!
//! This module provides the resilience building blocks used by the rail API
//! client:
//! - **Circuit Breaker**: stops hammering a dependency that keeps failing and
//!   tries it again after a cooldown
//! - **Retry Backoff**: delay calculation for caller-driven retries
//!
//! The circuit breaker never retries on its own. Retrying is the caller's job;
//! the breaker only decides whether an attempt is permitted and records its
//! outcome.

pub mod circuit_breaker;
pub mod retry;

// Re-export circuit breaker types
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerBuilderWithClock, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitBreakerStats, CircuitState, Clock, ConfigError,
    ConfigResult, FailureCallback, FailureKind, LastError, MockClock, ResilienceError,
    ResilienceResult, StateChangeCallback, SuccessCallback, SystemClock,
};
// Re-export retry types
pub use retry::BackoffStrategy;
