//! Backoff delays for caller-driven retries
//!
//! The rail API client owns its retry loop (each attempt has to pass through
//! the circuit breaker individually), so this module only answers "how long
//! before attempt N".

use std::time::Duration;

use tracing::debug;

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: initial_delay * base^(retry - 1), capped at
    /// max_delay
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1), Duration::from_secs(30))
    }
}

impl BackoffStrategy {
    /// Doubling backoff starting at `initial_delay`
    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        Self::Exponential { initial_delay, base: 2.0, max_delay }
    }

    /// Delay before the given retry (1-based: the first retry is `1`)
    pub fn calculate_delay(&self, retry_number: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(retry_number.saturating_sub(1)).unwrap_or(i32::MAX);
                let millis = initial_delay.as_millis() as f64 * base.powi(exponent);
                let capped = millis.min(max_delay.as_millis() as f64);
                if capped.is_finite() && capped > 0.0 {
                    Duration::from_millis(capped as u64)
                } else {
                    Duration::ZERO
                }
            }
        }
    }

    /// Sleep for the delay assigned to `retry_number`
    pub async fn wait(&self, retry_number: u32) {
        let delay = self.calculate_delay(retry_number);
        if !delay.is_zero() {
            debug!(retry_number, delay_ms = delay.as_millis() as u64, "backing off before retry");
            tokio::time::sleep(delay).await;
        }
    }
}
