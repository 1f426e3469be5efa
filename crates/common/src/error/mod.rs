//! Error classification shared across TrainPulse crates
//!
//! Lives in the foundation tier so domain error types can implement it
//! without pulling in the async runtime.

/// Stable label describing what kind of failure an error represents
///
/// The circuit breaker stores the label of the most recent failure in its
/// stats so health checks can report *why* the circuit is unhealthy.
pub trait FailureKind {
    /// Short machine-readable label, e.g. `"retryable"`
    fn failure_kind(&self) -> &'static str;
}

impl FailureKind for std::io::Error {
    fn failure_kind(&self) -> &'static str {
        "io"
    }
}
