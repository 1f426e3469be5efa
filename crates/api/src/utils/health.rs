//! Health summary for the running process
//!
//! Combines the rail API circuit breaker and the device's mode into one
//! serializable report that is logged at shutdown.

use chrono::{DateTime, Utc};
use serde::Serialize;
use trainpulse_common::resilience::CircuitState;
use trainpulse_domain::Mode;
use trainpulse_infra::ApiHealth;

/// Fraction of healthy components at or above which the process is healthy
const HEALTHY_SCORE: f64 = 0.8;

/// Overall health of the process
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub is_healthy: bool,
    /// Healthy components over total components, from 0.0 to 1.0
    pub score: f64,
    pub components: Vec<ComponentHealth>,
    pub checked_at: DateTime<Utc>,
}

/// Health of one component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub is_healthy: bool,
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: &'static str) -> Self {
        Self { name, is_healthy: true, message: None }
    }

    pub fn unhealthy(name: &'static str, message: impl Into<String>) -> Self {
        Self { name, is_healthy: false, message: Some(message.into()) }
    }
}

impl HealthStatus {
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let score = if components.is_empty() {
            1.0
        } else {
            let healthy = components.iter().filter(|c| c.is_healthy).count();
            healthy as f64 / components.len() as f64
        };

        Self { is_healthy: score >= HEALTHY_SCORE, score, components, checked_at: Utc::now() }
    }

    /// Report for the rail API breaker and the device's current mode
    pub fn collect(api: &ApiHealth, mode: Mode) -> Self {
        let rail_api = match api.stats.state {
            CircuitState::Closed => ComponentHealth::healthy("rail_api"),
            CircuitState::HalfOpen => {
                ComponentHealth::unhealthy("rail_api", "circuit half-open, probing recovery")
            }
            CircuitState::Open => {
                let message = match api.stats.next_attempt_time {
                    Some(at) => format!("circuit open until {}", at.to_rfc3339()),
                    None => "circuit open".to_string(),
                };
                ComponentHealth::unhealthy("rail_api", message)
            }
        };

        let device = match mode {
            Mode::Unknown => ComponentHealth::unhealthy("device", "train status unknown"),
            _ => ComponentHealth::healthy("device"),
        };

        Self::from_components(vec![rail_api, device])
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use trainpulse_common::resilience::CircuitBreakerStats;

    use super::*;

    fn api_health(state: CircuitState) -> ApiHealth {
        ApiHealth {
            stats: CircuitBreakerStats {
                state,
                failure_count: 0,
                success_count: 0,
                failure_threshold: 5,
                success_threshold: 2,
                timeout: Duration::from_secs(60),
                next_attempt_time: None,
                last_error: None,
            },
            is_healthy: state == CircuitState::Closed,
        }
    }

    #[test]
    fn test_all_components_healthy() {
        let status = HealthStatus::collect(&api_health(CircuitState::Closed), Mode::MinorDelay);
        assert!(status.is_healthy);
        assert_eq!(status.score, 1.0);
    }

    #[test]
    fn test_open_circuit_marks_process_unhealthy() {
        let status = HealthStatus::collect(&api_health(CircuitState::Open), Mode::OnTime);
        assert!(!status.is_healthy);
        assert_eq!(status.score, 0.5);
        assert_eq!(status.components[0].message.as_deref(), Some("circuit open"));
    }

    #[test]
    fn test_unknown_mode_is_unhealthy_device() {
        let status = HealthStatus::collect(&api_health(CircuitState::Closed), Mode::Unknown);
        assert!(!status.components[1].is_healthy);
    }

    #[test]
    fn test_empty_report_is_healthy() {
        assert!(HealthStatus::from_components(Vec::new()).is_healthy);
    }
}
