//! Shared test helpers for `trainpulse-core` integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use trainpulse_core::ServiceProvider;
use trainpulse_domain::{LocationDetail, Result, ServiceRecord};

/// Service running `minutes` late against the public timetable
pub fn service_late_by(minutes: i64) -> ServiceRecord {
    ServiceRecord {
        service_uid: Some(format!("L{minutes:05}")),
        location_detail: Some(LocationDetail {
            realtime_gbtt_departure_lateness: Some(json!(minutes)),
            ..LocationDetail::default()
        }),
        ..ServiceRecord::default()
    }
}

/// Provider that takes `latency` per call and tracks how many calls overlap
pub struct SlowProvider {
    latency: Duration,
    minutes: i64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowProvider {
    pub fn new(latency: Duration, minutes: i64) -> Self {
        Self {
            latency,
            minutes,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceProvider for SlowProvider {
    async fn fetch_best_service(&self) -> Result<Option<ServiceRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Some(service_late_by(self.minutes)))
    }
}
