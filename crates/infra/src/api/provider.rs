//! Best-candidate selection over rail API search results
//!
//! The device reports on a single service: the next passenger departure
//! from the configured origin towards the destination.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Europe::London;
use trainpulse_common::resilience::{Clock, SystemClock};
use trainpulse_core::ServiceProvider;
use trainpulse_domain::{Result, RouteConfig, ServiceRecord};
use tracing::debug;

use super::client::{RailApiClient, SearchOptions};

/// [`ServiceProvider`] backed by today's search between two stations
pub struct RailServiceProvider<C: Clock = SystemClock> {
    client: Arc<RailApiClient<C>>,
    route: RouteConfig,
}

impl<C: Clock> RailServiceProvider<C> {
    pub fn new(client: Arc<RailApiClient<C>>, route: RouteConfig) -> Self {
        Self { client, route }
    }
}

#[async_trait]
impl<C: Clock> ServiceProvider for RailServiceProvider<C> {
    async fn fetch_best_service(&self) -> Result<Option<ServiceRecord>> {
        let (today, now) = timetable_moment(Utc::now());
        let response = self
            .client
            .search(&self.route.origin, &self.route.destination, today, SearchOptions::default())
            .await?;

        let selected = select_best_service(response.services(), now).cloned();
        debug!(
            candidates = response.services().len(),
            selected = selected.as_ref().and_then(|s| s.service_uid.as_deref()),
            "selected best service"
        );
        Ok(selected)
    }
}

/// Date and wall-clock time in the UK, where booked departures are published
pub fn timetable_moment(instant: DateTime<Utc>) -> (NaiveDate, NaiveTime) {
    let local = instant.with_timezone(&London);
    (local.date_naive(), local.time())
}

/// Earliest non-cancelled passenger service departing at or after `now`
///
/// Falls back to the first passenger service when none qualifies, and to
/// `None` when there are no passenger services at all.
pub fn select_best_service(services: &[ServiceRecord], now: NaiveTime) -> Option<&ServiceRecord> {
    let this_minute = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(now);
    let passenger = || services.iter().filter(|service| service.is_passenger());

    passenger()
        .filter(|service| !service.is_cancelled())
        .filter_map(|service| service.booked_departure().map(|departs| (departs, service)))
        .filter(|(departs, _)| *departs >= this_minute)
        .min_by_key(|(departs, _)| *departs)
        .map(|(_, service)| service)
        .or_else(|| passenger().next())
}
