//! Upstream schedule records
//!
//! Mirrors the JSON returned by the rail data API's location search. Only
//! the fields TrainPulse reads are modelled; everything else is ignored on
//! decode. Lateness values stay as raw JSON because the upstream feed mixes
//! numbers, numeric strings and nulls.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a `search/{origin}/to/{destination}/{yyyy}/{mm}/{dd}` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// `null` when the API has no services for the day
    #[serde(default)]
    pub services: Option<Vec<ServiceRecord>>,
}

impl SearchResponse {
    /// Services in upstream order, empty when the list is missing or null
    pub fn services(&self) -> &[ServiceRecord] {
        self.services.as_deref().unwrap_or_default()
    }
}

/// One train service calling at the searched location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atoc_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_passenger: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_detail: Option<LocationDetail>,
}

impl ServiceRecord {
    /// Services are passenger services unless the feed says otherwise
    pub fn is_passenger(&self) -> bool {
        self.is_passenger.unwrap_or(true)
    }

    pub fn is_cancelled(&self) -> bool {
        self.location_detail.as_ref().is_some_and(LocationDetail::is_cancelled)
    }

    /// Booked public departure time at the searched location
    pub fn booked_departure(&self) -> Option<NaiveTime> {
        self.location_detail.as_ref().and_then(LocationDetail::booked_departure)
    }
}

/// Call details of a service at the searched location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// `HHMM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gbtt_booked_departure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_departure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// `CALL`, `CANCELLED_CALL`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_as: Option<String>,
    /// Lateness against the public timetable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_gbtt_departure_lateness: Option<Value>,
    /// Lateness against the working timetable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_wtt_departure_lateness: Option<Value>,
}

impl LocationDetail {
    pub fn is_cancelled(&self) -> bool {
        self.display_as.as_deref().is_some_and(|display| display.starts_with("CANCELLED"))
    }

    pub fn booked_departure(&self) -> Option<NaiveTime> {
        self.gbtt_booked_departure
            .as_deref()
            .and_then(|hhmm| NaiveTime::parse_from_str(hhmm.trim(), "%H%M").ok())
    }
}
