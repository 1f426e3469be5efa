//! Device identity, status snapshots and change events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mode::{AirQuality, DelayMinutes, Mode, Status};
use super::schedule::ServiceRecord;
use crate::config::DeviceConfig;
use crate::constants::{DEVICE_PRODUCT_NAME, DEVICE_VENDOR_NAME};

/// Static identity metadata handed to the device framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor_name: String,
    pub product_name: String,
    pub serial_number: String,
}

impl DeviceInfo {
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            name: config.name.clone(),
            vendor_name: DEVICE_VENDOR_NAME.to_string(),
            product_name: DEVICE_PRODUCT_NAME.to_string(),
            serial_number: config.serial_number.clone(),
        }
    }
}

/// Punctuality derived from one successful poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainStatus {
    pub delay_minutes: DelayMinutes,
    pub status: Status,
    pub air_quality: AirQuality,
    pub updated_at: DateTime<Utc>,
}

impl TrainStatus {
    pub fn new(delay_minutes: DelayMinutes, mode: Mode, updated_at: DateTime<Utc>) -> Self {
        let status = mode.status();
        Self { delay_minutes, status, air_quality: status.air_quality(), updated_at }
    }
}

/// Announced once per mode transition, never for a repeated mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub previous_mode: Mode,
    pub current_mode: Mode,
    pub train_status: Option<TrainStatus>,
    pub selected_service: Option<ServiceRecord>,
    /// Failure message when the transition was forced by an error
    pub error: Option<String>,
    pub mode_changed: bool,
}

impl StatusChangeEvent {
    /// Transition caused by a successful poll
    pub fn from_poll(
        previous_mode: Mode,
        current_mode: Mode,
        train_status: TrainStatus,
        selected_service: Option<ServiceRecord>,
    ) -> Self {
        Self {
            previous_mode,
            current_mode,
            train_status: Some(train_status),
            selected_service,
            error: None,
            mode_changed: true,
        }
    }

    /// Transition to `UNKNOWN` forced by a failed poll
    pub fn from_failure(previous_mode: Mode, error: impl Into<String>) -> Self {
        Self {
            previous_mode,
            current_mode: Mode::Unknown,
            train_status: None,
            selected_service: None,
            error: Some(error.into()),
            mode_changed: true,
        }
    }
}

/// Attribute values written to the device framework for one mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    pub mode_code: u8,
    pub status: Status,
    /// Already collapsed onto the supported range
    pub air_quality: u8,
}

impl From<Mode> for AttributeUpdate {
    fn from(mode: Mode) -> Self {
        let status = mode.status();
        Self {
            mode_code: mode.code(),
            status,
            air_quality: status.air_quality().reported_ordinal(),
        }
    }
}
