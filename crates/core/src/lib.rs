//! # TrainPulse Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Delay derivation (schedule record to lateness to mode)
//! - The status polling device and its periodic driver
//! - Port interfaces (traits) for the rail data source and the device
//!   framework
//!
//! ## Architecture Principles
//! - Only depends on `trainpulse-domain`
//! - No HTTP or device-framework code
//! - All external dependencies via traits

pub mod status;

pub use status::derivation::{calculate_delay_minutes, derive_mode_from_delay, has_delay_changed};
pub use status::ports::{ChannelListener, DeviceEndpoint, ServiceProvider, StatusListener};
pub use status::StatusDevice;
