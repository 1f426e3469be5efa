//! # TrainPulse App
//!
//! Process layer: wires configuration, the rail API client, the status device
//! and the device-framework bridge together.
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - [`AppContext`] owns every long-lived component
//! - `main.rs` handles signals and process exit

pub mod context;
pub mod utils;

pub use context::AppContext;
