//! # TrainPulse Domain
//!
//! Business domain types and models for TrainPulse.
//!
//! This crate contains:
//! - Upstream schedule record types (search response, service, lateness)
//! - Punctuality modes and their presentation tables (status, air quality)
//! - Device identity and status change events
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - Depends only on the foundation tier of `trainpulse-common`
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
