//! # TrainPulse Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HTTP transport (reqwest) behind a pluggable trait
//! - The resilient rail data API client and best-service selection
//! - Configuration loading from environment and files
//! - The bridge from device mode transitions to framework attributes
//!
//! ## Architecture
//! - Implements traits defined in `trainpulse-core`
//! - Depends on `trainpulse-common`, `trainpulse-domain` and
//!   `trainpulse-core`
//! - Contains all "impure" code (network, environment, files)

pub mod api;
pub mod bridge;
pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use api::{ApiHealth, BasicCredentials, RailApiClient, RailApiClientConfig, RailServiceProvider, SearchOptions};
pub use bridge::{ModeBridge, TracingEndpoint};
pub use http::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};
