//! Rail data API access
//!
//! This module provides the HTTP-based client for the rail data API's
//! location search and the [`RailServiceProvider`] that turns a day's search
//! into the single service the device reports on.
//!
//! # Architecture
//!
//! - Talks to the network only through [`crate::http::Transport`]
//! - Basic authentication from configured credentials
//! - Circuit breaker + caller-driven retry for resilience

pub mod auth;
pub mod client;
pub mod provider;

pub use auth::BasicCredentials;
pub use client::{ApiHealth, RailApiClient, RailApiClientConfig, SearchOptions};
pub use provider::{select_best_service, timetable_moment, RailServiceProvider};
