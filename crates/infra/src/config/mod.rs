//! Configuration loading
//!
//! Builds an [`trainpulse_domain::AppConfig`] from environment variables or
//! a TOML/JSON file. Validation is left to the caller.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, find_config_file};
