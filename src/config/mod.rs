//! Configuration model for distlock.
//!
//! This module defines the Config struct that represents `distlock.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, environment overrides, and
//! validation of config values.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use operations::{ENV_MAXTIME, ENV_STORE_PATH, MAX_MAXTIME};
pub use types::{BackoffConfig, Interval, StoreConfig};
