//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a lock manager.
///
/// This struct represents the contents of `distlock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long a lock stays valid without being extended.
    #[serde(default = "default_maxtime")]
    pub maxtime: Interval,

    /// Backing store descriptor.
    #[serde(default)]
    pub store: StoreConfig,

    /// How long `acquire` waits when called without an explicit timeout.
    ///
    /// Zero means a single attempt: fail immediately if the lock is held.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: Interval,

    /// Polling schedule while waiting for a held lock.
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Run a vacuum pass before every fresh acquisition attempt.
    #[serde(default)]
    pub vacuum_on_acquire: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            maxtime: default_maxtime(),
            store: StoreConfig::default(),
            acquire_timeout: default_acquire_timeout(),
            backoff: BackoffConfig::default(),
            vacuum_on_acquire: false,
        }
    }
}
