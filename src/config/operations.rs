//! Config loading, environment overrides and validation.

use super::model::Config;
use super::types::{Interval, StoreConfig};
use crate::error::{DistlockError, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding `maxtime`.
pub const ENV_MAXTIME: &str = "DISTLOCK_MAXTIME";

/// Environment variable overriding the file store directory.
pub const ENV_STORE_PATH: &str = "DISTLOCK_STORE_PATH";

/// Longest accepted lease (ten years).
pub const MAX_MAXTIME: Interval = Interval::from_secs(10 * 365 * 24 * 60 * 60);

impl Config {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(DistlockError::Config)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            DistlockError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path` if it exists, otherwise start from defaults.
    ///
    /// Environment overrides are applied either way, and the result is
    /// validated.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null, not as an empty map
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                DistlockError::Config(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            DistlockError::Config(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Apply `DISTLOCK_MAXTIME` and `DISTLOCK_STORE_PATH` when set.
    ///
    /// Setting a store path switches the store to the file backend.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(ENV_MAXTIME) {
            self.maxtime = Interval::parse(&raw).map_err(|e| {
                DistlockError::Config(format!("invalid {}: {}", ENV_MAXTIME, e))
            })?;
        }

        if let Some(path) = std::env::var_os(ENV_STORE_PATH) {
            self.store = StoreConfig::File {
                path: PathBuf::from(path),
            };
        }

        Ok(())
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `maxtime` must be positive and at most [`MAX_MAXTIME`]
    /// - `backoff.initial` must be positive
    /// - `backoff.max` must not be below `backoff.initial`
    pub fn validate(&self) -> Result<()> {
        if self.maxtime.is_zero() {
            return Err(DistlockError::Config(
                "config validation failed: maxtime must be greater than 0".to_string(),
            ));
        }

        if self.maxtime > MAX_MAXTIME {
            return Err(DistlockError::Config(format!(
                "config validation failed: maxtime ({}) must be at most {}",
                self.maxtime, MAX_MAXTIME
            )));
        }

        if self.backoff.initial.is_zero() {
            return Err(DistlockError::Config(
                "config validation failed: backoff.initial must be greater than 0".to_string(),
            ));
        }

        if self.backoff.max < self.backoff.initial {
            return Err(DistlockError::Config(format!(
                "config validation failed: backoff.max ({}) must be at least backoff.initial ({})",
                self.backoff.max, self.backoff.initial
            )));
        }

        if let StoreConfig::File { path } = &self.store
            && path.as_os_str().is_empty()
        {
            return Err(DistlockError::Config(
                "config validation failed: store.path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
