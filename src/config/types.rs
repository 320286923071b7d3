//! Configuration types and defaults for distlock.

use crate::error::{DistlockError, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

static INTERVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*(ms|s|m|h|d)?\s*$").expect("interval pattern is valid")
});

/// A time interval written as `<n><unit>` (`ms`, `s`, `m`, `h`, `d`).
///
/// A bare number is read as seconds, so `maxtime: 30` and `maxtime: 30s`
/// mean the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval(Duration);

impl Interval {
    pub const fn from_duration(d: Duration) -> Self {
        Self(d)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Parse an interval string such as `1m`, `250ms` or `90`.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = INTERVAL_RE.captures(s).ok_or_else(|| {
            DistlockError::Config(format!(
                "invalid time interval '{}': expected <number>[ms|s|m|h|d]",
                s
            ))
        })?;

        let value: u64 = caps[1]
            .parse()
            .map_err(|_| DistlockError::Config(format!("time interval '{}' is too large", s)))?;

        let unit_millis: u64 = match caps.get(2).map(|m| m.as_str()) {
            Some("ms") => 1,
            None | Some("s") => 1_000,
            Some("m") => 60_000,
            Some("h") => 3_600_000,
            Some("d") => 86_400_000,
            Some(other) => {
                return Err(DistlockError::Config(format!(
                    "unknown time unit '{}'",
                    other
                )));
            }
        };

        let millis = value
            .checked_mul(unit_millis)
            .ok_or_else(|| DistlockError::Config(format!("time interval '{}' is too large", s)))?;
        Ok(Self(Duration::from_millis(millis)))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// The interval as a chrono duration, for timestamp arithmetic.
    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.0).unwrap_or(chrono::Duration::MAX)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        // Largest unit that represents the value exactly
        for (unit, size) in [("d", 86_400_000), ("h", 3_600_000), ("m", 60_000), ("s", 1_000)] {
            if millis > 0 && millis % size == 0 {
                return write!(f, "{}{}", millis / size, unit);
            }
        }
        if millis == 0 {
            return write!(f, "0s");
        }
        write!(f, "{}ms", millis)
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Interval::from_secs(secs)),
            Raw::Text(text) => Interval::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// Which store backs the lock table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// JSON records in a directory shared by all participants.
    File {
        #[serde(default = "default_store_path")]
        path: PathBuf,
    },
    /// Process-local table (tests and single-process embedding).
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_store_path(),
        }
    }
}

/// Polling schedule for a contended `acquire`.
///
/// Delays start at `initial`, double after each failed attempt up to `max`,
/// and get a random `0..=jitter` added so contenders do not poll in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial: Interval,
    pub max: Interval,
    pub jitter: Interval,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Interval::from_millis(50),
            max: Interval::from_secs(2),
            jitter: Interval::from_millis(25),
        }
    }
}

// Default value functions for serde
pub(crate) fn default_maxtime() -> Interval {
    Interval::from_secs(60)
}
pub(crate) fn default_acquire_timeout() -> Interval {
    Interval::from_secs(0)
}
pub(crate) fn default_store_path() -> PathBuf {
    PathBuf::from(".distlock")
}
