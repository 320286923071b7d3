//! The persisted state of one named lock.
//!
//! # Record Fields
//!
//! - `name`: the lock name (store key)
//! - `token`: current holder's bearer token, `None` when unlocked
//! - `acquired_at` / `expires_at`: lease window of the current epoch
//! - `hold_count`: reentrant acquisitions by the current token
//! - `owner`: `user@HOST` of the process that started the epoch (informational)
//! - `version`: write counter used as the compare-and-set precondition
//!
//! A record whose `expires_at` has passed is unlocked regardless of the token
//! it still carries.

use crate::error::{DistlockError, Result};
use crate::token::Token;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One lock's persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Lock name.
    pub name: String,

    /// Current holder, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,

    /// When the current epoch started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired_at: Option<DateTime<Utc>>,

    /// When the current lease runs out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Reentrant hold count of the current token.
    #[serde(default)]
    pub hold_count: u32,

    /// Who started the current epoch (e.g., `user@HOST`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Store write counter.
    #[serde(default)]
    pub version: u64,
}

/// Coarse state of a record at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Held by a token whose lease has not run out.
    Live,
    /// Still carries a token, but the lease has run out.
    Expired,
    /// Released (or never held).
    Unlocked,
}

impl LockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Live => "LIVE",
            LockState::Expired => "EXPIRED",
            LockState::Unlocked => "UNLOCKED",
        }
    }
}

impl LockRecord {
    /// Start a new epoch: fresh token, hold count 1, lease of `maxtime`.
    ///
    /// `version` is left at 0; stores assign it on write. Fails if the lease
    /// end is past what the clock can represent.
    pub fn locked(name: &str, now: DateTime<Utc>, maxtime: Duration) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            token: Some(Token::generate()),
            acquired_at: Some(now),
            expires_at: Some(lease_end(now, maxtime)?),
            hold_count: 1,
            owner: Some(owner_string()),
            version: 0,
        })
    }

    /// State of the record at `now`.
    pub fn state(&self, now: DateTime<Utc>) -> LockState {
        match (self.token, self.expires_at) {
            (Some(_), Some(expires_at)) if now < expires_at => LockState::Live,
            (Some(_), _) => LockState::Expired,
            (None, _) => LockState::Unlocked,
        }
    }

    /// Whether the record blocks acquisition at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == LockState::Live
    }

    /// Whether `token` is the live holder at `now`.
    pub fn is_held_by(&self, token: &Token, now: DateTime<Utc>) -> bool {
        self.is_live(now) && self.token.as_ref() == Some(token)
    }

    /// Remaining lease at `now`, if live.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self.expires_at {
            Some(expires_at) if self.is_live(now) => Some(expires_at - now),
            _ => None,
        }
    }

    /// Age of the current epoch as a human-readable string.
    pub fn age_string(&self, now: DateTime<Utc>) -> String {
        match self.acquired_at {
            Some(acquired_at) => format_duration(now.signed_duration_since(acquired_at)),
            None => "-".to_string(),
        }
    }
}

/// `now + maxtime`, or a config error if that overflows the calendar.
pub fn lease_end(now: DateTime<Utc>, maxtime: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(maxtime).ok_or_else(|| {
        DistlockError::Config(format!(
            "maxtime of {}s starting at {} overflows the clock",
            maxtime.num_seconds(),
            now.to_rfc3339()
        ))
    })
}

/// Format a duration as `1d 2h`, `3h 4m`, `5m 6s` or `7s`.
pub fn format_duration(d: Duration) -> String {
    let seconds = d.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Get the owner string recorded with a new epoch.
fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_record_is_live() {
        let now = Utc::now();
        let record = LockRecord::locked("doc42", now, Duration::seconds(60)).unwrap();

        assert_eq!(record.hold_count, 1);
        assert_eq!(record.state(now), LockState::Live);
        assert_eq!(record.expires_at, Some(now + Duration::seconds(60)));
        assert!(record.owner.as_deref().unwrap().contains('@'));
    }

    #[test]
    fn test_record_expires_at_boundary() {
        let now = Utc::now();
        let record = LockRecord::locked("doc42", now, Duration::seconds(60)).unwrap();

        let just_before = now + Duration::seconds(60) - Duration::milliseconds(1);
        assert!(record.is_live(just_before));

        // expires_at <= now means unlocked
        let at = now + Duration::seconds(60);
        assert_eq!(record.state(at), LockState::Expired);
        assert!(!record.is_live(at));
    }

    #[test]
    fn test_is_held_by_requires_matching_token() {
        let now = Utc::now();
        let record = LockRecord::locked("doc42", now, Duration::seconds(60)).unwrap();
        let token = record.token.unwrap();

        assert!(record.is_held_by(&token, now));
        assert!(!record.is_held_by(&Token::generate(), now));
        assert!(!record.is_held_by(&token, now + Duration::minutes(2)));
    }

    #[test]
    fn test_unlocked_record_state() {
        let record = LockRecord {
            name: "doc42".to_string(),
            token: None,
            acquired_at: None,
            expires_at: None,
            hold_count: 0,
            owner: None,
            version: 3,
        };
        assert_eq!(record.state(Utc::now()), LockState::Unlocked);
        assert_eq!(record.remaining(Utc::now()), None);
        assert_eq!(record.age_string(Utc::now()), "-");
    }

    #[test]
    fn test_record_json_omits_empty_fields() {
        let record = LockRecord {
            name: "doc42".to_string(),
            token: None,
            acquired_at: None,
            expires_at: None,
            hold_count: 0,
            owner: None,
            version: 1,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("token"));
        assert!(!json.contains("expires_at"));

        let parsed: LockRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(7)), "7s");
        assert_eq!(format_duration(Duration::seconds(306)), "5m 6s");
        assert_eq!(format_duration(Duration::minutes(184)), "3h 4m");
        assert_eq!(format_duration(Duration::hours(26)), "1d 2h");
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }
}
