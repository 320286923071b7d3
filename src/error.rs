//! Error types for distlock.
//!
//! Uses thiserror for derive macros. Lock-semantic failures (`CouldNotAcquireLock`,
//! `LockExpired`) are kept apart from infrastructure failures (`Store`) so callers
//! can decide on their own retry policy.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for distlock operations.
#[derive(Error, Debug)]
pub enum DistlockError {
    /// The lock could not be acquired before the timeout elapsed.
    #[error("could not acquire lock '{0}'")]
    CouldNotAcquireLock(String),

    /// The supplied token is not the live holder of the lock.
    ///
    /// Either the lock expired, was already released, or was acquired by
    /// someone else in the meantime.
    #[error("lock '{0}' expired or is no longer held by this token")]
    LockExpired(String),

    /// A `Lock` handle was asked to extend a lock it does not hold.
    #[error("lock '{0}' is not held by this handle")]
    NotHeld(String),

    /// The lock name cannot be used as a store key.
    #[error("invalid lock name '{0}': use 1-128 characters from [A-Za-z0-9._-], not starting with '.'")]
    InvalidName(String),

    /// A token string could not be parsed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Configuration could not be loaded or failed validation.
    #[error("{0}")]
    Config(String),

    /// The backing store failed (I/O, corrupt record, unreachable).
    #[error("store operation failed: {0}")]
    Store(String),
}

impl DistlockError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DistlockError::CouldNotAcquireLock(_) => exit_codes::LOCK_UNAVAILABLE,
            DistlockError::LockExpired(_) | DistlockError::NotHeld(_) => exit_codes::LOCK_EXPIRED,
            DistlockError::InvalidName(_)
            | DistlockError::InvalidToken(_)
            | DistlockError::Config(_) => exit_codes::USER_ERROR,
            DistlockError::Store(_) => exit_codes::STORE_FAILURE,
        }
    }

    /// Whether this error means the caller's lease is gone.
    pub fn is_lock_expired(&self) -> bool {
        matches!(self, DistlockError::LockExpired(_))
    }
}

/// Result type alias for distlock operations.
pub type Result<T> = std::result::Result<T, DistlockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn could_not_acquire_has_correct_exit_code() {
        let err = DistlockError::CouldNotAcquireLock("doc42".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_UNAVAILABLE);
    }

    #[test]
    fn lock_expired_has_correct_exit_code() {
        let err = DistlockError::LockExpired("doc42".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_EXPIRED);
        assert!(err.is_lock_expired());
    }

    #[test]
    fn store_error_is_not_a_lock_failure() {
        let err = DistlockError::Store("disk full".to_string());
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);
        assert!(!err.is_lock_expired());
    }

    #[test]
    fn user_errors_share_exit_code() {
        for err in [
            DistlockError::InvalidName("../x".to_string()),
            DistlockError::InvalidToken("zz".to_string()),
            DistlockError::Config("bad".to_string()),
        ] {
            assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        }
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = DistlockError::CouldNotAcquireLock("doc42".to_string());
        assert_eq!(err.to_string(), "could not acquire lock 'doc42'");

        let err = DistlockError::Store("connection refused".to_string());
        assert_eq!(err.to_string(), "store operation failed: connection refused");
    }
}
