//! Exit code constants for the distlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid name/token, bad config)
//! - 2: Store failure
//! - 3: Lock is held by someone else
//! - 4: Lock expired or is held by another token

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid lock name or token, invalid config.
pub const USER_ERROR: i32 = 1;

/// The backing store could not be read or written.
pub const STORE_FAILURE: i32 = 2;

/// The lock could not be acquired (held by a live token).
pub const LOCK_UNAVAILABLE: i32 = 3;

/// The supplied token no longer holds the lock.
pub const LOCK_EXPIRED: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, STORE_FAILURE, LOCK_UNAVAILABLE, LOCK_EXPIRED];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
