//! Named lock handles and scoped acquisition.
//!
//! A [`Lock`] remembers the token of the acquisition it made, so callers in
//! the owning process do not have to pass tokens around. Acquiring through a
//! handle that already holds a live token is reentrant: it adds a hold
//! instead of waiting on itself.
//!
//! # RAII Guards
//!
//! [`Lock::guard`] returns a [`LockGuard`] that releases the lock when it
//! goes out of scope, on every exit path including `?` returns and panics.
//! If the release fails during drop, a warning is logged but no panic occurs.
//!
//! ```no_run
//! use distlock::{Config, init};
//! use std::time::Duration;
//!
//! let manager = init(&Config::default())?;
//! let mut lock = manager.get("doc42");
//! {
//!     let guard = lock.guard(Some(Duration::from_secs(5)))?;
//!     // ... exclusive work ...
//!     guard.extend()?;
//!     // ... more exclusive work ...
//! } // released here
//! # Ok::<(), distlock::DistlockError>(())
//! ```

use crate::error::{DistlockError, Result};
use crate::manager::LockManager;
use crate::token::Token;
use std::time::Duration;
use tracing::{debug, warn};

/// A handle for one named lock, bound to a [`LockManager`].
#[derive(Debug)]
pub struct Lock {
    manager: LockManager,
    name: String,
    token: Option<Token>,
}

impl Lock {
    pub(crate) fn new(manager: LockManager, name: &str) -> Self {
        Self {
            manager,
            name: name.to_string(),
            token: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The token this handle currently holds, if any.
    pub fn token(&self) -> Option<Token> {
        self.token
    }

    /// Take over a token obtained elsewhere (e.g., acquired by another process).
    ///
    /// Replaces any token the handle held before. No I/O; the token is only
    /// checked by the next extend or release.
    pub fn adopt(&mut self, token: Token) {
        self.token = Some(token);
    }

    /// Acquire the lock, waiting up to `timeout` while someone else holds it.
    ///
    /// If this handle already holds a live token, adds a reentrant hold and
    /// returns the same token without waiting.
    pub fn acquire(&mut self, timeout: Option<Duration>) -> Result<Token> {
        if let Some(token) = self.reenter()? {
            return Ok(token);
        }

        let token = self.manager.acquire(&self.name, timeout)?;
        self.token = Some(token);
        Ok(token)
    }

    /// Acquire the lock only if that is possible right now.
    pub fn try_acquiring(&mut self) -> Result<Option<Token>> {
        if let Some(token) = self.reenter()? {
            return Ok(Some(token));
        }

        let token = self.manager.try_acquiring(&self.name)?;
        self.token = token;
        Ok(token)
    }

    /// Renew the lease of the held token.
    ///
    /// Fails with `NotHeld` if this handle holds no token, and with
    /// `LockExpired` if the token is no longer the live holder.
    pub fn extend(&self) -> Result<()> {
        let token = self
            .token
            .ok_or_else(|| DistlockError::NotHeld(self.name.clone()))?;
        self.manager.extend(&self.name, &token)
    }

    /// Release one hold.
    ///
    /// The handle forgets its token once the last hold is released, and also
    /// when the release fails: a lease that was lost is no longer ours.
    pub fn release(&mut self) -> Result<()> {
        let token = self
            .token
            .ok_or_else(|| DistlockError::NotHeld(self.name.clone()))?;

        match self.manager.release_counted(&self.name, &token) {
            Ok(0) => {
                self.token = None;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                self.token = None;
                Err(e)
            }
        }
    }

    /// Acquire the lock and return a guard that releases it on drop.
    pub fn guard(&mut self, timeout: Option<Duration>) -> Result<LockGuard<'_>> {
        self.acquire(timeout)?;
        Ok(LockGuard {
            lock: self,
            released: false,
        })
    }

    /// Like [`Lock::guard`], but without waiting; `None` if the lock is held.
    pub fn try_guard(&mut self) -> Result<Option<LockGuard<'_>>> {
        if self.try_acquiring()?.is_none() {
            return Ok(None);
        }
        Ok(Some(LockGuard {
            lock: self,
            released: false,
        }))
    }

    /// Run `f` while holding the lock.
    ///
    /// The lock is released after `f` returns, and also if `f` panics. A
    /// failed release after `f` succeeded is returned as the error: the
    /// work ran, but exclusivity was lost somewhere along the way.
    pub fn with<T>(
        &mut self,
        timeout: Option<Duration>,
        f: impl FnOnce(&mut LockGuard<'_>) -> T,
    ) -> Result<T> {
        let mut guard = self.guard(timeout)?;
        let value = f(&mut guard);
        guard.release()?;
        Ok(value)
    }

    /// Add a hold if the current token is still live; forget it otherwise.
    fn reenter(&mut self) -> Result<Option<Token>> {
        let Some(token) = self.token else {
            return Ok(None);
        };

        if self.manager.reacquire(&self.name, &token)? {
            return Ok(Some(token));
        }

        debug!(lock = %self.name, "held token is no longer live, acquiring anew");
        self.token = None;
        Ok(None)
    }
}

/// Releases one hold of a [`Lock`] when dropped.
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a mut Lock,
    released: bool,
}

impl LockGuard<'_> {
    pub fn name(&self) -> &str {
        self.lock.name()
    }

    /// The token of the held acquisition.
    pub fn token(&self) -> Option<Token> {
        self.lock.token()
    }

    /// Renew the lease while inside the guarded scope.
    pub fn extend(&self) -> Result<()> {
        self.lock.extend()
    }

    /// Take a nested hold on the same lock.
    ///
    /// The returned guard releases its own hold on drop; the outer guard
    /// stays usable once it is gone. Fails with `LockExpired` if the lease
    /// ran out, rather than silently starting a new epoch.
    pub fn reenter(&mut self) -> Result<LockGuard<'_>> {
        if self.lock.reenter()?.is_none() {
            return Err(DistlockError::LockExpired(self.lock.name.clone()));
        }
        Ok(LockGuard {
            lock: &mut *self.lock,
            released: false,
        })
    }

    /// Release now and report the outcome, instead of waiting for drop.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.lock.release()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.lock.release() {
            Ok(()) => {}
            // The lease ran out inside the scope; nothing left to release
            Err(e) if e.is_lock_expired() || matches!(e, DistlockError::NotHeld(_)) => {
                debug!(lock = %self.lock.name, "lease expired before scope exit");
            }
            Err(e) => {
                warn!(lock = %self.lock.name, error = %e, "failed to release lock on scope exit");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_manager;
    use chrono::Duration as ChronoDuration;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn test_get_is_cheap_and_unbound() {
        let (manager, _clock) = memory_manager(60);
        let lock = manager.get("doc42");

        assert_eq!(lock.name(), "doc42");
        assert!(lock.token().is_none());
        assert!(manager.records().unwrap().is_empty());
    }

    #[test]
    fn test_acquire_stores_token() {
        let (manager, _clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        let token = lock.acquire(None).unwrap();

        assert_eq!(lock.token(), Some(token));
        lock.extend().unwrap();
        lock.release().unwrap();
        assert!(lock.token().is_none());
    }

    #[test]
    fn test_handle_is_reentrant() {
        let (manager, _clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        let first = lock.acquire(None).unwrap();
        let second = lock.acquire(None).unwrap();
        assert_eq!(first, second);
        assert_eq!(lock.try_acquiring().unwrap(), Some(first));
        assert_eq!(manager.inspect("doc42").unwrap().unwrap().hold_count, 3);

        lock.release().unwrap();
        lock.release().unwrap();
        assert_eq!(lock.token(), Some(first));
        assert!(manager.try_acquiring("doc42").unwrap().is_none());

        lock.release().unwrap();
        assert!(lock.token().is_none());
        assert!(manager.try_acquiring("doc42").unwrap().is_some());
    }

    #[test]
    fn test_other_handle_is_not_reentrant() {
        let (manager, _clock) = memory_manager(60);
        let mut mine = manager.get("doc42");
        let mut theirs = manager.get("doc42");

        mine.acquire(None).unwrap();

        assert!(theirs.try_acquiring().unwrap().is_none());
        assert!(matches!(
            theirs.acquire(None),
            Err(DistlockError::CouldNotAcquireLock(_))
        ));
    }

    #[test]
    fn test_expired_handle_acquires_new_epoch() {
        let (manager, clock) = memory_manager(60);
        let mut lock = manager.get("doc42");
        let old = lock.acquire(None).unwrap();

        clock.advance(ChronoDuration::seconds(90));
        let new = lock.acquire(None).unwrap();

        assert_ne!(old, new);
        assert_eq!(manager.inspect("doc42").unwrap().unwrap().hold_count, 1);
    }

    #[test]
    fn test_extend_without_token_is_not_held() {
        let (manager, _clock) = memory_manager(60);
        let lock = manager.get("doc42");

        assert!(matches!(lock.extend(), Err(DistlockError::NotHeld(_))));
    }

    #[test]
    fn test_release_forgets_token_even_when_expired() {
        let (manager, clock) = memory_manager(60);
        let mut lock = manager.get("doc42");
        lock.acquire(None).unwrap();

        clock.advance(ChronoDuration::seconds(60));

        assert!(lock.release().unwrap_err().is_lock_expired());
        assert!(lock.token().is_none());
        assert!(matches!(lock.release(), Err(DistlockError::NotHeld(_))));
    }

    #[test]
    fn test_adopted_token_can_release() {
        let (manager, _clock) = memory_manager(60);
        let token = manager.acquire("doc42", None).unwrap();

        let mut lock = manager.get("doc42");
        lock.adopt(token);
        lock.extend().unwrap();
        lock.release().unwrap();

        assert!(manager.try_acquiring("doc42").unwrap().is_some());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let (manager, _clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        {
            let guard = lock.guard(None).unwrap();
            assert!(guard.token().is_some());
            guard.extend().unwrap();
            assert!(manager.try_acquiring("doc42").unwrap().is_none());
        }

        assert!(lock.token().is_none());
        assert!(manager.try_acquiring("doc42").unwrap().is_some());
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let (manager, _clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = lock.guard(None).unwrap();
            panic!("protected operation failed");
        }));

        assert!(result.is_err());
        assert!(manager.try_acquiring("doc42").unwrap().is_some());
    }

    #[test]
    fn test_guard_drop_after_expiry_does_not_panic() {
        let (manager, clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        {
            let _guard = lock.guard(None).unwrap();
            clock.advance(ChronoDuration::minutes(5));
        }

        assert!(lock.token().is_none());
    }

    #[test]
    fn test_guard_manual_release_reports_outcome() {
        let (manager, clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        let guard = lock.guard(None).unwrap();
        clock.advance(ChronoDuration::minutes(5));

        assert!(guard.release().unwrap_err().is_lock_expired());
    }

    #[test]
    fn test_nested_guard_adds_and_drops_a_hold() {
        let (manager, _clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        let mut outer = lock.guard(None).unwrap();
        {
            let inner = outer.reenter().unwrap();
            assert_eq!(inner.token(), manager.inspect("doc42").unwrap().unwrap().token);
            assert_eq!(manager.inspect("doc42").unwrap().unwrap().hold_count, 2);
        }
        assert_eq!(manager.inspect("doc42").unwrap().unwrap().hold_count, 1);
        assert!(manager.try_acquiring("doc42").unwrap().is_none());

        outer.extend().unwrap();
        drop(outer);
        assert!(manager.try_acquiring("doc42").unwrap().is_some());
    }

    #[test]
    fn test_nested_guard_after_expiry_fails() {
        let (manager, clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        let mut outer = lock.guard(None).unwrap();
        clock.advance(ChronoDuration::minutes(5));

        assert!(outer.reenter().unwrap_err().is_lock_expired());
        assert!(outer.token().is_none());
        drop(outer);
        assert_eq!(manager.inspect("doc42").unwrap().unwrap().hold_count, 1);
    }

    #[test]
    fn test_nested_with_on_same_handle() {
        let (manager, _clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        let holds = lock
            .with(None, |guard| {
                let inner = guard.reenter().unwrap();
                let holds = manager.inspect("doc42").unwrap().unwrap().hold_count;
                inner.release().unwrap();
                holds
            })
            .unwrap();

        assert_eq!(holds, 2);
        assert!(manager.try_acquiring("doc42").unwrap().is_some());
    }

    #[test]
    fn test_try_guard_when_held() {
        let (manager, _clock) = memory_manager(60);
        manager.acquire("doc42", None).unwrap();

        let mut lock = manager.get("doc42");
        assert!(lock.try_guard().unwrap().is_none());
    }

    #[test]
    fn test_with_runs_body_and_releases() {
        let (manager, _clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        let value = lock
            .with(None, |guard| {
                assert_eq!(guard.name(), "doc42");
                42
            })
            .unwrap();

        assert_eq!(value, 42);
        assert!(manager.try_acquiring("doc42").unwrap().is_some());
    }

    #[test]
    fn test_with_propagates_body_errors_and_still_releases() {
        let (manager, _clock) = memory_manager(60);
        let mut lock = manager.get("doc42");

        let outcome: Result<std::result::Result<(), String>> =
            lock.with(None, |_| Err("body failed".to_string()));

        assert_eq!(outcome.unwrap(), Err("body failed".to_string()));
        assert!(manager.try_acquiring("doc42").unwrap().is_some());
    }
}
