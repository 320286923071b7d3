//! The lock manager: the entry point to the lock protocol.
//!
//! # Transitions
//!
//! Every mutating operation runs as one conditional update against the store:
//!
//! 1. load a snapshot of the record
//! 2. decide the new state from the snapshot and the current time
//! 3. `compare_and_swap` the new state in, conditional on the snapshot
//!
//! If step 3 loses a race the whole decision is redone from a fresh snapshot,
//! so two callers can never both commit a transition from the same state.
//! Transitions:
//!
//! - acquire: unlocked or expired -> locked (fresh token, hold count 1)
//! - reacquire: held by token -> hold count + 1
//! - extend: held by token -> `expires_at = now + maxtime`
//! - release: held by token -> hold count - 1, unlocked at 0
//!
//! Store failures are returned as-is and never retried here.

mod backoff;


use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{DistlockError, Result};
use crate::lock::Lock;
use crate::record::{LockRecord, lease_end};
use crate::store::{LockStore, validate_name};
use crate::token::Token;
use crate::vacuum;
use backoff::Backoff;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Outcome of deciding a transition from a snapshot.
enum Step<T> {
    /// Swap in this state (`None` deletes) and return the value.
    Commit(Option<LockRecord>, T),
    /// Leave the store alone and return this.
    Done(Result<T>),
}

/// Hands out [`Lock`] handles and performs token-based lock operations.
///
/// Cloning is cheap; clones share the same store and clock.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LockManager {
    /// Create a manager over `store` using the system clock.
    pub fn new(store: Arc<dyn LockStore>, config: Config) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock (e.g., with a `ManualClock` in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current time according to this manager's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A handle for the lock called `name`. No I/O.
    pub fn get(&self, name: &str) -> Lock {
        Lock::new(self.clone(), name)
    }

    /// Acquire `name`, waiting up to `timeout` while it is held.
    ///
    /// `None` uses the configured `acquire_timeout`. A zero timeout makes a
    /// single attempt. Returns the token of the new epoch, or
    /// `CouldNotAcquireLock` once the timeout has elapsed. A timed-out call
    /// leaves the store untouched.
    pub fn acquire(&self, name: &str, timeout: Option<Duration>) -> Result<Token> {
        validate_name(name)?;
        let timeout = timeout.unwrap_or_else(|| self.config.acquire_timeout.as_duration());
        // Overflowing deadlines mean "wait forever"
        let deadline = Instant::now().checked_add(timeout);
        let mut backoff = Backoff::new(&self.config.backoff);

        loop {
            if let Some(token) = self.acquire_once(name)? {
                return Ok(token);
            }

            let mut delay = backoff.next_delay();
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    debug!(lock = name, ?timeout, "lock still held, giving up");
                    return Err(DistlockError::CouldNotAcquireLock(name.to_string()));
                }
                delay = delay.min(deadline - now);
            }

            debug!(lock = name, ?delay, "lock held, backing off");
            std::thread::sleep(delay);
        }
    }

    /// Acquire `name` if it is free right now.
    ///
    /// Returns `None` without touching the store when a live token holds it.
    pub fn try_acquiring(&self, name: &str) -> Result<Option<Token>> {
        validate_name(name)?;
        self.acquire_once(name)
    }

    /// Push the lease of `name` out to `now + maxtime`.
    ///
    /// Fails with `LockExpired` unless `token` is the live holder. An expired
    /// lease cannot be revived: someone else may already hold the lock.
    pub fn extend(&self, name: &str, token: &Token) -> Result<()> {
        validate_name(name)?;
        let maxtime = self.config.maxtime.as_chrono();

        self.transact(name, |current, now| match current {
            Some(record) if record.is_held_by(token, now) => match lease_end(now, maxtime) {
                Ok(expires_at) => {
                    let mut next = record.clone();
                    next.expires_at = Some(expires_at);
                    Step::Commit(Some(next), ())
                }
                Err(e) => Step::Done(Err(e)),
            },
            _ => Step::Done(Err(DistlockError::LockExpired(name.to_string()))),
        })?;

        debug!(lock = name, "extended lock");
        Ok(())
    }

    /// Release one hold of `name`.
    ///
    /// The lock becomes free once every reentrant hold has been released.
    /// Fails with `LockExpired` unless `token` is the live holder.
    pub fn release(&self, name: &str, token: &Token) -> Result<()> {
        self.release_counted(name, token).map(|_| ())
    }

    /// Release one hold of `name`, treating a lost lease as already released.
    ///
    /// Returns whether a hold was actually released.
    pub fn release_ignore_expired(&self, name: &str, token: &Token) -> Result<bool> {
        match self.release_counted(name, token) {
            Ok(_) => Ok(true),
            Err(DistlockError::LockExpired(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete every expired or released record. Returns the number removed.
    pub fn vacuum(&self) -> Result<usize> {
        let removed = vacuum::sweep(self.store.as_ref(), self.clock.now())?;
        if removed > 0 {
            info!(removed, "vacuumed lock records");
        }
        Ok(removed)
    }

    /// The stored record for `name`, if any.
    pub fn inspect(&self, name: &str) -> Result<Option<LockRecord>> {
        validate_name(name)?;
        self.store.load(name)
    }

    /// Every stored record, sorted by name.
    pub fn records(&self) -> Result<Vec<LockRecord>> {
        let mut records = self.store.scan()?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    /// Add a reentrant hold for `token` if it is still the live holder.
    pub(crate) fn reacquire(&self, name: &str, token: &Token) -> Result<bool> {
        validate_name(name)?;

        let reacquired = self.transact(name, |current, now| match current {
            Some(record) if record.is_held_by(token, now) => {
                let mut next = record.clone();
                next.hold_count += 1;
                Step::Commit(Some(next), true)
            }
            _ => Step::Done(Ok(false)),
        })?;

        if reacquired {
            debug!(lock = name, "reentered lock");
        }
        Ok(reacquired)
    }

    /// Release one hold and return the holds that remain.
    pub(crate) fn release_counted(&self, name: &str, token: &Token) -> Result<u32> {
        validate_name(name)?;

        let remaining = self.transact(name, |current, now| match current {
            Some(record) if record.is_held_by(token, now) => {
                let mut next = record.clone();
                next.hold_count = next.hold_count.saturating_sub(1);
                if next.hold_count == 0 {
                    next.token = None;
                    next.expires_at = None;
                }
                let remaining = next.hold_count;
                Step::Commit(Some(next), remaining)
            }
            _ => Step::Done(Err(DistlockError::LockExpired(name.to_string()))),
        })?;

        debug!(lock = name, remaining, "released lock");
        Ok(remaining)
    }

    /// One non-blocking attempt to start a new epoch.
    fn acquire_once(&self, name: &str) -> Result<Option<Token>> {
        if self.config.vacuum_on_acquire
            && let Err(e) = self.vacuum()
        {
            warn!(error = %e, "vacuum before acquire failed");
        }

        let maxtime = self.config.maxtime.as_chrono();
        let token = self.transact(name, |current, now| match current {
            Some(record) if record.is_live(now) => Step::Done(Ok(None)),
            _ => match LockRecord::locked(name, now, maxtime) {
                Ok(next) => {
                    let token = next.token;
                    Step::Commit(Some(next), token)
                }
                Err(e) => Step::Done(Err(e)),
            },
        })?;

        if token.is_some() {
            debug!(lock = name, "acquired lock");
        }
        Ok(token)
    }

    /// Run one conditional update, redoing the decision after lost races.
    fn transact<T>(
        &self,
        name: &str,
        mut decide: impl FnMut(Option<&LockRecord>, DateTime<Utc>) -> Step<T>,
    ) -> Result<T> {
        loop {
            let now = self.clock.now();
            let current = self.store.load(name)?;

            match decide(current.as_ref(), now) {
                Step::Done(result) => return result,
                Step::Commit(mut next, value) => {
                    if let Some(next) = next.as_mut() {
                        next.version = current.as_ref().map_or(0, |r| r.version) + 1;
                    }
                    if self
                        .store
                        .compare_and_swap(name, current.as_ref(), next.as_ref())?
                    {
                        return Ok(value);
                    }
                    trace!(lock = name, "lost compare-and-set race, retrying");
                }
            }
        }
    }
}
