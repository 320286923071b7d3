//! distlock: a distributed, reentrant mutex over a shared store.
//!
//! Independent processes serialize access to named resources through lock
//! records kept in one shared store. Each acquisition gets a random bearer
//! token; the token is required to extend or release the lock and can be
//! handed to another process. Leases expire after `maxtime` unless extended,
//! so a crashed holder never blocks others for longer than one lease.
//!
//! ```no_run
//! use distlock::{Config, init};
//!
//! let manager = init(&Config::default())?;
//!
//! // Process A
//! let token = manager.acquire("doc42", None)?;
//!
//! // Process B sees it held
//! assert!(manager.try_acquiring("doc42")?.is_none());
//!
//! // Process A (or anyone it handed the token to)
//! manager.extend("doc42", &token)?;
//! manager.release("doc42", &token)?;
//! # Ok::<(), distlock::DistlockError>(())
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod lock;
pub mod manager;
pub mod record;
pub mod store;
pub mod token;
pub mod vacuum;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{DistlockError, Result};
pub use lock::{Lock, LockGuard};
pub use manager::LockManager;
pub use record::{LockRecord, LockState};
pub use store::LockStore;
pub use token::Token;

/// Build a [`LockManager`] from configuration.
///
/// Opens (and for the file store, creates) the configured store. No lock
/// records are touched.
pub fn init(config: &Config) -> Result<LockManager> {
    config.validate()?;
    let store = store::open(&config.store)?;
    Ok(LockManager::new(store, config.clone()))
}
