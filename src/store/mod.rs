//! Persistence adapters for lock records.
//!
//! A store is the single source of truth shared by every participant. The
//! lock protocol needs exactly three things from it:
//!
//! - `load`: read one record by name
//! - `compare_and_swap`: replace (or delete) one record, but only if it still
//!   equals the snapshot the caller decided from
//! - `scan`: list every record (for vacuum and status display)
//!
//! Everything else, including expiry, is computed by the manager on top of
//! these primitives.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::StoreConfig;
use crate::error::{DistlockError, Result};
use crate::record::LockRecord;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Maximum length of a lock name.
pub const MAX_NAME_LEN: usize = 128;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").expect("lock name pattern is valid")
});

/// Atomic access to the shared lock table.
pub trait LockStore: Send + Sync {
    /// Read the record for `name`, if one exists.
    fn load(&self, name: &str) -> Result<Option<LockRecord>>;

    /// Atomically replace the record for `name`.
    ///
    /// The swap only happens if the stored record is still equal to
    /// `expected` (`None` meaning "no record exists"). `new = None` deletes
    /// the record. Returns `false` without touching the store when the
    /// precondition does not hold.
    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&LockRecord>,
        new: Option<&LockRecord>,
    ) -> Result<bool>;

    /// Every record currently in the store.
    fn scan(&self) -> Result<Vec<LockRecord>>;

    /// Delete records that can no longer be parsed, returning how many.
    ///
    /// Such a record holds no lock anyone can prove, yet blocks its name
    /// forever. Stores that cannot hold unparseable records keep the default.
    fn purge_unreadable(&self) -> Result<usize> {
        Ok(0)
    }
}

/// Check that `name` can be used as a store key.
///
/// Names become file names in [`FileStore`], so they are restricted to a
/// portable alphabet and may not start with a dot (reserved for store
/// bookkeeping files).
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || !NAME_RE.is_match(name) {
        return Err(DistlockError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Open the store described by `config`.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn LockStore>> {
    match config {
        StoreConfig::File { path } => Ok(Arc::new(FileStore::open(path)?)),
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
