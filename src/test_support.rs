use crate::clock::ManualClock;
use crate::config::{BackoffConfig, Config, Interval, StoreConfig};
use crate::manager::LockManager;
use crate::store::{FileStore, MemoryStore};
use chrono::Utc;
use std::sync::Arc;
use tempfile::TempDir;

/// Config with a short, jitter-free backoff so contended tests run fast.
pub(crate) fn test_config(maxtime_secs: u64) -> Config {
    Config {
        maxtime: Interval::from_secs(maxtime_secs),
        store: StoreConfig::Memory,
        acquire_timeout: Interval::from_secs(0),
        backoff: BackoffConfig {
            initial: Interval::from_millis(1),
            max: Interval::from_millis(10),
            jitter: Interval::from_millis(0),
        },
        vacuum_on_acquire: false,
    }
}

/// A manager over a fresh memory store with a manually driven clock.
pub(crate) fn memory_manager(maxtime_secs: u64) -> (LockManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = LockManager::new(Arc::new(MemoryStore::new()), test_config(maxtime_secs))
        .with_clock(clock.clone());
    (manager, clock)
}

/// A manager over a file store in a fresh temp directory, using the system clock.
pub(crate) fn file_manager(maxtime_secs: u64) -> (TempDir, LockManager) {
    let temp_dir = TempDir::new().unwrap();
    let manager = file_manager_at(&temp_dir, maxtime_secs);
    (temp_dir, manager)
}

/// Another manager over the same directory, as a second process would open it.
pub(crate) fn file_manager_at(temp_dir: &TempDir, maxtime_secs: u64) -> LockManager {
    let store = FileStore::open(temp_dir.path()).unwrap();
    let mut config = test_config(maxtime_secs);
    config.store = StoreConfig::File {
        path: temp_dir.path().to_path_buf(),
    };
    LockManager::new(Arc::new(store), config)
}
