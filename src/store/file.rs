//! Directory-backed store shared through a filesystem.
//!
//! # Layout
//!
//! ```text
//! {dir}/.store.lock      exclusive OS lock held for every compare-and-set
//! {dir}/{name}.json      one record per lock name
//! {dir}/.{name}.json.tmp in-flight write (renamed over the record)
//! ```
//!
//! Records are replaced with write-temp-fsync-rename, so lock-free readers
//! always see a complete record. Every conditional write re-reads the record
//! while holding the store lock, compares it with the caller's snapshot, and
//! only then writes. The OS releases the store lock when its holder exits,
//! so a crashed process cannot wedge the store.

use super::LockStore;
use crate::error::{DistlockError, Result};
use crate::fs::atomic_write;
use crate::record::LockRecord;
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

const STORE_LOCK_FILE: &str = ".store.lock";
const RECORD_EXTENSION: &str = "json";

/// A lock table stored as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

/// Holds the store-wide lock until dropped.
struct StoreGuard {
    _file: File,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            DistlockError::Store(format!(
                "failed to create store directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, RECORD_EXTENSION))
    }

    fn lock_store(&self) -> Result<StoreGuard> {
        let path = self.dir.join(STORE_LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| {
                DistlockError::Store(format!(
                    "failed to open store lock '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        file.lock_exclusive().map_err(|e| {
            DistlockError::Store(format!(
                "failed to lock store '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(StoreGuard { _file: file })
    }

    /// Paths of all record files, skipping bookkeeping and in-flight temp files.
    fn record_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            DistlockError::Store(format!(
                "failed to read store directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                DistlockError::Store(format!("failed to read store directory entry: {}", e))
            })?;
            let path = entry.path();

            let is_record = path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION)
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if is_record {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

/// Read and parse one record file; a missing file is `None`.
fn read_record(path: &Path) -> Result<Option<LockRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(DistlockError::Store(format!(
                "failed to read lock record '{}': {}",
                path.display(),
                e
            )));
        }
    };

    serde_json::from_str(&content).map(Some).map_err(|e| {
        DistlockError::Store(format!(
            "failed to parse lock record '{}': {}",
            path.display(),
            e
        ))
    })
}

impl LockStore for FileStore {
    fn load(&self, name: &str) -> Result<Option<LockRecord>> {
        read_record(&self.record_path(name))
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&LockRecord>,
        new: Option<&LockRecord>,
    ) -> Result<bool> {
        let path = self.record_path(name);
        let _guard = self.lock_store()?;

        let current = read_record(&path)?;
        if current.as_ref() != expected {
            return Ok(false);
        }

        match new {
            Some(record) => {
                let json = serde_json::to_vec_pretty(record).map_err(|e| {
                    DistlockError::Store(format!("failed to serialize lock record: {}", e))
                })?;
                atomic_write(&path, &json)?;
            }
            None => match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(DistlockError::Store(format!(
                        "failed to delete lock record '{}': {}",
                        path.display(),
                        e
                    )));
                }
            },
        }
        Ok(true)
    }

    fn scan(&self) -> Result<Vec<LockRecord>> {
        let mut records = Vec::new();
        for path in self.record_paths()? {
            match read_record(&path) {
                Ok(Some(record)) => records.push(record),
                // Deleted between listing and reading
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable lock record"),
            }
        }

        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    fn purge_unreadable(&self) -> Result<usize> {
        let _guard = self.lock_store()?;

        let mut purged = 0;
        for path in self.record_paths()? {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            if serde_json::from_str::<LockRecord>(&content).is_ok() {
                continue;
            }

            fs::remove_file(&path).map_err(|e| {
                DistlockError::Store(format!(
                    "failed to delete corrupt lock record '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            warn!(path = %path.display(), "deleted corrupt lock record");
            purged += 1;
        }
        Ok(purged)
    }
}
