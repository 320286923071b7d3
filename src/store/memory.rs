//! In-process store.
//!
//! Only coordinates handles within one process; use [`super::FileStore`] (or
//! another shared store) when several processes contend for the same names.

use super::LockStore;
use crate::error::Result;
use crate::record::LockRecord;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A lock table kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, LockRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<String, LockRecord>> {
        // A panic while holding the map cannot leave a half-written record.
        self.records
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl LockStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Option<LockRecord>> {
        Ok(self.records().get(name).cloned())
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&LockRecord>,
        new: Option<&LockRecord>,
    ) -> Result<bool> {
        let mut records = self.records();
        if records.get(name) != expected {
            return Ok(false);
        }

        match new {
            Some(record) => {
                records.insert(name.to_string(), record.clone());
            }
            None => {
                records.remove(name);
            }
        }
        Ok(true)
    }

    fn scan(&self) -> Result<Vec<LockRecord>> {
        Ok(self.records().values().cloned().collect())
    }
}
