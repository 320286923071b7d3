//! Reclaiming records that no longer hold a lock.
//!
//! Vacuum is pure space reclamation. Acquire, extend and release already
//! treat expired records as unlocked, so skipping vacuum never affects
//! correctness; it only lets stale records accumulate.

use crate::error::Result;
use crate::store::LockStore;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Delete every record that is not live at `now`.
///
/// Deletion is conditional on the record being exactly what was scanned, so
/// a lock re-acquired between the scan and the delete survives the sweep.
/// Records the store can no longer parse are purged first. Returns the
/// number of records removed.
pub fn sweep(store: &dyn LockStore, now: DateTime<Utc>) -> Result<usize> {
    let mut removed = store.purge_unreadable()?;

    for record in store.scan()? {
        if record.is_live(now) {
            continue;
        }

        if store.compare_and_swap(&record.name, Some(&record), None)? {
            debug!(lock = %record.name, state = record.state(now).as_str(), "vacuumed lock record");
            removed += 1;
        } else {
            debug!(lock = %record.name, "lock record changed during vacuum, kept");
        }
    }

    Ok(removed)
}
