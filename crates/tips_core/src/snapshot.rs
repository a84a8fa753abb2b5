//! Named checkpoints of a subscription's acknowledged cursor.
//!
//! Logs are immutable and append-only, so a checkpoint is just an offset:
//! taking one copies a single integer and restoring one rewinds the
//! owning subscription's cursors without touching message data.
//!
//! A `SnapshotStore` is not synchronized on its own. Each subscription
//! keeps its store inside the same exclusive section as its cursors.

use crate::types::{now_millis, SnapshotInfo};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    acked: u64,
    created_at: u64,
}

/// Snapshots of one subscription, keyed by name.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: BTreeMap<String, Snapshot>,
}

impl SnapshotStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `acked` under `name`, replacing any previous value.
    pub fn record(&mut self, name: &str, acked: u64) -> SnapshotInfo {
        let snapshot = Snapshot {
            acked,
            created_at: now_millis(),
        };
        let info = Self::info(name, &snapshot);
        self.entries.insert(name.to_string(), snapshot);
        info
    }

    /// Looks up a snapshot.
    pub fn get(&self, name: &str) -> Option<SnapshotInfo> {
        self.entries.get(name).map(|s| Self::info(name, s))
    }

    /// Removes a snapshot, returning it if it existed.
    pub fn remove(&mut self, name: &str) -> Option<SnapshotInfo> {
        self.entries.remove(name).map(|s| Self::info(name, &s))
    }

    /// Returns all snapshots sorted by name.
    pub fn list(&self) -> Vec<SnapshotInfo> {
        self.entries
            .iter()
            .map(|(name, s)| Self::info(name, s))
            .collect()
    }

    /// Returns snapshot names sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Returns the number of snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no snapshots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn info(name: &str, snapshot: &Snapshot) -> SnapshotInfo {
        SnapshotInfo {
            name: name.to_string(),
            acked: snapshot.acked,
            created_at: snapshot.created_at,
        }
    }
}
