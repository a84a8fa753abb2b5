//! Broker statistics.
//!
//! Counters are atomic and can be read while operations are in progress.

use std::sync::atomic::{AtomicU64, Ordering};

/// Broker counters.
#[derive(Debug, Default)]
pub struct BrokerStats {
    /// Messages appended across all topics.
    published: AtomicU64,
    /// Messages returned by pulls.
    delivered: AtomicU64,
    /// Ack calls that advanced a cursor.
    acks: AtomicU64,
    /// Pull calls that passed validation.
    pulls: AtomicU64,
    /// Pulls that returned empty after waiting out their timeout.
    pull_timeouts: AtomicU64,
    /// Snapshot restores.
    restores: AtomicU64,
}

impl BrokerStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_publish(&self, count: u64) {
        self.published.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_pull(&self, delivered: u64) {
        self.pulls.fetch_add(1, Ordering::Relaxed);
        self.delivered.fetch_add(delivered, Ordering::Relaxed);
    }

    pub(crate) fn record_pull_timeout(&self) {
        self.pull_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ack(&self) {
        self.acks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_restore(&self) {
        self.restores.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of published messages.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Returns the number of delivered messages.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Returns the number of cursor-advancing acks.
    pub fn acks(&self) -> u64 {
        self.acks.load(Ordering::Relaxed)
    }

    /// Returns the number of pulls.
    pub fn pulls(&self) -> u64 {
        self.pulls.load(Ordering::Relaxed)
    }

    /// Returns the number of pulls that timed out empty.
    pub fn pull_timeouts(&self) -> u64 {
        self.pull_timeouts.load(Ordering::Relaxed)
    }

    /// Returns the number of snapshot restores.
    pub fn restores(&self) -> u64 {
        self.restores.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published(),
            delivered: self.delivered(),
            acks: self.acks(),
            pulls: self.pulls(),
            pull_timeouts: self.pull_timeouts(),
            restores: self.restores(),
        }
    }
}

/// A point-in-time copy of [`BrokerStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Messages appended across all topics.
    pub published: u64,
    /// Messages returned by pulls.
    pub delivered: u64,
    /// Ack calls that advanced a cursor.
    pub acks: u64,
    /// Pull calls.
    pub pulls: u64,
    /// Pulls that timed out empty.
    pub pull_timeouts: u64,
    /// Snapshot restores.
    pub restores: u64,
}
