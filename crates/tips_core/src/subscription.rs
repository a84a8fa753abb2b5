//! Subscriptions: named cursors over a topic log.
//!
//! Each subscription owns two cursors:
//!
//! - the **delivery cursor**, the next offset a pull reads when no explicit
//!   offset is given;
//! - the **acknowledged cursor**, below which every offset is confirmed
//!   processed.
//!
//! `acked <= delivered <= tail` holds at all times. Cursors are plain
//! settable integers: pulls and acks move them forward, restoring a
//! snapshot moves them back.
//!
//! ## Exclusive section
//!
//! Cursor reads and writes, and every snapshot mutation, happen under one
//! per-subscription mutex. A pull reads the log and advances the cursors
//! inside that section, so concurrent cursor-based pulls never receive
//! overlapping ranges. The section is released before a pull blocks; the
//! waiter then sleeps on the log's condition variable and recomputes its
//! range from the cursor after every wakeup.

use crate::cancel::CancelToken;
use crate::error::{BrokerError, BrokerResult, ResourceKind};
use crate::log::{MessageLog, WaitOutcome};
use crate::snapshot::SnapshotStore;
use crate::types::{MessageId, PullResult, SnapshotInfo, SubscriptionInfo};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// The cursor pair of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    /// Next offset read by a cursor-based pull.
    pub delivered: u64,
    /// Every offset below this is acknowledged.
    pub acked: u64,
}

impl Cursors {
    /// Both cursors at `offset`.
    pub const fn at(offset: u64) -> Self {
        Self {
            delivered: offset,
            acked: offset,
        }
    }

    /// Applies a delivery that ended just before `next`.
    fn deliver(&mut self, next: u64, autoack: bool) {
        if autoack {
            self.delivered = next;
            self.acked = next;
        } else {
            self.delivered = self.delivered.max(next);
        }
    }

    /// Moves the acknowledged cursor to `next` if that advances it.
    fn ack(&mut self, next: u64) -> bool {
        if next <= self.acked {
            return false;
        }
        self.acked = next;
        self.delivered = self.delivered.max(next);
        true
    }
}

/// Outcome of [`Subscription::pull`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pulled {
    /// At least one message was delivered.
    Delivered(PullResult),
    /// Nothing arrived before the deadline. Holds the start offset.
    TimedOut(u64),
    /// The caller's token was cancelled. Holds the start offset.
    Cancelled(u64),
}

impl Pulled {
    pub(crate) fn into_result(self) -> PullResult {
        match self {
            Self::Delivered(result) => result,
            Self::TimedOut(start) | Self::Cancelled(start) => PullResult {
                messages: Vec::new(),
                next_offset: start,
            },
        }
    }
}

/// A named, stateful reader over one topic.
#[derive(Debug)]
pub struct Subscription {
    name: String,
    topic: String,
    log: Arc<MessageLog>,
    removed: AtomicBool,
    state: Mutex<SubscriptionState>,
}

#[derive(Debug)]
struct SubscriptionState {
    cursors: Cursors,
    snapshots: SnapshotStore,
}

impl Subscription {
    /// Creates a subscription whose cursors start at the log's tail.
    pub(crate) fn new(name: impl Into<String>, log: Arc<MessageLog>) -> Self {
        let tail = log.tail();
        Self {
            name: name.into(),
            topic: log.topic().to_string(),
            log,
            removed: AtomicBool::new(false),
            state: Mutex::new(SubscriptionState {
                cursors: Cursors::at(tail),
                snapshots: SnapshotStore::new(),
            }),
        }
    }

    /// Returns the subscription name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the topic name.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the current cursors.
    pub fn cursors(&self) -> BrokerResult<Cursors> {
        let state = self.state.lock();
        self.ensure_live()?;
        Ok(state.cursors)
    }

    /// Returns a description of the subscription.
    pub fn info(&self) -> BrokerResult<SubscriptionInfo> {
        let state = self.state.lock();
        self.ensure_live()?;
        Ok(SubscriptionInfo {
            name: self.name.clone(),
            topic: self.topic.clone(),
            delivered: state.cursors.delivered,
            acked: state.cursors.acked,
            snapshots: state.snapshots.names(),
        })
    }

    /// Pulls up to `limit` messages, waiting until `deadline` if none are
    /// available.
    ///
    /// `limit` must already be validated as positive.
    pub(crate) fn pull(
        &self,
        limit: usize,
        autoack: bool,
        offset: Option<u64>,
        deadline: Instant,
        cancel: Option<&CancelToken>,
    ) -> BrokerResult<Pulled> {
        if let Some(token) = cancel {
            token.register(&self.log);
        }

        loop {
            let start = {
                let mut state = self.state.lock();
                self.ensure_live()?;

                let start = offset.unwrap_or(state.cursors.delivered);
                let tail = self.log.tail();
                if start > tail {
                    return Err(BrokerError::invalid_argument(format!(
                        "offset {start} is beyond the end of topic '{}' ({tail})",
                        self.topic
                    )));
                }

                let messages = self.log.read_from(start, limit);
                if let Some(last) = messages.last() {
                    let next_offset = last.id.next();
                    state.cursors.deliver(next_offset, autoack);
                    tracing::trace!(
                        topic = %self.topic,
                        subscription = %self.name,
                        start,
                        count = messages.len(),
                        autoack,
                        "delivered messages"
                    );
                    return Ok(Pulled::Delivered(PullResult {
                        messages,
                        next_offset,
                    }));
                }
                start
            };

            let outcome = self.log.wait_for_append(start, deadline, || {
                self.removed.load(Ordering::Acquire)
                    || cancel.is_some_and(CancelToken::is_cancelled)
            });

            match outcome {
                WaitOutcome::Appended => continue,
                WaitOutcome::TimedOut => return Ok(Pulled::TimedOut(start)),
                WaitOutcome::Interrupted => {
                    self.ensure_live()?;
                    return Ok(Pulled::Cancelled(start));
                }
                WaitOutcome::Closed => {
                    return Err(BrokerError::not_found(ResourceKind::Topic, &self.topic));
                }
            }
        }
    }

    /// Acknowledges messages up to and including the highest id in `ids`.
    ///
    /// Returns true if the acknowledged cursor moved. Acks that would not
    /// advance it are ignored.
    pub fn ack(&self, ids: &[MessageId]) -> BrokerResult<bool> {
        let Some(highest) = ids.iter().max().copied() else {
            return Err(BrokerError::invalid_argument("no message ids to acknowledge"));
        };

        let mut state = self.state.lock();
        self.ensure_live()?;

        let tail = self.log.tail();
        if highest.as_u64() >= tail {
            return Err(BrokerError::invalid_argument(format!(
                "message {} has not been published to topic '{}'",
                highest.as_u64(),
                self.topic
            )));
        }
        Ok(state.cursors.ack(highest.next()))
    }

    /// Records the acknowledged cursor under `name`, replacing any existing
    /// snapshot of that name.
    pub fn create_snapshot(&self, name: &str) -> BrokerResult<SnapshotInfo> {
        let mut state = self.state.lock();
        self.ensure_live()?;
        let acked = state.cursors.acked;
        Ok(state.snapshots.record(name, acked))
    }

    /// Rewinds both cursors to the value recorded in snapshot `name`.
    pub fn restore_snapshot(&self, name: &str) -> BrokerResult<SnapshotInfo> {
        let mut state = self.state.lock();
        self.ensure_live()?;
        let info = state
            .snapshots
            .get(name)
            .ok_or_else(|| BrokerError::not_found(ResourceKind::Snapshot, name))?;

        // The log never shrinks, so a recorded cursor is always within it.
        state.cursors = Cursors::at(info.acked);
        tracing::debug!(
            topic = %self.topic,
            subscription = %self.name,
            snapshot = name,
            offset = info.acked,
            "restored snapshot"
        );
        Ok(info)
    }

    /// Deletes snapshot `name`.
    pub fn delete_snapshot(&self, name: &str) -> BrokerResult<()> {
        let mut state = self.state.lock();
        self.ensure_live()?;
        state
            .snapshots
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BrokerError::not_found(ResourceKind::Snapshot, name))
    }

    /// Looks up snapshot `name` without restoring it.
    pub fn snapshot(&self, name: &str) -> BrokerResult<SnapshotInfo> {
        let state = self.state.lock();
        self.ensure_live()?;
        state
            .snapshots
            .get(name)
            .ok_or_else(|| BrokerError::not_found(ResourceKind::Snapshot, name))
    }

    /// Returns every snapshot sorted by name.
    pub fn snapshots(&self) -> BrokerResult<Vec<SnapshotInfo>> {
        let state = self.state.lock();
        self.ensure_live()?;
        Ok(state.snapshots.list())
    }

    /// Returns true once the subscription has been removed.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Marks the subscription removed, drops its snapshots and wakes any
    /// pull blocked on it.
    pub(crate) fn close(&self) {
        {
            let mut state = self.state.lock();
            self.removed.store(true, Ordering::Release);
            state.snapshots.clear();
        }
        self.log.interrupt();
    }

    fn ensure_live(&self) -> BrokerResult<()> {
        if self.removed.load(Ordering::Acquire) {
            return Err(BrokerError::not_found(ResourceKind::Subscription, &self.name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::thread;
    use std::time::Duration;

    fn log_with(count: usize) -> Arc<MessageLog> {
        let log = Arc::new(MessageLog::new("t"));
        if count > 0 {
            let payloads = (0..count).map(|i| Bytes::from(i.to_string())).collect();
            log.append(payloads).unwrap();
        }
        log
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_millis(20)
    }

    fn delivered(pulled: Pulled) -> PullResult {
        match pulled {
            Pulled::Delivered(result) => result,
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[test]
    fn cursors_start_at_tail() {
        let sub = Subscription::new("s", log_with(5));
        assert_eq!(sub.cursors().unwrap(), Cursors::at(5));
        assert_eq!(sub.topic(), "t");
    }

    #[test]
    fn autoack_advances_both_cursors() {
        let log = log_with(0);
        let sub = Subscription::new("s", Arc::clone(&log));
        log.append(vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")])
            .unwrap();

        let result = delivered(sub.pull(2, true, None, soon(), None).unwrap());
        assert_eq!(result.len(), 2);
        assert_eq!(result.next_offset, 2);
        assert_eq!(sub.cursors().unwrap(), Cursors::at(2));
    }

    #[test]
    fn manual_ack_moves_only_delivery() {
        let log = log_with(0);
        let sub = Subscription::new("s", Arc::clone(&log));
        log.append(vec![Bytes::from("a"), Bytes::from("b")]).unwrap();

        delivered(sub.pull(2, false, None, soon(), None).unwrap());
        let cursors = sub.cursors().unwrap();
        assert_eq!(cursors.delivered, 2);
        assert_eq!(cursors.acked, 0);

        assert!(sub.ack(&[MessageId::new(1)]).unwrap());
        assert_eq!(sub.cursors().unwrap(), Cursors::at(2));
    }

    #[test]
    fn ack_never_regresses() {
        let log = log_with(0);
        let sub = Subscription::new("s", Arc::clone(&log));
        log.append(vec![Bytes::from("a"); 4]).unwrap();

        assert!(sub.ack(&[MessageId::new(2)]).unwrap());
        assert!(!sub.ack(&[MessageId::new(1)]).unwrap());
        assert!(!sub.ack(&[MessageId::new(2)]).unwrap());
        assert_eq!(sub.cursors().unwrap().acked, 3);
        // Acking ahead of delivery drags the delivery cursor along.
        assert_eq!(sub.cursors().unwrap().delivered, 3);
    }

    #[test]
    fn ack_rejects_unpublished_ids() {
        let sub = Subscription::new("s", log_with(2));
        assert!(sub.ack(&[MessageId::new(2)]).is_err());
        assert!(sub.ack(&[]).is_err());
    }

    #[test]
    fn explicit_offset_beyond_tail_is_rejected() {
        let sub = Subscription::new("s", log_with(2));
        let err = sub.pull(1, true, Some(3), soon(), None).unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::InvalidArgument);
    }

    #[test]
    fn empty_pull_times_out() {
        let sub = Subscription::new("s", log_with(3));
        let pulled = sub.pull(1, true, None, soon(), None).unwrap();
        assert_eq!(pulled, Pulled::TimedOut(3));
        assert_eq!(pulled.into_result().next_offset, 3);
    }

    #[test]
    fn snapshot_restore_rewinds() {
        let log = log_with(0);
        let sub = Subscription::new("s", Arc::clone(&log));
        log.append(vec![Bytes::from("x"); 6]).unwrap();

        delivered(sub.pull(2, true, None, soon(), None).unwrap());
        sub.create_snapshot("shot").unwrap();
        delivered(sub.pull(3, true, None, soon(), None).unwrap());
        assert_eq!(sub.cursors().unwrap(), Cursors::at(5));

        let info = sub.restore_snapshot("shot").unwrap();
        assert_eq!(info.acked, 2);
        assert_eq!(sub.cursors().unwrap(), Cursors::at(2));
    }

    #[test]
    fn missing_snapshot_is_not_found() {
        let sub = Subscription::new("s", log_with(0));
        assert!(sub.restore_snapshot("nope").unwrap_err().is_not_found());
        assert!(sub.delete_snapshot("nope").unwrap_err().is_not_found());
        assert!(sub.snapshot("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn closed_subscription_rejects_operations() {
        let sub = Subscription::new("s", log_with(1));
        sub.create_snapshot("shot").unwrap();
        sub.close();

        assert!(sub.is_removed());
        assert!(sub.cursors().unwrap_err().is_not_found());
        assert!(sub.restore_snapshot("shot").unwrap_err().is_not_found());
        assert!(sub.pull(1, true, None, soon(), None).unwrap_err().is_not_found());
    }

    #[test]
    fn close_wakes_blocked_pull() {
        let sub = Arc::new(Subscription::new("s", log_with(0)));
        let closer = Arc::clone(&sub);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            closer.close();
        });

        let start = Instant::now();
        let err = sub
            .pull(1, true, None, start + Duration::from_secs(5), None)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(start.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }

    #[test]
    fn cancel_wakes_blocked_pull() {
        let sub = Subscription::new("s", log_with(0));
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            canceller.cancel();
        });

        let start = Instant::now();
        let pulled = sub
            .pull(1, true, None, start + Duration::from_secs(5), Some(&token))
            .unwrap();
        assert_eq!(pulled, Pulled::Cancelled(0));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(sub.cursors().unwrap(), Cursors::at(0));
        handle.join().unwrap();
    }
}
