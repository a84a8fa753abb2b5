//! Per-topic append-only message log.
//!
//! The log is the only state shared between producers and consumers of a
//! topic. Appends are serialized by the log mutex and become visible all at
//! once; every append broadcasts on a condition variable so that blocked
//! pulls can recheck their own range.
//!
//! ## Ordering
//!
//! Message ids are the positions of messages in the log. The first message
//! is id 0 and ids are gapless, so `tail` (the next id to assign) is always
//! the number of stored messages.

use crate::error::{BrokerError, BrokerResult, ResourceKind};
use crate::types::{now_millis, Message, MessageId};
use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Why [`MessageLog::wait_for_append`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The log grew past the awaited offset.
    Appended,
    /// The deadline passed without new data.
    TimedOut,
    /// The caller's interrupt predicate became true.
    Interrupted,
    /// The log was closed because its topic was destroyed.
    Closed,
}

/// An ordered, append-only sequence of messages for one topic.
#[derive(Debug)]
pub struct MessageLog {
    topic: String,
    state: Mutex<LogState>,
    appended: Condvar,
}

#[derive(Debug, Default)]
struct LogState {
    messages: Vec<Message>,
    closed: bool,
}

impl MessageLog {
    /// Creates an empty log for `topic`.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            state: Mutex::new(LogState::default()),
            appended: Condvar::new(),
        }
    }

    /// Returns the topic this log belongs to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Appends payloads in submission order and returns their ids.
    ///
    /// The whole batch is appended under one lock acquisition; readers see
    /// either none or all of it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the log has been closed.
    pub fn append(&self, payloads: Vec<Bytes>) -> BrokerResult<Vec<MessageId>> {
        let ids = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BrokerError::not_found(ResourceKind::Topic, &self.topic));
            }
            let created_at = now_millis();
            let first = state.messages.len() as u64;
            let mut ids = Vec::with_capacity(payloads.len());
            for (i, payload) in payloads.into_iter().enumerate() {
                let id = MessageId::new(first + i as u64);
                state.messages.push(Message {
                    id,
                    payload,
                    created_at,
                });
                ids.push(id);
            }
            ids
        };

        if !ids.is_empty() {
            self.appended.notify_all();
        }
        Ok(ids)
    }

    /// Returns up to `limit` messages starting at `offset`.
    ///
    /// Never blocks. Returns fewer messages (possibly none) if the log is
    /// shorter.
    pub fn read_from(&self, offset: u64, limit: usize) -> Vec<Message> {
        let state = self.state.lock();
        let Ok(start) = usize::try_from(offset) else {
            return Vec::new();
        };
        state
            .messages
            .get(start..)
            .map(|rest| rest.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the next id to be assigned.
    pub fn tail(&self) -> u64 {
        self.state.lock().messages.len() as u64
    }

    /// Returns the number of stored messages.
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Returns true if the log holds no messages.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the owning topic has been destroyed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Blocks until the log grows past `offset`, the deadline passes, the
    /// log is closed, or `interrupted` returns true.
    ///
    /// The log lock is released while waiting, so producers are never
    /// blocked by a waiter. `interrupted` is evaluated under the log lock
    /// and must not acquire any lock itself; anything that flips it must
    /// call [`interrupt`](Self::interrupt) afterwards.
    pub fn wait_for_append<F>(&self, offset: u64, deadline: Instant, interrupted: F) -> WaitOutcome
    where
        F: Fn() -> bool,
    {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return WaitOutcome::Closed;
            }
            if state.messages.len() as u64 > offset {
                return WaitOutcome::Appended;
            }
            if interrupted() {
                return WaitOutcome::Interrupted;
            }
            if self.appended.wait_until(&mut state, deadline).timed_out() {
                if state.closed {
                    return WaitOutcome::Closed;
                }
                if state.messages.len() as u64 > offset {
                    return WaitOutcome::Appended;
                }
                return WaitOutcome::TimedOut;
            }
        }
    }

    /// Wakes all waiters so they re-evaluate their wait condition.
    pub fn interrupt(&self) {
        let _state = self.state.lock();
        self.appended.notify_all();
    }

    /// Closes the log. Later appends fail and all waiters wake.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.appended.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn payloads(items: &[&'static str]) -> Vec<Bytes> {
        items.iter().map(|s| Bytes::from_static(s.as_bytes())).collect()
    }

    #[test]
    fn new_log_is_empty() {
        let log = MessageLog::new("t");
        assert_eq!(log.tail(), 0);
        assert!(log.is_empty());
        assert_eq!(log.topic(), "t");
    }

    #[test]
    fn append_assigns_gapless_ids() {
        let log = MessageLog::new("t");
        let first = log.append(payloads(&["a", "b"])).unwrap();
        let second = log.append(payloads(&["c"])).unwrap();

        assert_eq!(first, vec![MessageId::new(0), MessageId::new(1)]);
        assert_eq!(second, vec![MessageId::new(2)]);
        assert_eq!(log.tail(), 3);
    }

    #[test]
    fn read_from_offset_with_limit() {
        let log = MessageLog::new("t");
        log.append(payloads(&["0", "1", "2", "3", "4"])).unwrap();

        let messages = log.read_from(1, 2);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, MessageId::new(1));
        assert_eq!(messages[1].payload, Bytes::from_static(b"2"));

        assert_eq!(log.read_from(3, 10).len(), 2);
        assert!(log.read_from(5, 10).is_empty());
        assert!(log.read_from(99, 10).is_empty());
    }

    #[test]
    fn closed_log_rejects_appends() {
        let log = MessageLog::new("t");
        log.close();
        let err = log.append(payloads(&["x"])).unwrap_err();
        assert!(err.is_not_found());
        assert!(log.is_closed());
    }

    #[test]
    fn wait_returns_immediately_when_data_present() {
        let log = MessageLog::new("t");
        log.append(payloads(&["x"])).unwrap();
        let outcome = log.wait_for_append(0, Instant::now(), || false);
        assert_eq!(outcome, WaitOutcome::Appended);
    }

    #[test]
    fn wait_times_out() {
        let log = MessageLog::new("t");
        let deadline = Instant::now() + Duration::from_millis(30);
        assert_eq!(log.wait_for_append(0, deadline, || false), WaitOutcome::TimedOut);
    }

    #[test]
    fn wait_wakes_on_append() {
        let log = Arc::new(MessageLog::new("t"));
        let producer = Arc::clone(&log);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.append(payloads(&["x"])).unwrap();
        });

        let start = Instant::now();
        let outcome = log.wait_for_append(0, start + Duration::from_secs(5), || false);
        assert_eq!(outcome, WaitOutcome::Appended);
        assert!(start.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }

    #[test]
    fn wait_wakes_on_close() {
        let log = Arc::new(MessageLog::new("t"));
        let closer = Arc::clone(&log);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            closer.close();
        });

        let outcome = log.wait_for_append(0, Instant::now() + Duration::from_secs(5), || false);
        assert_eq!(outcome, WaitOutcome::Closed);
        handle.join().unwrap();
    }
}
