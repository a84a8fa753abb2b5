//! Core type definitions for tips.

use crate::cancel::CancelToken;
use bytes::Bytes;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Position of a message within its topic's log.
///
/// Message IDs are assigned on append, start at 0, and are gapless and
/// strictly increasing within a topic. They double as log offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Creates a new message ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the offset immediately after this message.
    #[must_use]
    pub const fn next(self) -> u64 {
        self.0 + 1
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}

/// An immutable message stored in a topic log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sequence id assigned on append.
    pub id: MessageId,
    /// Opaque payload bytes.
    pub payload: Bytes,
    /// Append time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// Description of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInfo {
    /// Topic name.
    pub name: String,
    /// Next message id to be assigned.
    pub tail: u64,
    /// Names of the topic's subscriptions, sorted.
    pub subscriptions: Vec<String>,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// Description of a subscription and its cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Subscription name.
    pub name: String,
    /// Topic the subscription reads from.
    pub topic: String,
    /// Delivery cursor: next offset read by a cursor-based pull.
    pub delivered: u64,
    /// Acknowledged cursor: every offset below it is confirmed processed.
    pub acked: u64,
    /// Names of the subscription's snapshots, sorted.
    pub snapshots: Vec<String>,
}

/// Description of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// Snapshot name.
    pub name: String,
    /// Acknowledged cursor recorded when the snapshot was taken.
    pub acked: u64,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// Parameters of a pull.
///
/// ```
/// use std::time::Duration;
/// use tips_core::PullRequest;
///
/// let request = PullRequest::new(10)
///     .autoack(true)
///     .timeout(Duration::from_millis(200));
/// assert_eq!(request.limit, 10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PullRequest {
    /// Maximum number of messages to return. Must be positive.
    pub limit: usize,
    /// Acknowledge delivered messages immediately.
    pub autoack: bool,
    /// How long to wait for data. `None` uses the broker default.
    pub timeout: Option<Duration>,
    /// Explicit start offset. `None` reads from the delivery cursor.
    pub offset: Option<u64>,
    /// Token that aborts the wait when cancelled.
    pub cancel: Option<CancelToken>,
}

impl PullRequest {
    /// Creates a pull for up to `limit` messages.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Sets autoack mode.
    #[must_use]
    pub fn autoack(mut self, autoack: bool) -> Self {
        self.autoack = autoack;
        self
    }

    /// Sets the wait timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets an explicit start offset.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullResult {
    /// Delivered messages in ascending id order.
    pub messages: Vec<Message>,
    /// Offset following the last delivered message, or the start offset
    /// if nothing was delivered.
    pub next_offset: u64,
}

impl PullResult {
    /// Returns true if no messages were delivered.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the number of delivered messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns the id of the last delivered message.
    pub fn last_id(&self) -> Option<MessageId> {
        self.messages.last().map(|m| m.id)
    }
}

/// Current time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_millis)
        .unwrap_or(0)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturate() {
        assert_eq!(duration_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_millis(Duration::MAX), u64::MAX);
        assert!(now_millis() > 0);
    }

    #[test]
    fn message_id_ordering() {
        let a = MessageId::new(1);
        let b = MessageId::new(2);
        assert!(a < b);
        assert_eq!(a.next(), 2);
    }

    #[test]
    fn message_id_display() {
        assert_eq!(format!("{}", MessageId::new(42)), "msg:42");
    }

    #[test]
    fn pull_request_builder() {
        let request = PullRequest::new(3).autoack(true).offset(7);
        assert_eq!(request.limit, 3);
        assert!(request.autoack);
        assert_eq!(request.offset, Some(7));
        assert!(request.timeout.is_none());
        assert!(request.cancel.is_none());
    }

    #[test]
    fn pull_result_accessors() {
        let result = PullResult {
            messages: vec![Message {
                id: MessageId::new(4),
                payload: Bytes::from_static(b"x"),
                created_at: 0,
            }],
            next_offset: 5,
        };
        assert_eq!(result.len(), 1);
        assert!(!result.is_empty());
        assert_eq!(result.last_id(), Some(MessageId::new(4)));
    }
}
