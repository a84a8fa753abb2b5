//! Wire protocol for the tips server.
//!
//! Each request is one JSON object per line, tagged by `op`. Each response
//! is one JSON object per line carrying a `status` code and a `body`.
//! Message ids travel as decimal strings so clients in any language can
//! hold them without precision loss.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tips_core::{Message, MessageId, SnapshotInfo, StatsSnapshot, SubscriptionInfo, TopicInfo};

use crate::error::{ServerError, ServerResult};

fn default_limit() -> i64 {
    1
}

/// A request line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Create a topic.
    CreateTopic {
        /// Topic name.
        topic: String,
    },
    /// Describe a topic.
    Topic {
        /// Topic name.
        topic: String,
    },
    /// Destroy a topic and everything under it.
    DestroyTopic {
        /// Topic name.
        topic: String,
    },
    /// Append payloads to a topic.
    Publish {
        /// Topic name.
        topic: String,
        /// UTF-8 payloads, in order.
        messages: Vec<String>,
    },
    /// Create a subscription.
    Subscribe {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
    },
    /// Remove a subscription.
    Unsubscribe {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
    },
    /// Describe a subscription.
    Subscription {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
    },
    /// Fetch messages, waiting up to `timeout` seconds when none are ready.
    Pull {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
        /// Maximum number of messages.
        #[serde(default = "default_limit")]
        limit: i64,
        /// Advance the acknowledged cursor along with delivery.
        #[serde(default)]
        autoack: bool,
        /// Wait bound in seconds.
        #[serde(default)]
        timeout: Option<f64>,
        /// Id of the last message the client already holds.
        #[serde(default)]
        offset: Option<String>,
    },
    /// Acknowledge messages up to the highest given id.
    Ack {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
        /// Message ids.
        ids: Vec<String>,
    },
    /// Record the acknowledged position under a name.
    CreateSnapshot {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
        /// Snapshot name; generated when empty.
        #[serde(default)]
        name: String,
    },
    /// Rewind or fast-forward to a snapshot.
    RestoreSnapshot {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
        /// Snapshot name.
        name: String,
    },
    /// Delete a snapshot.
    DeleteSnapshot {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
        /// Snapshot name.
        name: String,
    },
    /// List snapshots of a subscription.
    Snapshots {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
    },
    /// Describe one snapshot.
    Seek {
        /// Topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
        /// Snapshot name.
        name: String,
    },
    /// Broker counters.
    Stats,
}

impl Request {
    /// Parses a request line.
    pub fn parse(line: &str) -> ServerResult<Self> {
        serde_json::from_str(line)
            .map_err(|e| ServerError::InvalidRequest(format!("malformed request: {e}")))
    }

    /// Returns the operation name, as it appears on the wire.
    pub fn op(&self) -> &'static str {
        match self {
            Request::CreateTopic { .. } => "create_topic",
            Request::Topic { .. } => "topic",
            Request::DestroyTopic { .. } => "destroy_topic",
            Request::Publish { .. } => "publish",
            Request::Subscribe { .. } => "subscribe",
            Request::Unsubscribe { .. } => "unsubscribe",
            Request::Subscription { .. } => "subscription",
            Request::Pull { .. } => "pull",
            Request::Ack { .. } => "ack",
            Request::CreateSnapshot { .. } => "create_snapshot",
            Request::RestoreSnapshot { .. } => "restore_snapshot",
            Request::DeleteSnapshot { .. } => "delete_snapshot",
            Request::Snapshots { .. } => "snapshots",
            Request::Seek { .. } => "seek",
            Request::Stats => "stats",
        }
    }
}

/// A response line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// Operation result, or `{"error": ...}` on failure.
    pub body: Value,
}

impl Response {
    /// Creates a successful response.
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Creates an error response.
    pub fn from_error(err: &ServerError) -> Self {
        Self {
            status: err.status_code(),
            body: serde_json::json!({ "error": err.to_string() }),
        }
    }

    /// Returns true if the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Encodes the response as a single line, without the trailing newline.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":500,"body":{{"error":"encode failed: {e}"}}}}"#)
        })
    }
}

/// Parses a decimal message id.
pub fn parse_id(raw: &str) -> ServerResult<MessageId> {
    raw.trim()
        .parse::<u64>()
        .map(MessageId::new)
        .map_err(|_| ServerError::InvalidRequest(format!("invalid message id '{raw}'")))
}

/// A delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Decimal message id.
    pub id: String,
    /// Payload, lossily decoded as UTF-8.
    pub payload: String,
    /// Append time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.as_u64().to_string(),
            payload: String::from_utf8_lossy(&message.payload).into_owned(),
            created_at: message.created_at,
        }
    }
}

/// Body of a pull response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePull {
    /// Messages in id order.
    pub messages: Vec<WireMessage>,
    /// Position right after the last message returned.
    pub next_offset: u64,
}

/// Body of a topic description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTopic {
    /// Topic name.
    pub name: String,
    /// Id the next published message will get.
    pub tail: u64,
    /// Subscription names.
    pub subscriptions: Vec<String>,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl From<TopicInfo> for WireTopic {
    fn from(info: TopicInfo) -> Self {
        Self {
            name: info.name,
            tail: info.tail,
            subscriptions: info.subscriptions,
            created_at: info.created_at,
        }
    }
}

/// Body of a subscription description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSubscription {
    /// Subscription name.
    pub name: String,
    /// Owning topic.
    pub topic: String,
    /// Delivery cursor.
    pub delivered: u64,
    /// Acknowledged cursor.
    pub acked: u64,
    /// Snapshot names.
    pub snapshots: Vec<String>,
}

impl From<SubscriptionInfo> for WireSubscription {
    fn from(info: SubscriptionInfo) -> Self {
        Self {
            name: info.name,
            topic: info.topic,
            delivered: info.delivered,
            acked: info.acked,
            snapshots: info.snapshots,
        }
    }
}

/// Body of a snapshot description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSnapshot {
    /// Snapshot name.
    pub name: String,
    /// Captured acknowledged cursor.
    pub acked: u64,
    /// Capture time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl From<SnapshotInfo> for WireSnapshot {
    fn from(info: SnapshotInfo) -> Self {
        Self {
            name: info.name,
            acked: info.acked,
            created_at: info.created_at,
        }
    }
}

/// Body of a stats response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireStats {
    /// Messages appended.
    pub published: u64,
    /// Messages handed to consumers.
    pub delivered: u64,
    /// Acks that advanced a cursor.
    pub acks: u64,
    /// Pull calls.
    pub pulls: u64,
    /// Pulls that returned empty after waiting.
    pub pull_timeouts: u64,
    /// Snapshot restores.
    pub restores: u64,
}

impl From<StatsSnapshot> for WireStats {
    fn from(stats: StatsSnapshot) -> Self {
        Self {
            published: stats.published,
            delivered: stats.delivered,
            acks: stats.acks,
            pulls: stats.pulls,
            pull_timeouts: stats.pull_timeouts,
            restores: stats.restores,
        }
    }
}
