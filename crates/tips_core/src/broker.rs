//! Broker facade.

use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult, ResourceKind};
use crate::registry::TopicRegistry;
use crate::stats::{BrokerStats, StatsSnapshot};
use crate::subscription::{Pulled, Subscription};
use crate::types::{
    MessageId, PullRequest, PullResult, SnapshotInfo, SubscriptionInfo, TopicInfo,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// The main broker handle.
///
/// `Broker` composes topics, subscriptions and snapshots into one
/// synchronous API. It owns all broker state; there is no process-wide
/// registry. Share it between threads behind an `Arc`.
///
/// Every operation returns a categorized [`BrokerError`] on failure. A
/// pull that times out is not an error: it returns an empty result.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tips_core::{Broker, PullRequest};
///
/// let broker = Broker::default();
/// broker.create_topic("orders").unwrap();
/// broker.subscribe("orders", "billing").unwrap();
///
/// let ids = broker.publish("orders", ["a", "b", "c"]).unwrap();
/// assert_eq!(ids.len(), 3);
///
/// let pulled = broker
///     .pull("orders", "billing", PullRequest::new(2).autoack(true))
///     .unwrap();
/// assert_eq!(pulled.len(), 2);
/// assert_eq!(pulled.next_offset, 2);
/// ```
#[derive(Debug, Default)]
pub struct Broker {
    config: BrokerConfig,
    registry: TopicRegistry,
    stats: BrokerStats,
}

impl Broker {
    /// Creates a broker with the given configuration.
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            registry: TopicRegistry::new(),
            stats: BrokerStats::new(),
        }
    }

    /// Returns the broker configuration.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Returns a snapshot of the broker counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Creates a topic.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the name is empty or too long
    /// - `AlreadyExists` if a topic of that name exists
    pub fn create_topic(&self, name: &str) -> BrokerResult<()> {
        self.validate_name(ResourceKind::Topic, name)?;
        self.registry.create(name)?;
        tracing::debug!(topic = name, "created topic");
        Ok(())
    }

    /// Describes a topic.
    pub fn topic(&self, name: &str) -> BrokerResult<TopicInfo> {
        self.validate_name(ResourceKind::Topic, name)?;
        Ok(self.registry.get(name)?.info())
    }

    /// Returns all topic names, sorted.
    pub fn topics(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Destroys a topic along with its subscriptions and snapshots.
    ///
    /// Pulls blocked on the topic wake up and fail with `NotFound`.
    pub fn destroy_topic(&self, name: &str) -> BrokerResult<()> {
        self.validate_name(ResourceKind::Topic, name)?;
        self.registry.destroy(name)?;
        tracing::debug!(topic = name, "destroyed topic");
        Ok(())
    }

    /// Appends a batch of payloads to a topic.
    ///
    /// Returns the assigned ids in submission order. The batch is appended
    /// atomically and wakes every pull waiting on the topic. Publishing to
    /// a topic without subscriptions succeeds; later subscribers start at
    /// the tail.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the batch is empty or larger than
    ///   `max_publish_batch`
    /// - `NotFound` if the topic does not exist
    pub fn publish<I, P>(&self, topic: &str, payloads: I) -> BrokerResult<Vec<MessageId>>
    where
        I: IntoIterator<Item = P>,
        P: Into<Bytes>,
    {
        self.validate_name(ResourceKind::Topic, topic)?;
        let payloads: Vec<Bytes> = payloads.into_iter().map(Into::into).collect();
        if payloads.is_empty() {
            return Err(BrokerError::invalid_argument("publish requires at least one message"));
        }
        if payloads.len() > self.config.max_publish_batch {
            return Err(BrokerError::invalid_argument(format!(
                "publish batch of {} exceeds the limit of {}",
                payloads.len(),
                self.config.max_publish_batch
            )));
        }

        let ids = self.registry.get(topic)?.log().append(payloads)?;
        self.stats.record_publish(ids.len() as u64);
        Ok(ids)
    }

    /// Subscribes `subscription` to `topic`.
    ///
    /// Both cursors start at the topic's current tail, so the subscriber
    /// sees only messages published afterwards. Returns that initial
    /// cursor.
    pub fn subscribe(&self, topic: &str, subscription: &str) -> BrokerResult<u64> {
        self.validate_name(ResourceKind::Topic, topic)?;
        self.validate_name(ResourceKind::Subscription, subscription)?;
        let (_, cursor) = self.registry.get(topic)?.subscribe(subscription)?;
        tracing::debug!(topic, subscription, cursor, "created subscription");
        Ok(cursor)
    }

    /// Removes a subscription and its snapshots.
    pub fn unsubscribe(&self, topic: &str, subscription: &str) -> BrokerResult<()> {
        self.validate_name(ResourceKind::Topic, topic)?;
        self.validate_name(ResourceKind::Subscription, subscription)?;
        self.registry.get(topic)?.unsubscribe(subscription)?;
        tracing::debug!(topic, subscription, "removed subscription");
        Ok(())
    }

    /// Describes a subscription.
    pub fn subscription(&self, topic: &str, subscription: &str) -> BrokerResult<SubscriptionInfo> {
        self.lookup(topic, subscription)?.info()
    }

    /// Pulls messages for a subscription.
    ///
    /// Reads from `request.offset` if given, otherwise from the delivery
    /// cursor. Returns immediately if anything is available; otherwise
    /// waits until a publish lands on the topic, the timeout elapses, or
    /// the request's cancel token fires. A wait that ends without data
    /// returns an empty result.
    ///
    /// With `autoack`, both cursors move past the last delivered message.
    /// Without it only the delivery cursor moves, and the acknowledged
    /// cursor waits for [`ack`](Self::ack).
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `limit` is zero or the offset lies beyond
    ///   the tail
    /// - `NotFound` if the topic or subscription does not exist, or is
    ///   removed while the pull waits
    pub fn pull(
        &self,
        topic: &str,
        subscription: &str,
        request: PullRequest,
    ) -> BrokerResult<PullResult> {
        if request.limit == 0 {
            return Err(BrokerError::invalid_argument("limit must be greater than zero"));
        }
        let sub = self.lookup(topic, subscription)?;

        let limit = self.config.pull_limit(request.limit);
        let deadline = Instant::now() + self.config.pull_timeout(request.timeout);
        let pulled = sub.pull(
            limit,
            request.autoack,
            request.offset,
            deadline,
            request.cancel.as_ref(),
        )?;

        if let Pulled::TimedOut(_) = pulled {
            self.stats.record_pull_timeout();
        }
        let result = pulled.into_result();
        self.stats.record_pull(result.len() as u64);
        Ok(result)
    }

    /// Acknowledges messages for a subscription.
    ///
    /// The acknowledged cursor moves to one past the highest id given, if
    /// that advances it; otherwise the call is a no-op.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `ids` is empty or names an unpublished id
    /// - `NotFound` if the topic or subscription does not exist
    pub fn ack(&self, topic: &str, subscription: &str, ids: &[MessageId]) -> BrokerResult<()> {
        if self.lookup(topic, subscription)?.ack(ids)? {
            self.stats.record_ack();
        }
        Ok(())
    }

    /// Records the subscription's acknowledged cursor under `name`.
    ///
    /// An existing snapshot of the same name is replaced. An empty name
    /// gets a generated one. Returns the snapshot name.
    pub fn create_snapshot(
        &self,
        topic: &str,
        subscription: &str,
        name: &str,
    ) -> BrokerResult<String> {
        let name = if name.is_empty() {
            Uuid::new_v4().simple().to_string()
        } else {
            self.validate_name(ResourceKind::Snapshot, name)?;
            name.to_string()
        };
        let info = self.lookup(topic, subscription)?.create_snapshot(&name)?;
        tracing::debug!(topic, subscription, snapshot = %name, acked = info.acked, "created snapshot");
        Ok(name)
    }

    /// Rewinds a subscription to a snapshot.
    ///
    /// Both cursors are set to the recorded value, so the next
    /// cursor-based pull redelivers from that point.
    pub fn restore_snapshot(
        &self,
        topic: &str,
        subscription: &str,
        name: &str,
    ) -> BrokerResult<SnapshotInfo> {
        self.validate_name(ResourceKind::Snapshot, name)?;
        let info = self.lookup(topic, subscription)?.restore_snapshot(name)?;
        self.stats.record_restore();
        Ok(info)
    }

    /// Deletes a snapshot.
    pub fn delete_snapshot(&self, topic: &str, subscription: &str, name: &str) -> BrokerResult<()> {
        self.validate_name(ResourceKind::Snapshot, name)?;
        self.lookup(topic, subscription)?.delete_snapshot(name)
    }

    /// Lists a subscription's snapshots, sorted by name.
    pub fn snapshots(&self, topic: &str, subscription: &str) -> BrokerResult<Vec<SnapshotInfo>> {
        self.lookup(topic, subscription)?.snapshots()
    }

    /// Returns the position recorded by a snapshot without restoring it.
    pub fn seek(&self, topic: &str, subscription: &str, name: &str) -> BrokerResult<SnapshotInfo> {
        self.validate_name(ResourceKind::Snapshot, name)?;
        self.lookup(topic, subscription)?.snapshot(name)
    }

    fn lookup(&self, topic: &str, subscription: &str) -> BrokerResult<Arc<Subscription>> {
        self.validate_name(ResourceKind::Topic, topic)?;
        self.validate_name(ResourceKind::Subscription, subscription)?;
        self.registry.get(topic)?.subscription(subscription)
    }

    fn validate_name(&self, kind: ResourceKind, name: &str) -> BrokerResult<()> {
        if name.is_empty() {
            return Err(BrokerError::invalid_argument(format!("{kind} name must not be empty")));
        }
        if name.len() > self.config.max_name_len {
            return Err(BrokerError::invalid_argument(format!(
                "{kind} name exceeds {} bytes",
                self.config.max_name_len
            )));
        }
        Ok(())
    }
}
