//! Test fixtures and broker helpers.
//!
//! Provides a broker with one topic and one subscription already in place,
//! plus payload helpers for common scenarios.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tips_core::{Broker, BrokerConfig, BrokerResult, PullRequest, PullResult, SubscriptionInfo};

/// Topic created by [`TestBroker::new`].
pub const TEST_TOPIC: &str = "test-topic";

/// Subscription created by [`TestBroker::new`].
pub const TEST_SUBSCRIPTION: &str = "test-sub";

/// A shared broker with a ready topic and subscription.
///
/// Pulls default to a short timeout so tests that drain the topic do not
/// stall.
pub struct TestBroker {
    /// The broker instance.
    pub broker: Arc<Broker>,
    topic: String,
    subscription: String,
}

impl TestBroker {
    /// Creates a broker with [`TEST_TOPIC`] and [`TEST_SUBSCRIPTION`].
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::new().default_pull_timeout(Duration::from_millis(20)))
    }

    /// Creates a test broker from a custom configuration.
    pub fn with_config(config: BrokerConfig) -> Self {
        let broker = Broker::new(config);
        broker
            .create_topic(TEST_TOPIC)
            .expect("Failed to create test topic");
        broker
            .subscribe(TEST_TOPIC, TEST_SUBSCRIPTION)
            .expect("Failed to create test subscription");
        Self {
            broker: Arc::new(broker),
            topic: TEST_TOPIC.to_string(),
            subscription: TEST_SUBSCRIPTION.to_string(),
        }
    }

    /// Returns the fixture's topic name.
    pub fn topic_name(&self) -> &str {
        &self.topic
    }

    /// Returns the fixture's subscription name.
    pub fn subscription_name(&self) -> &str {
        &self.subscription
    }

    /// Returns a new handle to the broker for other threads.
    pub fn shared(&self) -> Arc<Broker> {
        Arc::clone(&self.broker)
    }

    /// Pulls from the fixture subscription without waiting.
    pub fn pull_now(&self, limit: usize, autoack: bool) -> BrokerResult<PullResult> {
        self.broker.pull(
            &self.topic,
            &self.subscription,
            PullRequest::new(limit)
                .autoack(autoack)
                .timeout(Duration::ZERO),
        )
    }

    /// Describes the fixture subscription.
    pub fn cursors(&self) -> BrokerResult<SubscriptionInfo> {
        self.broker.subscription(&self.topic, &self.subscription)
    }
}

impl Default for TestBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestBroker {
    type Target = Broker;

    fn deref(&self) -> &Self::Target {
        &self.broker
    }
}

/// Runs a test with a fresh [`TestBroker`].
///
/// # Example
///
/// ```
/// use tips_testkit::with_test_broker;
///
/// with_test_broker(|broker| {
///     assert_eq!(broker.topic(broker.topic_name()).unwrap().tail, 0);
/// });
/// ```
pub fn with_test_broker<F, R>(f: F) -> R
where
    F: FnOnce(&TestBroker) -> R,
{
    let broker = TestBroker::new();
    f(&broker)
}

/// Payloads `"0"`, `"1"`, ... `"n-1"`.
pub fn numbered_payloads(n: usize) -> Vec<Bytes> {
    (0..n).map(|i| Bytes::from(i.to_string())).collect()
}

/// Decodes pulled payloads as UTF-8 strings.
pub fn payload_strings(result: &PullResult) -> Vec<String> {
    result
        .messages
        .iter()
        .map(|m| String::from_utf8_lossy(&m.payload).into_owned())
        .collect()
}
