//! Topics and the registry that owns them.

use crate::error::{BrokerError, BrokerResult, ResourceKind};
use crate::log::MessageLog;
use crate::subscription::Subscription;
use crate::types::{now_millis, TopicInfo};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A named topic: one message log plus the subscriptions reading it.
#[derive(Debug)]
pub struct Topic {
    name: String,
    log: Arc<MessageLog>,
    subscriptions: RwLock<HashMap<String, Arc<Subscription>>>,
    created_at: u64,
}

impl Topic {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::new(MessageLog::new(name)),
            subscriptions: RwLock::new(HashMap::new()),
            created_at: now_millis(),
        }
    }

    /// Returns the topic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the topic's log.
    pub fn log(&self) -> &Arc<MessageLog> {
        &self.log
    }

    /// Creates a subscription positioned at the current tail.
    ///
    /// Returns the subscription with its initial cursor, read before the
    /// subscription becomes visible to other callers.
    pub fn subscribe(&self, name: &str) -> BrokerResult<(Arc<Subscription>, u64)> {
        let mut subscriptions = self.subscriptions.write();
        if self.log.is_closed() {
            return Err(BrokerError::not_found(ResourceKind::Topic, &self.name));
        }
        if subscriptions.contains_key(name) {
            return Err(BrokerError::already_exists(ResourceKind::Subscription, name));
        }
        let subscription = Arc::new(Subscription::new(name, Arc::clone(&self.log)));
        let cursor = subscription.cursors()?.delivered;
        subscriptions.insert(name.to_string(), Arc::clone(&subscription));
        Ok((subscription, cursor))
    }

    /// Looks up a subscription.
    pub fn subscription(&self, name: &str) -> BrokerResult<Arc<Subscription>> {
        self.subscriptions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::not_found(ResourceKind::Subscription, name))
    }

    /// Removes a subscription together with its snapshots.
    pub fn unsubscribe(&self, name: &str) -> BrokerResult<()> {
        let subscription = self
            .subscriptions
            .write()
            .remove(name)
            .ok_or_else(|| BrokerError::not_found(ResourceKind::Subscription, name))?;
        subscription.close();
        Ok(())
    }

    /// Returns subscription names sorted.
    pub fn subscription_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.subscriptions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns a description of the topic.
    pub fn info(&self) -> TopicInfo {
        TopicInfo {
            name: self.name.clone(),
            tail: self.log.tail(),
            subscriptions: self.subscription_names(),
            created_at: self.created_at,
        }
    }

    /// Closes the log and tears down every subscription.
    fn close(&self) {
        self.log.close();
        let drained: Vec<_> = self.subscriptions.write().drain().collect();
        for (_, subscription) in drained {
            subscription.close();
        }
    }
}

/// Process-local set of topics, keyed by name.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: RwLock<HashMap<String, Arc<Topic>>>,
}

impl TopicRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a topic.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the name is taken.
    pub fn create(&self, name: &str) -> BrokerResult<Arc<Topic>> {
        let mut topics = self.topics.write();
        if topics.contains_key(name) {
            return Err(BrokerError::already_exists(ResourceKind::Topic, name));
        }
        let topic = Arc::new(Topic::new(name));
        topics.insert(name.to_string(), Arc::clone(&topic));
        Ok(topic)
    }

    /// Looks up a topic.
    pub fn get(&self, name: &str) -> BrokerResult<Arc<Topic>> {
        self.topics
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::not_found(ResourceKind::Topic, name))
    }

    /// Removes a topic, cascading to its subscriptions and snapshots.
    pub fn destroy(&self, name: &str) -> BrokerResult<()> {
        let topic = self
            .topics
            .write()
            .remove(name)
            .ok_or_else(|| BrokerError::not_found(ResourceKind::Topic, name))?;
        topic.close();
        Ok(())
    }

    /// Returns topic names sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.topics.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of topics.
    pub fn len(&self) -> usize {
        self.topics.read().len()
    }

    /// Returns true if there are no topics.
    pub fn is_empty(&self) -> bool {
        self.topics.read().is_empty()
    }
}
