//! Broker configuration.

use std::time::Duration;

/// Configuration for a [`crate::Broker`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Wait applied to a pull that does not specify a timeout.
    pub default_pull_timeout: Duration,

    /// Upper bound on any pull wait. Longer requested timeouts are clamped.
    pub max_pull_timeout: Duration,

    /// Upper bound on messages returned by one pull. Larger limits are clamped.
    pub max_pull_limit: usize,

    /// Maximum number of payloads accepted by one publish.
    pub max_publish_batch: usize,

    /// Maximum length in bytes of topic, subscription and snapshot names.
    pub max_name_len: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_pull_timeout: Duration::from_secs(1),
            max_pull_timeout: Duration::from_secs(30),
            max_pull_limit: 1000,
            max_publish_batch: 10_000,
            max_name_len: 255,
        }
    }
}

impl BrokerConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default pull timeout.
    #[must_use]
    pub const fn default_pull_timeout(mut self, timeout: Duration) -> Self {
        self.default_pull_timeout = timeout;
        self
    }

    /// Sets the maximum pull timeout.
    #[must_use]
    pub const fn max_pull_timeout(mut self, timeout: Duration) -> Self {
        self.max_pull_timeout = timeout;
        self
    }

    /// Sets the maximum pull limit.
    #[must_use]
    pub const fn max_pull_limit(mut self, limit: usize) -> Self {
        self.max_pull_limit = limit;
        self
    }

    /// Sets the maximum publish batch size.
    #[must_use]
    pub const fn max_publish_batch(mut self, size: usize) -> Self {
        self.max_publish_batch = size;
        self
    }

    /// Sets the maximum name length.
    #[must_use]
    pub const fn max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    /// Resolves the effective wait for a pull.
    pub(crate) fn pull_timeout(&self, requested: Option<Duration>) -> Duration {
        requested
            .unwrap_or(self.default_pull_timeout)
            .min(self.max_pull_timeout)
    }

    /// Resolves the effective batch size for a pull.
    pub(crate) fn pull_limit(&self, requested: usize) -> usize {
        requested.min(self.max_pull_limit)
    }
}
