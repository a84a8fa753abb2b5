//! Stress tests for the tips broker.
//!
//! These helpers run concurrent producers and consumers against one
//! subscription and check that every published message is delivered
//! exactly once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tips_core::{Broker, PullRequest};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Messages published.
    pub published: usize,
    /// Messages delivered to consumers.
    pub delivered: usize,
    /// Ids delivered more than once.
    pub duplicates: usize,
    /// Published ids never delivered.
    pub missing: usize,
    /// Operations that returned an error.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Delivered messages per second.
    pub messages_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(
        published: usize,
        delivered: usize,
        duplicates: usize,
        missing: usize,
        failed_ops: usize,
        duration: Duration,
    ) -> Self {
        let messages_per_second = if duration.as_secs_f64() > 0.0 {
            delivered as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            published,
            delivered,
            duplicates,
            missing,
            failed_ops,
            duration,
            messages_per_second,
        }
    }

    /// Returns true if every message was delivered exactly once.
    pub fn is_exact(&self) -> bool {
        self.duplicates == 0 && self.missing == 0 && self.failed_ops == 0
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Published: {}", self.published);
        println!("Delivered: {}", self.delivered);
        println!("Duplicates: {}", self.duplicates);
        println!("Missing: {}", self.missing);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} msgs/sec", self.messages_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of producer threads.
    pub producers: usize,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Batches each producer publishes.
    pub batches_per_producer: usize,
    /// Messages per batch.
    pub batch_size: usize,
    /// Limit for each pull.
    pub pull_limit: usize,
    /// Timeout for each pull.
    pub pull_timeout: Duration,
}

impl StressConfig {
    /// Total messages the run will publish.
    pub fn total_messages(&self) -> usize {
        self.producers * self.batches_per_producer * self.batch_size
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            consumers: 4,
            batches_per_producer: 250,
            batch_size: 4,
            pull_limit: 16,
            pull_timeout: Duration::from_millis(50),
        }
    }
}

/// Runs concurrent producers and autoack consumers on one subscription.
///
/// `topic` and `subscription` must exist. Consumers stop once producers
/// are done and a pull comes back empty.
pub fn stress_publish_pull(
    broker: &Arc<Broker>,
    topic: &str,
    subscription: &str,
    config: &StressConfig,
) -> StressTestResult {
    let producers_done = Arc::new(AtomicBool::new(false));
    let start = Instant::now();

    let consumers: Vec<_> = (0..config.consumers)
        .map(|_| {
            let broker = Arc::clone(broker);
            let done = Arc::clone(&producers_done);
            let (topic, subscription) = (topic.to_string(), subscription.to_string());
            let request = PullRequest::new(config.pull_limit)
                .autoack(true)
                .timeout(config.pull_timeout);
            thread::spawn(move || {
                let mut ids = Vec::new();
                let mut failed = 0usize;
                loop {
                    // Read the flag before pulling so an empty pull after
                    // the last publish ends the loop.
                    let finished = done.load(Ordering::Acquire);
                    match broker.pull(&topic, &subscription, request.clone()) {
                        Ok(result) if result.is_empty() && finished => break,
                        Ok(result) => ids.extend(result.messages.iter().map(|m| m.id.as_u64())),
                        Err(_) => {
                            failed += 1;
                            break;
                        }
                    }
                }
                (ids, failed)
            })
        })
        .collect();

    let producers: Vec<_> = (0..config.producers)
        .map(|p| {
            let broker = Arc::clone(broker);
            let topic = topic.to_string();
            let (batches, size) = (config.batches_per_producer, config.batch_size);
            thread::spawn(move || {
                let mut ids = Vec::new();
                let mut failed = 0usize;
                for b in 0..batches {
                    let batch: Vec<String> = (0..size).map(|i| format!("{p}-{b}-{i}")).collect();
                    match broker.publish(&topic, batch) {
                        Ok(batch_ids) => ids.extend(batch_ids.iter().map(|id| id.as_u64())),
                        Err(_) => failed += 1,
                    }
                }
                (ids, failed)
            })
        })
        .collect();

    let mut published = HashSet::new();
    let mut failed_ops = 0usize;
    for handle in producers {
        if let Ok((ids, failed)) = handle.join() {
            published.extend(ids);
            failed_ops += failed;
        } else {
            failed_ops += 1;
        }
    }
    producers_done.store(true, Ordering::Release);

    let mut delivered = 0usize;
    let mut seen = HashSet::new();
    let mut duplicates = 0usize;
    for handle in consumers {
        if let Ok((ids, failed)) = handle.join() {
            delivered += ids.len();
            for id in ids {
                if !seen.insert(id) {
                    duplicates += 1;
                }
            }
            failed_ops += failed;
        } else {
            failed_ops += 1;
        }
    }
    let missing = published.difference(&seen).count();

    StressTestResult::new(
        published.len(),
        delivered,
        duplicates,
        missing,
        failed_ops,
        start.elapsed(),
    )
}
