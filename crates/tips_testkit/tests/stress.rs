//! Full-size stress runs.

use std::time::Duration;
use tips_core::BrokerConfig;
use tips_testkit::prelude::*;

#[test]
fn default_stress_delivers_exactly_once() {
    let broker = TestBroker::new();
    let config = StressConfig::default();

    let result = stress_publish_pull(
        &broker.shared(),
        broker.topic_name(),
        broker.subscription_name(),
        &config,
    );
    result.print_summary("publish/pull");

    assert!(result.is_exact(), "{result:?}");
    assert_eq!(result.delivered, config.total_messages());
    assert_eq!(broker.cursors().unwrap().acked, config.total_messages() as u64);
}

#[test]
fn single_consumer_with_clamped_limit() {
    let broker = TestBroker::with_config(
        BrokerConfig::new()
            .default_pull_timeout(Duration::from_millis(20))
            .max_pull_limit(2),
    );
    let config = StressConfig {
        producers: 3,
        consumers: 1,
        batches_per_producer: 40,
        batch_size: 5,
        pull_limit: 100,
        pull_timeout: Duration::from_millis(20),
    };

    let result = stress_publish_pull(
        &broker.shared(),
        broker.topic_name(),
        broker.subscription_name(),
        &config,
    );
    assert!(result.is_exact(), "{result:?}");
}
