//! End-to-end broker scenarios.

use std::time::Duration;
use tips_core::{Broker, BrokerConfig, ErrorCategory, MessageId, PullRequest, PullResult};

fn broker() -> Broker {
    Broker::new(BrokerConfig::new().default_pull_timeout(Duration::from_millis(50)))
}

fn payloads(result: &PullResult) -> Vec<String> {
    result
        .messages
        .iter()
        .map(|m| String::from_utf8_lossy(&m.payload).into_owned())
        .collect()
}

#[test]
fn publish_pull_ack_snapshot_replay() {
    let broker = broker();
    broker.create_topic("t1").unwrap();

    // Prior activity moves the tail before the subscription exists.
    broker.publish("t1", ["h"]).unwrap();
    let n = broker.subscribe("t1", "s1").unwrap();
    assert_eq!(n, 1);
    assert_eq!(broker.topic("t1").unwrap().subscriptions, vec!["s1".to_string()]);

    let ids = broker
        .publish("t1", ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"])
        .unwrap();
    assert_eq!(ids.len(), 10);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let first = broker
        .pull("t1", "s1", PullRequest::new(1).autoack(true))
        .unwrap();
    assert_eq!(payloads(&first), vec!["0"]);
    assert_eq!(broker.subscription("t1", "s1").unwrap().acked, n + 1);

    // Resume right after "0" without acknowledging.
    let id0 = first.last_id().unwrap();
    let manual = broker
        .pull("t1", "s1", PullRequest::new(3).offset(id0.next()))
        .unwrap();
    assert_eq!(payloads(&manual), vec!["1", "2", "3"]);
    let info = broker.subscription("t1", "s1").unwrap();
    assert_eq!(info.acked, n + 1);
    assert_eq!(info.delivered, n + 4);

    broker
        .ack("t1", "s1", &[manual.last_id().unwrap()])
        .unwrap();
    assert_eq!(broker.subscription("t1", "s1").unwrap().acked, n + 4);

    let next = broker
        .pull("t1", "s1", PullRequest::new(3).autoack(true))
        .unwrap();
    assert_eq!(payloads(&next), vec!["4", "5", "6"]);

    assert_eq!(broker.create_snapshot("t1", "s1", "shot").unwrap(), "shot");
    assert_eq!(broker.seek("t1", "s1", "shot").unwrap().acked, n + 7);

    let before_restore = broker
        .pull("t1", "s1", PullRequest::new(3).autoack(true))
        .unwrap();
    assert_eq!(payloads(&before_restore), vec!["7", "8", "9"]);

    let restored = broker.restore_snapshot("t1", "s1", "shot").unwrap();
    assert_eq!(restored.acked, n + 7);
    let info = broker.subscription("t1", "s1").unwrap();
    assert_eq!((info.delivered, info.acked), (n + 7, n + 7));

    let replay = broker
        .pull("t1", "s1", PullRequest::new(3).autoack(true))
        .unwrap();
    assert_eq!(replay.messages, before_restore.messages);

    // Drained: the next pull waits out its timeout and returns nothing.
    let empty = broker
        .pull(
            "t1",
            "s1",
            PullRequest::new(3).autoack(true).timeout(Duration::from_millis(20)),
        )
        .unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.next_offset, n + 10);

    broker.delete_snapshot("t1", "s1", "shot").unwrap();
    assert!(broker
        .delete_snapshot("t1", "s1", "shot")
        .unwrap_err()
        .is_not_found());
    broker.destroy_topic("t1").unwrap();
}

#[test]
fn no_gap_and_no_redelivery_between_autoack_pulls() {
    let broker = broker();
    broker.create_topic("t").unwrap();
    broker.subscribe("t", "s").unwrap();
    broker.publish("t", (0..20).map(|i| i.to_string())).unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        let result = broker
            .pull("t", "s", PullRequest::new(5).autoack(true))
            .unwrap();
        assert_eq!(result.len(), 5);
        seen.extend(result.messages.iter().map(|m| m.id.as_u64()));
    }
    assert_eq!(seen, (0..20).collect::<Vec<_>>());
}

#[test]
fn manual_ack_then_autoack_resumes_at_delivery() {
    let broker = broker();
    broker.create_topic("t").unwrap();
    broker.subscribe("t", "s").unwrap();
    broker.publish("t", ["a", "b", "c", "d"]).unwrap();

    let manual = broker.pull("t", "s", PullRequest::new(2)).unwrap();
    assert_eq!(broker.subscription("t", "s").unwrap().acked, 0);

    broker.ack("t", "s", &[manual.last_id().unwrap()]).unwrap();
    assert_eq!(broker.subscription("t", "s").unwrap().acked, 2);

    let next = broker
        .pull("t", "s", PullRequest::new(2).autoack(true))
        .unwrap();
    assert_eq!(payloads(&next), vec!["c", "d"]);
}

#[test]
fn ack_is_monotonic() {
    let broker = broker();
    broker.create_topic("t").unwrap();
    broker.subscribe("t", "s").unwrap();
    broker.publish("t", ["a", "b", "c"]).unwrap();

    broker.ack("t", "s", &[MessageId::new(2)]).unwrap();
    broker.ack("t", "s", &[MessageId::new(0)]).unwrap();
    assert_eq!(broker.subscription("t", "s").unwrap().acked, 3);
    assert_eq!(broker.stats().acks, 1);

    // Several ids at once: the highest wins.
    broker.create_topic("u").unwrap();
    broker.subscribe("u", "s").unwrap();
    broker.publish("u", ["a", "b", "c"]).unwrap();
    broker
        .ack("u", "s", &[MessageId::new(1), MessageId::new(0)])
        .unwrap();
    assert_eq!(broker.subscription("u", "s").unwrap().acked, 2);
}

#[test]
fn destroy_topic_cascades() {
    let broker = broker();
    broker.create_topic("t").unwrap();
    broker.subscribe("t", "s").unwrap();
    broker.publish("t", ["a"]).unwrap();
    broker.create_snapshot("t", "s", "shot").unwrap();

    broker.destroy_topic("t").unwrap();

    assert!(broker.topic("t").unwrap_err().is_not_found());
    assert!(broker.publish("t", ["b"]).unwrap_err().is_not_found());
    assert!(broker
        .pull("t", "s", PullRequest::new(1))
        .unwrap_err()
        .is_not_found());
    assert!(broker.ack("t", "s", &[MessageId::new(0)]).unwrap_err().is_not_found());
    assert!(broker.subscription("t", "s").unwrap_err().is_not_found());
    assert!(broker.create_snapshot("t", "s", "x").unwrap_err().is_not_found());
    assert!(broker.restore_snapshot("t", "s", "shot").unwrap_err().is_not_found());
    assert!(broker.delete_snapshot("t", "s", "shot").unwrap_err().is_not_found());
    assert!(broker.unsubscribe("t", "s").unwrap_err().is_not_found());
    assert!(broker.destroy_topic("t").unwrap_err().is_not_found());
}

#[test]
fn missing_resources_are_not_found() {
    let broker = broker();
    assert!(broker.topic("t1").unwrap_err().is_not_found());
    assert!(broker.subscribe("t1", "s1").unwrap_err().is_not_found());

    broker.create_topic("t1").unwrap();
    assert!(broker.subscription("t1", "s1").unwrap_err().is_not_found());
    assert!(broker.restore_snapshot("t1", "s1", "shot").unwrap_err().is_not_found());

    broker.subscribe("t1", "s1").unwrap();
    assert!(broker.restore_snapshot("t1", "s1", "shot").unwrap_err().is_not_found());
    assert_eq!(
        broker.create_topic("t1").unwrap_err().category(),
        ErrorCategory::AlreadyExists
    );
}

#[test]
fn explicit_offset_replays_without_touching_ack() {
    let broker = broker();
    broker.create_topic("t").unwrap();
    broker.subscribe("t", "s").unwrap();
    broker.publish("t", ["a", "b", "c"]).unwrap();
    broker
        .pull("t", "s", PullRequest::new(3).autoack(true))
        .unwrap();

    let replay = broker.pull("t", "s", PullRequest::new(2).offset(0)).unwrap();
    assert_eq!(payloads(&replay), vec!["a", "b"]);
    let info = broker.subscription("t", "s").unwrap();
    assert_eq!((info.delivered, info.acked), (3, 3));

    let err = broker
        .pull("t", "s", PullRequest::new(1).offset(4))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);
}
