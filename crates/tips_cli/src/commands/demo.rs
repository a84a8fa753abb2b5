//! Demo command implementation.

use serde::Serialize;
use std::time::Duration;
use tips_core::{Broker, BrokerConfig, BrokerResult, PullRequest, PullResult};

const TOPIC: &str = "demo";
const SUBSCRIPTION: &str = "reader";
const SNAPSHOT: &str = "checkpoint";

/// One step of the walkthrough.
#[derive(Debug, Serialize)]
pub struct DemoStep {
    /// What the step did.
    pub action: String,
    /// Payloads returned, if the step pulled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payloads: Vec<String>,
    /// Delivery cursor after the step.
    pub delivered: u64,
    /// Acknowledged cursor after the step.
    pub acked: u64,
}

/// Walkthrough result.
#[derive(Debug, Serialize)]
pub struct DemoResult {
    /// Steps in order.
    pub steps: Vec<DemoStep>,
    /// True if the replay after restore matched the first delivery.
    pub replay_matches: bool,
}

/// Runs the demo command.
pub fn run(messages: usize, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if messages < 2 {
        return Err("demo needs at least 2 messages".into());
    }
    let result = walkthrough(messages)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text(&result),
    }
    Ok(())
}

/// Publishes, pulls with and without autoack, snapshots, and replays.
pub fn walkthrough(messages: usize) -> BrokerResult<DemoResult> {
    let broker = Broker::new(BrokerConfig::new().default_pull_timeout(Duration::from_millis(10)));
    let mut steps = Vec::new();

    broker.create_topic(TOPIC)?;
    broker.subscribe(TOPIC, SUBSCRIPTION)?;
    broker.publish(TOPIC, (0..messages).map(|i| i.to_string()))?;
    steps.push(step(&broker, format!("published {messages} messages"), None)?);

    let first = broker.pull(TOPIC, SUBSCRIPTION, PullRequest::new(1).autoack(true))?;
    steps.push(step(&broker, "pull 1 with autoack".into(), Some(&first))?);

    let half = (messages / 2).max(1);
    let manual = broker.pull(TOPIC, SUBSCRIPTION, PullRequest::new(half))?;
    steps.push(step(&broker, format!("pull {half} without ack"), Some(&manual))?);

    if let Some(last) = manual.last_id() {
        broker.ack(TOPIC, SUBSCRIPTION, &[last])?;
        steps.push(step(&broker, format!("ack {last}"), None)?);
    }

    broker.create_snapshot(TOPIC, SUBSCRIPTION, SNAPSHOT)?;
    steps.push(step(&broker, format!("snapshot '{SNAPSHOT}'"), None)?);

    let rest = broker.pull(TOPIC, SUBSCRIPTION, PullRequest::new(messages).autoack(true))?;
    steps.push(step(&broker, "pull remaining with autoack".into(), Some(&rest))?);

    broker.restore_snapshot(TOPIC, SUBSCRIPTION, SNAPSHOT)?;
    steps.push(step(&broker, format!("restore '{SNAPSHOT}'"), None)?);

    let replay = broker.pull(TOPIC, SUBSCRIPTION, PullRequest::new(messages).autoack(true))?;
    steps.push(step(&broker, "replay with autoack".into(), Some(&replay))?);

    broker.destroy_topic(TOPIC)?;
    Ok(DemoResult {
        steps,
        replay_matches: replay.messages == rest.messages,
    })
}

fn step(broker: &Broker, action: String, pulled: Option<&PullResult>) -> BrokerResult<DemoStep> {
    let info = broker.subscription(TOPIC, SUBSCRIPTION)?;
    let payloads: Vec<String> = pulled
        .map(|result| {
            result
                .messages
                .iter()
                .map(|m| String::from_utf8_lossy(&m.payload).into_owned())
                .collect()
        })
        .unwrap_or_default();
    Ok(DemoStep {
        action,
        payloads,
        delivered: info.delivered,
        acked: info.acked,
    })
}

fn print_text(result: &DemoResult) {
    for step in &result.steps {
        println!(
            "{:<32} delivered={:<4} acked={:<4} {}",
            step.action,
            step.delivered,
            step.acked,
            step.payloads.join(" ")
        );
    }
    println!("replay matches: {}", result.replay_matches);
}
