//! Request/response flows through the line protocol.

use serde_json::{json, Value};
use tips_server::{Response, ServerConfig, TipsServer};

fn call(server: &TipsServer, request: Value) -> Response {
    serde_json::from_str(&server.handle_line(&request.to_string())).unwrap()
}

fn ok(server: &TipsServer, request: Value) -> Value {
    let response = call(server, request);
    assert_eq!(response.status, 200, "{:?}", response.body);
    response.body
}

fn payloads(body: &Value) -> Vec<String> {
    body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["payload"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn normal_flow() {
    let server = TipsServer::new(ServerConfig::default());

    assert_eq!(ok(&server, json!({"op": "create_topic", "topic": "t1"})), json!("t1"));
    assert_eq!(
        ok(&server, json!({"op": "subscribe", "topic": "t1", "subscription": "s1"})),
        json!(0)
    );

    let messages: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let ids = ok(
        &server,
        json!({"op": "publish", "topic": "t1", "messages": messages}),
    );
    assert_eq!(ids.as_array().unwrap().len(), 10);

    let first = ok(
        &server,
        json!({"op": "pull", "topic": "t1", "subscription": "s1", "limit": 1, "autoack": true}),
    );
    assert_eq!(payloads(&first), vec!["0"]);
    let id0 = first["messages"][0]["id"].clone();

    let manual = ok(
        &server,
        json!({"op": "pull", "topic": "t1", "subscription": "s1", "limit": 3, "offset": id0}),
    );
    assert_eq!(payloads(&manual), vec!["1", "2", "3"]);
    let last = manual["messages"][2]["id"].clone();
    ok(
        &server,
        json!({"op": "ack", "topic": "t1", "subscription": "s1", "ids": [last]}),
    );

    let next = ok(
        &server,
        json!({"op": "pull", "topic": "t1", "subscription": "s1", "limit": 3, "autoack": true}),
    );
    assert_eq!(payloads(&next), vec!["4", "5", "6"]);

    let name = ok(
        &server,
        json!({"op": "create_snapshot", "topic": "t1", "subscription": "s1", "name": "shot"}),
    );
    assert_eq!(name, json!("shot"));

    let before = ok(
        &server,
        json!({"op": "pull", "topic": "t1", "subscription": "s1", "limit": 3, "autoack": true}),
    );
    assert_eq!(payloads(&before), vec!["7", "8", "9"]);

    let restored = ok(
        &server,
        json!({"op": "restore_snapshot", "topic": "t1", "subscription": "s1", "name": "shot"}),
    );
    assert_eq!(restored["acked"], 7);

    let replay = ok(
        &server,
        json!({"op": "pull", "topic": "t1", "subscription": "s1", "limit": 3, "autoack": true}),
    );
    assert_eq!(replay["messages"], before["messages"]);

    let listed = ok(
        &server,
        json!({"op": "snapshots", "topic": "t1", "subscription": "s1"}),
    );
    assert_eq!(listed[0]["name"], "shot");

    ok(
        &server,
        json!({"op": "delete_snapshot", "topic": "t1", "subscription": "s1", "name": "shot"}),
    );
    ok(&server, json!({"op": "unsubscribe", "topic": "t1", "subscription": "s1"}));
    ok(&server, json!({"op": "destroy_topic", "topic": "t1"}));

    let stats = ok(&server, json!({"op": "stats"}));
    assert_eq!(stats["published"], 10);
    assert_eq!(stats["restores"], 1);
}

#[test]
fn illegal_requests() {
    let server = TipsServer::new(ServerConfig::default());

    assert_eq!(call(&server, json!({"op": "topic", "topic": "t1"})).status, 404);
    assert_eq!(
        call(&server, json!({"op": "subscribe", "topic": "t1", "subscription": "s1"})).status,
        404
    );
    ok(&server, json!({"op": "create_topic", "topic": "t1"}));
    assert_eq!(call(&server, json!({"op": "create_topic", "topic": "t1"})).status, 409);
    assert_eq!(
        call(&server, json!({"op": "subscription", "topic": "t1", "subscription": "s1"})).status,
        404
    );
    assert_eq!(
        call(
            &server,
            json!({"op": "restore_snapshot", "topic": "t1", "subscription": "s1", "name": "x"})
        )
        .status,
        404
    );
    assert_eq!(call(&server, json!({"op": "create_topic", "topic": ""})).status, 400);
    assert_eq!(
        call(&server, json!({"op": "publish", "topic": "t1", "messages": []})).status,
        400
    );
}

#[test]
fn pull_times_out_empty() {
    let server = TipsServer::new(ServerConfig::default());
    ok(&server, json!({"op": "create_topic", "topic": "t1"}));
    ok(&server, json!({"op": "subscribe", "topic": "t1", "subscription": "s1"}));

    let start = std::time::Instant::now();
    let body = ok(
        &server,
        json!({"op": "pull", "topic": "t1", "subscription": "s1", "timeout": 0.1}),
    );
    assert_eq!(body["messages"], json!([]));
    assert!(start.elapsed() >= std::time::Duration::from_millis(100));
}

#[test]
fn generated_snapshot_name() {
    let server = TipsServer::new(ServerConfig::default());
    ok(&server, json!({"op": "create_topic", "topic": "t1"}));
    ok(&server, json!({"op": "subscribe", "topic": "t1", "subscription": "s1"}));

    let name = ok(
        &server,
        json!({"op": "create_snapshot", "topic": "t1", "subscription": "s1"}),
    );
    let name = name.as_str().unwrap();
    assert!(!name.is_empty());

    let seek = ok(
        &server,
        json!({"op": "seek", "topic": "t1", "subscription": "s1", "name": name}),
    );
    assert_eq!(seek["acked"], 0);
}
