//! A small chat application exercised through the test client.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use bamboo_core::HandlerError;
use bamboo_realtime::{EventAction, EventHandler, MessageContext};
use bamboo_server::{Action, EngineBuilder, RequestContext};
use bamboo_test::{ManualClock, TestClient};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Say {
    room: String,
    text: String,
}

fn say() -> EventAction {
    EventAction::new(
        "say",
        EventHandler::typed(|mut ctx: MessageContext, msg: Say| async move {
            if ctx.ratelimit_ip("say", 2, Duration::from_secs(10)).await {
                ctx.err("Slow down.", 429)?;
                return Ok(ctx);
            }
            ctx.publish(&msg.room, "said", json!({ "text": msg.text }))
                .map_err(HandlerError::from)?;
            Ok(ctx)
        }),
    )
    .unwrap()
}

fn client(clock: Arc<ManualClock>) -> TestClient {
    let engine = EngineBuilder::new()
        .clock(clock)
        .room("lobby")
        .event(say())
        .action(
            Action::post("/announce/:room", |mut ctx: RequestContext| async move {
                let room = ctx.param("room").unwrap_or_default();
                let text = ctx.param("text").unwrap_or_default();
                ctx.json(json!({ "room": room, "text": text }), StatusCode::ACCEPTED)?;
                Ok(ctx)
            })
            .unwrap(),
        )
        .build()
        .unwrap();
    TestClient::new(engine)
}

#[tokio::test]
async fn members_of_a_room_hear_each_other() {
    let client = client(Arc::new(ManualClock::new(0)));
    let alice = client.connect(Some("alice")).await.unwrap();
    let bob = client.connect(Some("bob")).await.unwrap();

    for socket in [&alice, &bob] {
        socket.emit("rooms:join", json!({"room": "lobby"})).await.unwrap();
        assert_eq!(socket.last_data("rooms:join"), Some(json!({"room": "lobby"})));
    }

    alice
        .emit("say", json!({"room": "lobby", "text": "hi"}))
        .await
        .unwrap();
    assert_eq!(bob.last_data("said"), Some(json!({"text": "hi"})));
    assert!(alice.frames_for("said").is_empty());
}

#[tokio::test]
async fn speaking_outside_a_room_fails() {
    let client = client(Arc::new(ManualClock::new(0)));
    let alice = client.connect(Some("alice")).await.unwrap();

    let result = alice.emit("say", json!({"room": "lobby", "text": "hi"})).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn chatter_is_rate_limited_per_address() {
    let clock = Arc::new(ManualClock::new(0));
    let client = client(clock.clone());
    let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));
    let alice = client.connect_from("alice", ip).await.unwrap();
    alice.emit("rooms:join", json!({"room": "lobby"})).await.unwrap();

    for _ in 0..3 {
        alice
            .emit("say", json!({"room": "lobby", "text": "spam"}))
            .await
            .unwrap();
    }
    let errors = alice.frames_for("say");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["data"]["code"], 429);

    clock.advance(Duration::from_secs(10));
    alice.clear();
    alice
        .emit("say", json!({"room": "lobby", "text": "again"}))
        .await
        .unwrap();
    assert!(alice.frames_for("say").is_empty());
}

#[tokio::test]
async fn malformed_payload_gets_error_frame() {
    let client = client(Arc::new(ManualClock::new(0)));
    let alice = client.connect(Some("alice")).await.unwrap();

    alice.emit("say", json!({"room": "lobby"})).await.unwrap();
    let frames = alice.frames_for("say");
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["data"]["code"], bamboo_realtime::INVALID_PAYLOAD_CODE);
}

#[tokio::test]
async fn http_announcements_reach_the_room() {
    let client = client(Arc::new(ManualClock::new(0)));
    let bob = client.connect(Some("bob")).await.unwrap();
    bob.emit("rooms:join", json!({"room": "lobby"})).await.unwrap();

    let response = client
        .post("/announce/lobby")
        .json(&json!({"text": "hello"}))
        .send()
        .await;
    response
        .assert_status(StatusCode::ACCEPTED)
        .assert_json_field("room", &json!("lobby"));

    let body = response.json_value().unwrap();
    let delivered = client.engine().publish("lobby", "said", &body).unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(bob.last_data("said"), Some(json!({"room": "lobby", "text": "hello"})));
}

#[tokio::test]
async fn the_room_sees_who_comes_and_goes() {
    let clock = Arc::new(ManualClock::new(0));
    let client = client(Arc::clone(&clock));
    let alice = client.connect(Some("alice")).await.unwrap();
    let bob = client.connect(Some("bob")).await.unwrap();

    alice.emit("rooms:join", json!({"room": "lobby"})).await.unwrap();
    clock.advance(Duration::from_secs(5));
    bob.emit("rooms:join", json!({"room": "lobby"})).await.unwrap();

    assert_eq!(
        alice.last_data("presence:join"),
        Some(json!({"room": "lobby", "key": "bob", "online_since": 5_000}))
    );
    let members: Vec<(String, u64)> = client
        .engine()
        .room_members("lobby")
        .into_iter()
        .map(|m| (m.key, m.online_since))
        .collect();
    assert_eq!(members, vec![("alice".to_string(), 0), ("bob".to_string(), 5_000)]);

    bob.close();
    assert_eq!(
        alice.last_data("presence:leave"),
        Some(json!({"room": "lobby", "key": "bob"}))
    );
    assert_eq!(client.engine().room_members("lobby").len(), 1);
}
