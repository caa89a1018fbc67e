//! A complete application assembled from the prelude.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bamboo::prelude::*;
use bamboo_test::TestClient;
use serde::Deserialize;
use serde_json::json;

#[derive(Default)]
struct Visits(AtomicUsize);

#[derive(Debug, Deserialize)]
struct Login {
    user: String,
}

fn require_key() -> Pipe<RequestContext> {
    Pipe::new("require-key", |mut ctx: RequestContext| async move {
        if ctx.header("x-api-key") != Some("secret") {
            ctx.json(json!({"error": "unauthorised"}), StatusCode::UNAUTHORIZED)?;
        }
        Ok(ctx)
    })
    .unwrap()
}

fn app() -> std::sync::Arc<Engine> {
    let config = ConfigLoader::new()
        .with_string(
            r#"
            [server]
            lock_policy = "abort"

            [realtime]
            require_token = true

            [rate_limit]
            cleanup_interval_ms = 0
            "#,
            "toml",
        )
        .unwrap()
        .load()
        .unwrap();

    let visit = Action::get("/visit", |mut ctx: RequestContext| async move {
        let visits = ctx
            .service::<Visits>()
            .ok_or_else(|| HandlerError::message("visits missing"))?;
        let n = visits.0.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.json(json!({ "visits": n }), StatusCode::OK)?;
        Ok(ctx)
    })
    .unwrap();

    let admin = ActionGroup::new("/admin")
        .unwrap()
        .with_pipes([require_key()])
        .action(
            Action::get("/stats", |mut ctx: RequestContext| async move {
                ctx.json(json!({ "ok": true }), StatusCode::OK)?;
                Ok(ctx)
            })
            .unwrap(),
        )
        .action(
            Action::delete("/cache", |mut ctx: RequestContext| async move {
                ctx.not_implemented();
                Ok(ctx)
            })
            .unwrap(),
        );

    let login = EventAction::new(
        "login",
        EventHandler::typed(|mut ctx: MessageContext, login: Login| async move {
            ctx.push("user", &login.user)?;
            ctx.json(json!({ "welcome": login.user }))?;
            Ok(ctx)
        }),
    )
    .unwrap();

    let whoami = EventAction::new(
        "whoami",
        EventHandler::raw(|mut ctx: MessageContext| async move {
            let user: Option<String> = ctx.get("user");
            ctx.json(json!({ "user": user }))?;
            Ok(ctx)
        }),
    )
    .unwrap();

    EngineBuilder::from_config(config)
        .service(Visits::default())
        .limit("api", 100, Duration::from_secs(60))
        .action(visit)
        .group(admin)
        .event(login)
        .event(whoami)
        .build()
        .unwrap()
}

#[tokio::test]
async fn services_persist_across_requests() {
    let client = TestClient::new(app());
    client.get("/visit").send().await.assert_json_eq(&json!({"visits": 1}));
    client.get("/visit").send().await.assert_json_eq(&json!({"visits": 2}));
}

#[tokio::test]
async fn group_pipes_guard_members() {
    let client = TestClient::new(app());

    client
        .get("/admin/stats")
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    client
        .get("/admin/stats")
        .header("x-api-key", "secret")
        .send()
        .await
        .assert_status(StatusCode::OK);

    client
        .delete("/admin/cache")
        .header("x-api-key", "secret")
        .send()
        .await
        .assert_status(StatusCode::NOT_IMPLEMENTED)
        .assert_body_eq("Not Implemented");
}

#[tokio::test]
async fn session_storage_survives_messages() {
    let engine = app();
    let client = TestClient::new(engine.clone());

    let anonymous = client.connect(None).await.unwrap();
    assert!(!anonymous.is_accepted());

    let socket = client.connect(Some("tok")).await.unwrap();
    assert!(socket.is_accepted());

    socket.emit("login", json!({"user": "ada"})).await.unwrap();
    socket.emit("whoami", json!(null)).await.unwrap();
    assert_eq!(socket.last_data("whoami"), Some(json!({"user": "ada"})));

    assert_eq!(engine.send_to_token("tok", "notice", json!("hi")).unwrap(), 1);
    assert_eq!(socket.last_data("notice"), Some(json!("hi")));
    assert_eq!(engine.limiter().limit_for("api").map(|l| l.max), Some(100));
}
