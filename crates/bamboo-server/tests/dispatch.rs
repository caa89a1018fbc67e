//! End-to-end HTTP and WebSocket dispatch through [`Engine`].

use std::sync::Arc;
use std::time::Duration;

use bamboo_core::{BambooError, HandlerError, HandlerResult, ManualClock};
use bamboo_middleware::Pipe;
use bamboo_realtime::{EventAction, EventHandler, MessageContext, MockConnection, SharedConnection};
use bamboo_server::{Action, ActionGroup, Engine, EngineBuilder, RateLimitPipe, Request, RequestContext};
use bamboo_config::BambooConfig;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

fn request(method: Method, uri: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn body_of(response: bamboo_server::Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn json_of(response: bamboo_server::Response) -> Value {
    serde_json::from_slice(&body_of(response).await).unwrap()
}

fn builder() -> EngineBuilder {
    let mut config = BambooConfig::default();
    config.rate_limit.cleanup_interval_ms = 0;
    EngineBuilder::from_config(config).clock(Arc::new(ManualClock::new(1_000)))
}

fn show_user() -> Action {
    Action::get("/users/:id", |mut ctx: RequestContext| async move {
        let id = ctx.param("id").unwrap_or_default();
        ctx.json(json!({ "id": id }), StatusCode::OK)?;
        Ok(ctx)
    })
    .unwrap()
}

fn marker(name: &'static str) -> Pipe<RequestContext> {
    Pipe::new(name, move |mut ctx: RequestContext| async move {
        ctx.set_header(
            HeaderName::from_static("x-pipe"),
            HeaderValue::from_static(name),
        );
        Ok(ctx)
    })
    .unwrap()
}

#[tokio::test]
async fn resolves_params_and_responds() {
    let engine = builder().action(show_user()).build().unwrap();

    let response = engine.handle_http(request(Method::GET, "/users/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_of(response).await, json!({"id": "42"}));
}

#[tokio::test]
async fn unresolved_gets_404_after_global_pipes() {
    let engine = builder().pipe(marker("global")).action(show_user()).build().unwrap();

    let response = engine.handle_http(request(Method::GET, "/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-pipe"], "global");

    let response = engine.handle_http(request(Method::POST, "/users/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn global_pipe_response_skips_handler() {
    let guard = Pipe::new("guard", |mut ctx: RequestContext| async move {
        if ctx.header("authorization").is_none() {
            ctx.text("denied", StatusCode::UNAUTHORIZED);
        }
        Ok(ctx)
    })
    .unwrap();
    let engine = builder().pipe(guard).action(show_user()).build().unwrap();

    let response = engine.handle_http(request(Method::GET, "/users/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_of(response).await, "denied");

    let authorised = http::Request::get("/users/1")
        .header("authorization", "Bearer t")
        .body(Full::default())
        .unwrap();
    let response = engine.handle_http(authorised).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_response_is_500() {
    let engine = builder()
        .action(Action::get("/silent", |ctx: RequestContext| async move { Ok(ctx) }).unwrap())
        .build()
        .unwrap();

    let response = assert_ok!(engine.handle_http(request(Method::GET, "/silent")).await);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn handler_errors_propagate() {
    let engine = builder()
        .action(
            Action::get("/boom", |_ctx: RequestContext| async move {
                Err(HandlerError::message("boom"))
            })
            .unwrap(),
        )
        .build()
        .unwrap();

    let err = assert_err!(engine.handle_http(request(Method::GET, "/boom")).await);
    assert!(matches!(err, BambooError::Handler(_)));
    assert_eq!(err.status_code(), 500);
}

#[tokio::test(start_paused = true)]
async fn slow_handlers_time_out() {
    let mut config = BambooConfig::default();
    config.server.request_timeout_ms = 50;
    config.rate_limit.cleanup_interval_ms = 0;
    let engine = EngineBuilder::from_config(config)
        .action(
            Action::get("/slow", |mut ctx: RequestContext| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                ctx.status(StatusCode::OK);
                Ok(ctx)
            })
            .unwrap(),
        )
        .build()
        .unwrap();

    let err = engine.handle_http(request(Method::GET, "/slow")).await.unwrap_err();
    assert!(matches!(err, BambooError::Timeout(d) if d == Duration::from_millis(50)));
    assert_eq!(err.status_code(), 504);
}

#[tokio::test]
async fn body_params_and_query() {
    let engine = builder()
        .action(
            Action::post("/echo/:id", |mut ctx: RequestContext| async move {
                let out = json!({
                    "id": ctx.param("id"),
                    "name": ctx.param("name"),
                    "page": ctx.query("page"),
                });
                ctx.json(out, StatusCode::CREATED)?;
                Ok(ctx)
            })
            .unwrap(),
        )
        .build()
        .unwrap();

    let response = engine
        .handle_http(json_request(Method::POST, "/echo/9?page=2", &json!({"name": "ada", "id": "body"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_of(response).await, json!({"id": "9", "name": "ada", "page": "2"}));
}

#[tokio::test]
async fn head_strips_body() {
    let engine = builder()
        .action(
            Action::new("HEAD", "/doc", |mut ctx: RequestContext| async move {
                ctx.text("hidden", StatusCode::OK);
                Ok(ctx)
            })
            .unwrap(),
        )
        .build()
        .unwrap();

    let response = engine.handle_http(request(Method::HEAD, "/doc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("content-type"));
    assert!(body_of(response).await.is_empty());
}

#[tokio::test]
async fn group_prefix_and_pipe_order() {
    let group = ActionGroup::new("/api/v1")
        .unwrap()
        .with_pipes([marker("group")])
        .action(show_user());
    let engine = builder().group(group).build().unwrap();

    let response = engine.handle_http(request(Method::GET, "/api/v1/users/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-pipe"], "group");

    let response = engine.handle_http(request(Method::GET, "/users/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limit_pipe_returns_429() {
    let limited = show_user().with_pipes([RateLimitPipe::builder("users")
        .limit(2)
        .window(Duration::from_secs(60))
        .global()
        .build()
        .unwrap()]);
    let engine = builder().action(limited).build().unwrap();

    for remaining in ["1", "0"] {
        let response = engine.handle_http(request(Method::GET, "/users/1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
    }

    let response = engine.handle_http(request(Method::GET, "/users/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "60");
    let body = json_of(response).await;
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}

fn limited(pipe: RateLimitPipe) -> Arc<Engine> {
    builder()
        .action(show_user().with_pipes([pipe.limit(1).build().unwrap()]))
        .build()
        .unwrap()
}

fn get_with(header: &str, value: &str) -> Request {
    http::Request::get("/users/1")
        .header(header, value)
        .body(Full::default())
        .unwrap()
}

async fn status_of(engine: &Engine, request: Request) -> StatusCode {
    engine.handle_http(request).await.unwrap().status()
}

#[tokio::test]
async fn rate_limit_pipe_counts_per_header_value() {
    let engine = limited(RateLimitPipe::builder("keys").per_header("x-api-key"));

    assert_eq!(status_of(&engine, get_with("x-api-key", "a")).await, StatusCode::OK);
    assert_eq!(
        status_of(&engine, get_with("x-api-key", "a")).await,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(status_of(&engine, get_with("x-api-key", "b")).await, StatusCode::OK);

    for _ in 0..3 {
        let response = engine.handle_http(request(Method::GET, "/users/1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn rate_limit_pipe_counts_per_client_address() {
    let engine = limited(RateLimitPipe::builder("addr").per_ip());

    assert_eq!(status_of(&engine, get_with("x-forwarded-for", "10.0.0.1")).await, StatusCode::OK);
    assert_eq!(
        status_of(&engine, get_with("x-forwarded-for", "10.0.0.1")).await,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(status_of(&engine, get_with("x-forwarded-for", "10.0.0.2")).await, StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_pipe_uses_custom_keys() {
    let engine = limited(
        RateLimitPipe::builder("tenants").key_extractor(|ctx| ctx.query("tenant").map(str::to_string)),
    );
    let tenant = |t: &str| request(Method::GET, &format!("/users/1?tenant={t}"));

    assert_eq!(status_of(&engine, tenant("acme")).await, StatusCode::OK);
    assert_eq!(status_of(&engine, tenant("acme")).await, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(status_of(&engine, tenant("globex")).await, StatusCode::OK);
    for _ in 0..3 {
        assert_eq!(status_of(&engine, request(Method::GET, "/users/1")).await, StatusCode::OK);
    }
}

#[tokio::test]
async fn rate_limit_pipe_skips_matching_requests_without_counting() {
    let engine = limited(
        RateLimitPipe::builder("public")
            .global()
            .skip(|ctx| ctx.header("x-internal").is_some())
            .error_message("Easy there."),
    );

    for _ in 0..3 {
        let response = engine.handle_http(get_with("x-internal", "1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-remaining"));
    }
    assert_eq!(status_of(&engine, request(Method::GET, "/users/1")).await, StatusCode::OK);

    let response = engine.handle_http(request(Method::GET, "/users/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_of(response).await["error"]["message"], "Easy there.");
}

#[tokio::test]
async fn services_reach_handlers() {
    struct Motd(String);

    let engine = builder()
        .service(Motd("hello".into()))
        .action(
            Action::get("/motd", |mut ctx: RequestContext| async move {
                let motd = ctx
                    .service::<Motd>()
                    .ok_or_else(|| HandlerError::message("motd missing"))?;
                ctx.text(motd.0.clone(), StatusCode::OK);
                Ok(ctx)
            })
            .unwrap(),
        )
        .build()
        .unwrap();

    let response = engine.handle_http(request(Method::GET, "/motd")).await.unwrap();
    assert_eq!(body_of(response).await, "hello");
}

fn echo_event() -> EventAction {
    EventAction::new(
        "echo",
        EventHandler::raw(|mut ctx: MessageContext| async move {
            let data = ctx.data().clone();
            ctx.json(data)?;
            Ok(ctx)
        }),
    )
    .unwrap()
}

async fn open(engine: &Engine, token: &str) -> (Arc<MockConnection>, SharedConnection) {
    let mock = Arc::new(MockConnection::with_token(token));
    let conn: SharedConnection = mock.clone();
    assert!(engine.handle_ws_open(conn.clone()).await.unwrap());
    (mock, conn)
}

#[tokio::test]
async fn websocket_round_trip() {
    let engine = builder().event(echo_event()).build().unwrap();
    let (mock, conn) = open(&engine, "abc").await;

    assert_eq!(engine.session_count(), 1);
    assert!(engine.is_connected("abc"));

    engine
        .handle_ws_message(&conn, r#"{"event":"echo","data":{"n":1}}"#)
        .await
        .unwrap();
    assert_eq!(mock.frames_for("echo"), vec![json!({"event": "echo", "data": {"n": 1}})]);

    assert_eq!(engine.send_to_token("abc", "ping", json!({})).unwrap(), 1);
    assert_eq!(mock.frames_for("ping").len(), 1);

    engine.handle_ws_close(&conn);
    assert!(!engine.is_connected("abc"));
}

#[tokio::test]
async fn shutdown_terminates_sessions() {
    let engine = builder().build().unwrap();
    let (first, _) = open(&engine, "a").await;
    let (second, _) = open(&engine, "b").await;

    assert_eq!(engine.shutdown(), 2);
    assert!(first.is_terminated());
    assert!(second.is_terminated());
    assert_eq!(engine.session_count(), 0);
}

async fn ok_handler(mut ctx: RequestContext) -> HandlerResult<RequestContext> {
    ctx.status(StatusCode::NO_CONTENT);
    Ok(ctx)
}

#[tokio::test]
async fn routes_listing() {
    let engine = builder()
        .action(Action::get("/", ok_handler).unwrap())
        .action(Action::delete("/users/{id}", ok_handler).unwrap())
        .build()
        .unwrap();

    assert_eq!(
        engine.routes(),
        vec![
            (Method::GET, "/".to_string()),
            (Method::DELETE, "/users/:id".to_string()),
        ]
    );
    let response = engine.handle_http(request(Method::GET, "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
