//! The engine: one explicit instance owning every registry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use bamboo_config::{BambooConfig, StorageBackend};
use bamboo_core::{BambooError, BambooResult, HandlerResult, Services, SharedClock, SystemClock};
use bamboo_middleware::{compose, run_handler, LockPolicy, Pipe};
use bamboo_ratelimit::{CleanupTask, Limit, MemoryStore, RateLimiter, SharedStore};
use bamboo_realtime::{
    open_hook_fn, EventAction, MessageContext, OpenHook, PresenceEntry, Realtime, RealtimeOptions,
    RealtimeResult, Session, SharedConnection,
};
use bamboo_router::{split_request_path, Params, Router};
use bamboo_telemetry::names;

use crate::action::{Action, ActionGroup};
use crate::context::RequestContext;
use crate::error::{EngineError, EngineResult};
use crate::types::{Request, Response};

/// Dispatches HTTP requests and WebSocket messages.
///
/// Built once with [`EngineBuilder`] and shared as `Arc<Engine>` by the
/// runtime, which calls [`handle_http`](Self::handle_http) per request and
/// the `handle_ws_*` methods per connection event.
pub struct Engine {
    config: BambooConfig,
    router: Router<Action>,
    pipes: Vec<Pipe<RequestContext>>,
    realtime: Realtime,
    limiter: Arc<RateLimiter>,
    services: Arc<Services>,
    cleanup: Mutex<Option<CleanupTask>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("routes", &self.router.len())
            .field("pipes", &self.pipes.len())
            .field("realtime", &self.realtime)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Starts a builder with default configuration.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// The configuration the engine was built from.
    pub fn config(&self) -> &BambooConfig {
        &self.config
    }

    /// Registered `(method, path)` pairs, sorted.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.router.routes()
    }

    /// Registered event names, sorted.
    pub fn events(&self) -> Vec<String> {
        self.realtime.events()
    }

    /// The shared rate limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// The realtime dispatcher.
    pub fn realtime(&self) -> &Realtime {
        &self.realtime
    }

    /// Looks up an application service.
    pub fn service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    fn lock_policy(&self) -> LockPolicy {
        self.config.server.lock_policy
    }

    fn request_timeout(&self) -> Option<Duration> {
        match self.config.server.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Dispatches one HTTP request.
    ///
    /// Global pipes run for every request, matched or not. An unmatched
    /// request gets a 404 unless a global pipe already responded; a chain
    /// that ends without a response gets a 500. Pipe and handler errors are
    /// returned unchanged for the runtime to map.
    pub async fn handle_http(&self, request: Request) -> BambooResult<Response> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let start = Instant::now();

        let response = match self.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.dispatch(request))
                .await
                .map_err(|_| BambooError::Timeout(limit))??,
            None => self.dispatch(request).await?,
        };

        let status = response.status();
        let duration_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        debug!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_us,
            "request handled"
        );
        metrics::counter!(
            names::HTTP_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);
        Ok(response)
    }

    async fn dispatch(&self, request: Request) -> HandlerResult<Response> {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let matched = self
            .router
            .resolve(&parts.method, &split_request_path(parts.uri.path()));
        let (action, params) = match matched {
            Some(m) => (Some(m.value), m.params),
            None => (None, Params::new()),
        };

        let policy = self.lock_policy();
        let ctx = RequestContext::new(
            parts,
            body,
            params,
            Arc::clone(&self.limiter),
            Arc::clone(&self.services),
        );
        let ctx = compose(ctx, &self.pipes, policy).await?;
        let ctx = match action {
            Some(action) => {
                let ctx = compose(ctx, action.pipes(), policy).await?;
                run_handler(ctx, action.handler(), policy).await?
            }
            None => {
                let mut ctx = ctx;
                ctx.status(StatusCode::NOT_FOUND);
                ctx
            }
        };
        Ok(ctx.into_response())
    }

    /// Returns the connection token if `request` is a WebSocket upgrade
    /// candidate: its path contains the upgrade path and its query carries
    /// the token parameter.
    pub fn upgrade_token(&self, request: &Request) -> Option<String> {
        let realtime = &self.config.realtime;
        if !request.uri().path().contains(realtime.upgrade_path.as_str()) {
            return None;
        }
        let query = request.uri().query()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .find(|(k, _)| *k == realtime.token_param)
            .map(|(_, v)| v)
    }

    /// Handles a newly opened WebSocket connection.
    ///
    /// Returns `false` if the connection was refused and terminated.
    pub async fn handle_ws_open(&self, conn: SharedConnection) -> BambooResult<bool> {
        self.realtime.handle_open(conn).await
    }

    /// Handles one inbound WebSocket text message.
    pub async fn handle_ws_message(&self, conn: &SharedConnection, raw: &str) -> BambooResult<()> {
        self.realtime.handle_message(conn, raw).await
    }

    /// Handles a closed WebSocket connection.
    pub fn handle_ws_close(&self, conn: &SharedConnection) {
        self.realtime.handle_close(conn);
    }

    /// Sends `{"event", "data"}` to the connection holding `token`.
    pub fn send_to_token(&self, token: &str, event: &str, data: impl Serialize) -> RealtimeResult<usize> {
        self.realtime.send_to_token(token, event, data)
    }

    /// Sends `{"event", "data"}` to every subscriber of `topic`.
    pub fn publish(&self, topic: &str, event: &str, data: impl Serialize) -> RealtimeResult<usize> {
        self.realtime.publish(topic, event, data)
    }

    /// Number of live WebSocket sessions.
    pub fn session_count(&self) -> usize {
        self.realtime.session_count()
    }

    /// Returns `true` if a live session holds `token`.
    pub fn is_connected(&self, token: &str) -> bool {
        self.realtime.is_connected(token)
    }

    /// Registers the `rooms:join` / `rooms:leave` events.
    pub fn enable_rooms(&self) -> RealtimeResult<()> {
        self.realtime.enable_rooms()
    }

    /// Declares a room, enabling room events on first use.
    pub fn create_room(&self, name: impl Into<String>) -> RealtimeResult<()> {
        self.realtime.create_room(name)
    }

    /// Members of `room`, oldest first.
    pub fn room_members(&self, room: &str) -> Vec<PresenceEntry> {
        self.realtime.room_members(room)
    }

    /// Starts sweeping expired rate-limit records every `period`.
    ///
    /// Replaces any running sweep. Must be called inside a tokio runtime.
    pub fn start_cleanup(&self, period: Duration) {
        let task = self.limiter.spawn_cleanup(period);
        if let Some(old) = self.cleanup.lock().replace(task) {
            old.stop();
        }
    }

    /// Returns `true` while a cleanup sweep is scheduled.
    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops the cleanup sweep and terminates every live session.
    ///
    /// Returns how many sessions were terminated.
    pub fn shutdown(&self) -> usize {
        if let Some(task) = self.cleanup.lock().take() {
            task.stop();
        }
        let closed = self.realtime.shutdown();
        info!(sessions = closed, "engine shut down");
        closed
    }
}

/// Assembles an [`Engine`].
///
/// Registration problems (bad paths, conflicting routes, duplicate events)
/// are collected and reported by [`build`](Self::build).
///
/// ```
/// use bamboo_server::{Action, EngineBuilder, RequestContext};
/// use http::StatusCode;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), bamboo_server::EngineError> {
/// let engine = EngineBuilder::new()
///     .action(Action::get("/health", |mut ctx: RequestContext| async move {
///         ctx.text("ok", StatusCode::OK);
///         Ok(ctx)
///     })?)
///     .build()?;
///
/// assert_eq!(engine.routes().len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct EngineBuilder {
    config: BambooConfig,
    actions: Vec<Action>,
    pipes: Vec<Pipe<RequestContext>>,
    ws_pipes: Vec<Pipe<MessageContext>>,
    events: Vec<EventAction>,
    open_hook: Option<OpenHook>,
    services: Services,
    store: Option<SharedStore>,
    clock: Option<SharedClock>,
    limits: Vec<(String, Limit)>,
    rooms: Vec<String>,
    enable_rooms: bool,
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("actions", &self.actions.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// A builder with default configuration.
    pub fn new() -> Self {
        Self::from_config(BambooConfig::default())
    }

    /// A builder using `config`.
    pub fn from_config(config: BambooConfig) -> Self {
        Self {
            config,
            actions: Vec::new(),
            pipes: Vec::new(),
            ws_pipes: Vec::new(),
            events: Vec::new(),
            open_hook: None,
            services: Services::new(),
            store: None,
            clock: None,
            limits: Vec::new(),
            rooms: Vec::new(),
            enable_rooms: false,
        }
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: BambooConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an action.
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Registers several actions.
    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Registers every action of a group.
    pub fn group(mut self, group: ActionGroup) -> Self {
        self.actions.extend(group.into_actions());
        self
    }

    /// Adds a pipe that runs for every HTTP request.
    pub fn pipe(mut self, pipe: Pipe<RequestContext>) -> Self {
        self.pipes.push(pipe);
        self
    }

    /// Adds a pipe that runs for every WebSocket message.
    pub fn ws_pipe(mut self, pipe: Pipe<MessageContext>) -> Self {
        self.ws_pipes.push(pipe);
        self
    }

    /// Registers a WebSocket event.
    pub fn event(mut self, event: EventAction) -> Self {
        self.events.push(event);
        self
    }

    /// Runs `f` for every accepted connection after the `connected` frame.
    pub fn on_open<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        self.open_hook = Some(open_hook_fn(f));
        self
    }

    /// Stores a service, retrievable by type from every context.
    pub fn service<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.services.register(Arc::new(service));
        self
    }

    /// Uses `store` for rate-limit records instead of the configured backend.
    pub fn storage(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses `clock` for rate-limit windows and connection timestamps.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Pre-registers the limit of a rate-limit context.
    pub fn limit(mut self, context: impl Into<String>, max: u64, interval: Duration) -> Self {
        self.limits.push((context.into(), Limit::new(max, interval)));
        self
    }

    /// Registers the room events.
    pub fn rooms(mut self) -> Self {
        self.enable_rooms = true;
        self
    }

    /// Declares a room; implies [`rooms`](Self::rooms).
    pub fn room(mut self, name: impl Into<String>) -> Self {
        self.rooms.push(name.into());
        self.enable_rooms = true;
        self
    }

    /// Opens the configured storage backend unless one was supplied.
    pub async fn connect_storage(mut self) -> EngineResult<Self> {
        if self.store.is_some() {
            return Ok(self);
        }
        match self.config.rate_limit.backend {
            StorageBackend::Memory => {
                self.store = Some(Arc::new(MemoryStore::new()));
            }
            #[cfg(feature = "redis")]
            StorageBackend::Redis => {
                let url = self.config.rate_limit.redis_url.clone().ok_or_else(|| {
                    EngineError::Storage("rate_limit.redis_url is not set".to_string())
                })?;
                let store = bamboo_ratelimit::RedisStore::connect(&url)
                    .await?
                    .with_prefix(self.config.rate_limit.key_prefix.clone());
                self.store = Some(Arc::new(store));
            }
            #[cfg(not(feature = "redis"))]
            StorageBackend::Redis => {
                return Err(EngineError::Storage(
                    "the redis backend requires the `redis` feature".to_string(),
                ));
            }
        }
        Ok(self)
    }

    /// Validates the configuration, registers everything and returns the engine.
    ///
    /// Inside a tokio runtime the rate-limit cleanup sweep starts right away
    /// (unless `rate_limit.cleanup_interval_ms` is 0); otherwise call
    /// [`Engine::start_cleanup`] later.
    pub fn build(self) -> EngineResult<Arc<Engine>> {
        let config = self.config;
        config.validate()?;

        let store = match (self.store, config.rate_limit.backend) {
            (Some(store), _) => store,
            (None, StorageBackend::Memory) => Arc::new(MemoryStore::new()) as SharedStore,
            (None, StorageBackend::Redis) => {
                return Err(EngineError::Storage(
                    "call EngineBuilder::connect_storage before build for the redis backend".to_string(),
                ))
            }
        };
        let clock = self.clock.unwrap_or_else(SystemClock::shared);

        let rate_limit = &config.rate_limit;
        let limiter = RateLimiter::new(store, clock).with_default_limit(Limit::new(
            rate_limit.default_limit,
            Duration::from_millis(rate_limit.default_interval_ms),
        ));
        for (context, limit) in &self.limits {
            limiter.limiter(context, limit.max, limit.interval);
        }
        let limiter = Arc::new(limiter);
        let services = Arc::new(self.services);

        let mut router = Router::new();
        for action in self.actions {
            let method = action.method().clone();
            let segments = action.segments().to_vec();
            let path = action.path().to_string();
            router.insert_segments(method, &segments, &path, action)?;
        }

        let options = RealtimeOptions {
            require_token: config.realtime.require_token,
            connected_ack: config.realtime.connected_ack,
            max_message_bytes: config.realtime.max_message_bytes,
            lock_policy: config.server.lock_policy,
        };
        let mut realtime = Realtime::new(options, Arc::clone(&limiter), Arc::clone(&services))
            .with_pipes(self.ws_pipes);
        if let Some(hook) = self.open_hook {
            realtime = realtime.with_open_hook(hook);
        }
        for event in self.events {
            realtime.register(event)?;
        }
        if self.enable_rooms {
            realtime.enable_rooms()?;
        }
        for room in self.rooms {
            realtime.create_room(room)?;
        }

        let engine = Arc::new(Engine {
            router,
            pipes: self.pipes,
            realtime,
            limiter,
            services,
            cleanup: Mutex::new(None),
            config,
        });

        let period = engine.config.rate_limit.cleanup_interval_ms;
        if period > 0 && tokio::runtime::Handle::try_current().is_ok() {
            engine.start_cleanup(Duration::from_millis(period));
        }

        info!(
            routes = engine.router.len(),
            events = engine.realtime.events().len(),
            storage = engine.limiter.store().name(),
            "engine built"
        );
        Ok(engine)
    }
}
