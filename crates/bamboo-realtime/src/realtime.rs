//! Connection lifecycle and message dispatch.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashSet;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use bamboo_core::{BambooResult, BoxFuture, HandlerResult, Services};
use bamboo_middleware::{compose, run_handler, LockPolicy, Pipe};
use bamboo_ratelimit::RateLimiter;

use crate::connection::{ConnectionId, SharedConnection};
use crate::context::MessageContext;
use crate::error::RealtimeResult;
use crate::event::{EventAction, EventRegistry};
use crate::frame::{client_topic, Frame, Inbound, CONNECTED_EVENT};
use crate::hub::TopicHub;
use crate::presence::{Presence, PresenceEntry};
use crate::registry::SessionRegistry;
use crate::rooms;
use crate::session::Session;

/// Hook run after a connection is accepted and acknowledged.
pub type OpenHook = Arc<dyn Fn(Arc<Session>) -> BoxFuture<'static, HandlerResult<()>> + Send + Sync>;

/// Erases an async closure into an [`OpenHook`].
pub fn open_hook_fn<F, Fut>(f: F) -> OpenHook
where
    F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = HandlerResult<()>> + Send + 'static,
{
    Arc::new(move |session| -> BoxFuture<'static, HandlerResult<()>> { Box::pin(f(session)) })
}

/// Connection-level behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeOptions {
    /// Refuse connections without a token.
    pub require_token: bool,
    /// Send the `connected` frame on open.
    pub connected_ack: bool,
    /// Larger payloads are dropped.
    pub max_message_bytes: usize,
    /// Lock handling for the pipe chain.
    pub lock_policy: LockPolicy,
}

impl Default for RealtimeOptions {
    fn default() -> Self {
        Self {
            require_token: false,
            connected_ack: true,
            max_message_bytes: 1024 * 1024,
            lock_policy: LockPolicy::Abort,
        }
    }
}

/// The realtime half of the engine.
///
/// Owns the session registry, the topic hub, room presence and the event
/// registry, and implements the three runtime entrypoints: open, message
/// and close.
pub struct Realtime {
    options: RealtimeOptions,
    registry: SessionRegistry,
    hub: Arc<TopicHub>,
    presence: Arc<Presence>,
    events: RwLock<EventRegistry>,
    pipes: Vec<Pipe<MessageContext>>,
    open_hook: Option<OpenHook>,
    rooms: DashSet<String>,
    limiter: Arc<RateLimiter>,
    services: Arc<Services>,
}

impl fmt::Debug for Realtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realtime")
            .field("options", &self.options)
            .field("sessions", &self.registry.len())
            .field("events", &self.events.read().len())
            .field("pipes", &self.pipes.len())
            .finish_non_exhaustive()
    }
}

impl Realtime {
    /// Creates a realtime dispatcher with no events.
    pub fn new(options: RealtimeOptions, limiter: Arc<RateLimiter>, services: Arc<Services>) -> Self {
        Self {
            options,
            registry: SessionRegistry::new(),
            hub: Arc::new(TopicHub::new()),
            presence: Arc::new(Presence::new(Arc::clone(limiter.clock()))),
            events: RwLock::new(EventRegistry::new()),
            pipes: Vec::new(),
            open_hook: None,
            rooms: DashSet::new(),
            limiter,
            services,
        }
    }

    /// Adds pipes that run before every event's own pipes.
    pub fn with_pipes(mut self, pipes: impl IntoIterator<Item = Pipe<MessageContext>>) -> Self {
        self.pipes.extend(pipes);
        self
    }

    /// Sets the open hook.
    pub fn with_open_hook(mut self, hook: OpenHook) -> Self {
        self.open_hook = Some(hook);
        self
    }

    /// Registers an event.
    pub fn register(&self, action: EventAction) -> RealtimeResult<()> {
        self.events.write().register(action)
    }

    /// Registered event names, sorted.
    pub fn events(&self) -> Vec<String> {
        self.events.read().names().into_iter().map(str::to_string).collect()
    }

    /// Behaviour switches.
    pub fn options(&self) -> &RealtimeOptions {
        &self.options
    }

    /// The topic hub.
    pub fn hub(&self) -> &Arc<TopicHub> {
        &self.hub
    }

    /// Room presence.
    pub fn presence(&self) -> &Arc<Presence> {
        &self.presence
    }

    /// The session registry.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Handles a newly opened connection.
    ///
    /// Returns `false` if the connection was refused and terminated. If the
    /// open hook fails, the session is released, the connection terminated
    /// and the hook's error returned.
    pub async fn handle_open(&self, conn: SharedConnection) -> BambooResult<bool> {
        let now = self.limiter.clock().now_ms();
        let admitted = self.registry.admit(
            conn.clone(),
            Arc::clone(&self.hub),
            self.options.require_token,
            now,
        );
        let session = match admitted {
            Ok(session) => session,
            Err(reason) => {
                warn!(
                    connection_id = %conn.id(),
                    token = conn.token().unwrap_or_default(),
                    reason = %reason,
                    "websocket connection rejected"
                );
                metrics::counter!("bamboo_ws_rejected_total", "reason" => reason.as_str()).increment(1);
                conn.terminate();
                return Ok(false);
            }
        };

        if let Some(token) = session.token() {
            session.subscribe(&client_topic(token));
        }

        if self.options.connected_ack {
            let frame = Frame::new(CONNECTED_EVENT, json!({ "timestamp": now }))
                .encode()
                .map_err(bamboo_core::HandlerError::from)?;
            if let Err(e) = conn.send(frame) {
                warn!(connection_id = %conn.id(), error = %e, "failed to send connected frame");
            }
        }

        debug!(
            connection_id = %session.id(),
            token = session.token().unwrap_or_default(),
            "websocket connection opened"
        );

        if let Some(hook) = &self.open_hook {
            if let Err(e) = hook(Arc::clone(&session)).await {
                warn!(connection_id = %conn.id(), error = %e, "open hook failed, releasing session");
                self.retire(conn.id());
                conn.terminate();
                return Err(e.into());
            }
        }
        Ok(true)
    }

    /// Handles one inbound text message.
    ///
    /// Empty and oversized payloads are ignored, as are unknown events.
    /// Pipe and handler errors are returned unchanged.
    pub async fn handle_message(&self, conn: &SharedConnection, raw: &str) -> BambooResult<()> {
        if raw.is_empty() {
            return Ok(());
        }
        if raw.len() > self.options.max_message_bytes {
            warn!(
                connection_id = %conn.id(),
                size = raw.len(),
                max = self.options.max_message_bytes,
                "dropping oversized websocket message"
            );
            return Ok(());
        }
        let Some(session) = self.registry.get(conn.id()) else {
            debug!(connection_id = %conn.id(), "message from connection without a session");
            return Ok(());
        };

        let start = Instant::now();
        let inbound = Inbound::parse(raw);
        let action = self.events.read().resolve(&inbound.event);
        let Some(action) = action else {
            debug!(event = %inbound.event, connection_id = %conn.id(), "no handler for event");
            return Ok(());
        };

        let policy = self.options.lock_policy;
        let ctx = MessageContext::new(
            session,
            inbound,
            Arc::clone(&self.limiter),
            Arc::clone(&self.services),
        );
        let ctx = compose(ctx, &self.pipes, policy).await?;
        let ctx = compose(ctx, action.pipes(), policy).await?;
        let ctx = run_handler(ctx, action.handler().handler(), policy).await?;

        let duration_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        debug!(
            event = %ctx.event(),
            connection_id = %conn.id(),
            duration_us,
            "websocket message handled"
        );
        metrics::counter!("bamboo_ws_messages_total", "event" => action.name().to_string()).increment(1);
        Ok(())
    }

    /// Handles a closed connection.
    ///
    /// A connection that held no session (for example a rejected duplicate)
    /// is terminated and the live session keeps its token.
    pub fn handle_close(&self, conn: &SharedConnection) {
        match self.retire(conn.id()) {
            Some((session, left)) => {
                debug!(
                    connection_id = %session.id(),
                    token = session.token().unwrap_or_default(),
                    topics = left,
                    "websocket connection closed"
                );
            }
            None => conn.terminate(),
        }
    }

    // Release first, then close the session, then sweep by id: a handler
    // still holding the session can no longer subscribe once it is closed.
    fn retire(&self, id: ConnectionId) -> Option<(Arc<Session>, usize)> {
        let session = self.registry.release(id);
        if let Some(session) = &session {
            session.close();
        }
        let left = self.hub.unsubscribe_all(id);
        for (room, entry) in self.presence.leave_all(id) {
            self.announce_leave(&room, &entry);
        }
        session.map(|session| (session, left))
    }

    fn announce_leave(&self, room: &str, entry: &PresenceEntry) {
        match rooms::leave_frame(room, entry) {
            Ok(frame) => {
                self.hub.publish(room, &frame, None);
            }
            Err(e) => warn!(room = %room, error = %e, "failed to encode presence frame"),
        }
    }

    /// Sends `{"event", "data"}` to the connection that opened with `token`.
    pub fn send_to_token(&self, token: &str, event: &str, data: impl Serialize) -> RealtimeResult<usize> {
        self.publish(&client_topic(token), event, data)
    }

    /// Sends `{"event", "data"}` to every subscriber of `topic`.
    pub fn publish(&self, topic: &str, event: &str, data: impl Serialize) -> RealtimeResult<usize> {
        let frame = Frame::new(event, data).encode()?;
        Ok(self.hub.publish(topic, &frame, None))
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if a live session holds `token`.
    pub fn is_connected(&self, token: &str) -> bool {
        self.registry.is_connected(token)
    }

    /// Registers the room events if they are not registered yet.
    pub fn enable_rooms(&self) -> RealtimeResult<()> {
        let mut events = self.events.write();
        for action in rooms::actions(&self.presence)? {
            if !events.contains(action.name()) {
                events.register(action)?;
            }
        }
        Ok(())
    }

    /// Declares a room, enabling room events on first use.
    pub fn create_room(&self, name: impl Into<String>) -> RealtimeResult<()> {
        self.enable_rooms()?;
        self.rooms.insert(name.into());
        Ok(())
    }

    /// Members of `room`, oldest first.
    pub fn room_members(&self, room: &str) -> Vec<PresenceEntry> {
        self.presence.members(room)
    }

    /// Declared rooms, sorted.
    pub fn rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.rooms.iter().map(|r| r.key().clone()).collect();
        rooms.sort();
        rooms
    }

    /// Terminates every live session. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        let sessions = self.registry.drain();
        for session in &sessions {
            session.close();
            self.hub.unsubscribe_all(session.id());
            self.presence.leave_all(session.id());
            session.connection().terminate();
        }
        if !sessions.is_empty() {
            info!(sessions = sessions.len(), "terminated websocket sessions");
        }
        sessions.len()
    }
}
