//! The per-message context.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use bamboo_core::{Services, Stash};
use bamboo_middleware::PipeContext;
use bamboo_ratelimit::{ip_context, RateLimitInfo, RateLimiter};

use crate::connection::{ConnectionId, SharedConnection};
use crate::error::{RealtimeError, RealtimeResult};
use crate::frame::{Frame, Inbound};
use crate::session::Session;

/// Message used by [`MessageContext::err_default`].
pub const DEFAULT_ERROR_MESSAGE: &str = "Could not perform this operation.";

/// Code used by [`MessageContext::err_default`].
pub const DEFAULT_ERROR_CODE: u16 = 3;

/// Code sent when a typed handler cannot decode its payload.
pub const INVALID_PAYLOAD_CODE: u16 = 2;

/// Context threaded through the pipes and handler of one inbound message.
///
/// Unlike an HTTP response, a connection can receive any number of frames
/// while a message is handled. [`json`](Self::json) always sends and then
/// locks; [`json_once`](Self::json_once) sends only while unlocked.
pub struct MessageContext {
    session: Arc<Session>,
    limiter: Arc<RateLimiter>,
    services: Arc<Services>,
    event: String,
    data: Value,
    stash: Stash,
    locked: bool,
}

impl fmt::Debug for MessageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageContext")
            .field("connection_id", &self.session.id())
            .field("event", &self.event)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

impl PipeContext for MessageContext {
    fn is_locked(&self) -> bool {
        self.locked
    }
}

impl MessageContext {
    /// Creates a context for `message` on `session`.
    pub fn new(
        session: Arc<Session>,
        message: Inbound,
        limiter: Arc<RateLimiter>,
        services: Arc<Services>,
    ) -> Self {
        Self {
            session,
            limiter,
            services,
            event: message.event,
            data: message.data,
            stash: Stash::new(),
            locked: false,
        }
    }

    /// The event name.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// The raw payload.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Reads field `key` of the payload as `T`.
    pub fn param<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Decodes the whole payload as `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.data.clone())
    }

    /// The connection's session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The underlying connection.
    pub fn connection(&self) -> &SharedConnection {
        self.session.connection()
    }

    /// Connection identifier.
    pub fn connection_id(&self) -> ConnectionId {
        self.session.id()
    }

    /// Token the connection opened with.
    pub fn token(&self) -> Option<&str> {
        self.session.token()
    }

    /// Sends `{"event": <this event>, "data": data}` and locks.
    pub fn json(&mut self, data: impl Serialize) -> RealtimeResult<()> {
        let frame = Frame::new(&self.event, data).encode()?;
        self.locked = true;
        self.send(frame)
    }

    /// Like [`json`](Self::json), but does nothing once locked.
    pub fn json_once(&mut self, data: impl Serialize) -> RealtimeResult<()> {
        if self.locked {
            return Ok(());
        }
        self.json(data)
    }

    /// Sends an error payload `{"message", "code"}` for this event.
    pub fn err(&mut self, message: impl Into<String>, code: u16) -> RealtimeResult<()> {
        self.json(json!({ "message": message.into(), "code": code }))
    }

    /// Sends the generic error payload.
    pub fn err_default(&mut self) -> RealtimeResult<()> {
        self.err(DEFAULT_ERROR_MESSAGE, DEFAULT_ERROR_CODE)
    }

    /// Sends a raw text frame.
    pub fn send(&self, text: String) -> RealtimeResult<()> {
        self.session.connection().send(text)
    }

    /// Publishes `{"event", "data"}` to the other subscribers of `topic`.
    ///
    /// Fails unless this connection is itself subscribed.
    pub fn publish(
        &self,
        topic: &str,
        event: &str,
        data: impl Serialize,
    ) -> RealtimeResult<usize> {
        if !self.session.is_subscribed(topic) {
            return Err(RealtimeError::NotSubscribed {
                topic: topic.to_string(),
            });
        }
        let frame = Frame::new(event, data).encode()?;
        Ok(self.session.broadcast(topic, &frame))
    }

    /// Subscribes the connection to `topic`.
    pub fn subscribe(&self, topic: &str) -> bool {
        self.session.subscribe(topic)
    }

    /// Unsubscribes the connection from `topic`.
    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.session.unsubscribe(topic)
    }

    /// Returns `true` if the connection is subscribed to `topic`.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.session.is_subscribed(topic)
    }

    /// Closes the connection and locks the context.
    pub fn force_close(&mut self) {
        self.locked = true;
        self.session.connection().terminate();
    }

    /// Stores `value` in the session.
    pub fn push(&self, key: impl Into<String>, value: impl Serialize) -> RealtimeResult<()> {
        self.session.push(key, value)
    }

    /// Stores `value` in the session when `cond` holds.
    pub fn push_if(
        &self,
        cond: bool,
        key: impl Into<String>,
        value: impl Serialize,
    ) -> RealtimeResult<()> {
        self.session.push_if(cond, key, value)
    }

    /// Stores several values in the session.
    pub fn push_many(&self, values: serde_json::Map<String, Value>) {
        self.session.push_many(values);
    }

    /// Reads a session value.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.session.get(key)
    }

    /// Removes a session value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.session.remove(key)
    }

    /// Counts a hit on `context`; `true` means over the limit.
    pub async fn ratelimit(&self, context: &str, limit: u64, interval: Duration) -> bool {
        self.limiter.check(context, limit, interval).await
    }

    /// Like [`ratelimit`](Self::ratelimit), counted per peer address.
    ///
    /// Falls back to the shared counter when the address is unknown.
    pub async fn ratelimit_ip(&self, context: &str, limit: u64, interval: Duration) -> bool {
        match self.session.connection().remote_addr() {
            Some(ip) => self.limiter.check(&ip_context(context, &ip), limit, interval).await,
            None => self.limiter.check(context, limit, interval).await,
        }
    }

    /// Limit state of `context`.
    pub async fn rate_limit_info(&self, context: &str) -> Option<RateLimitInfo> {
        self.limiter.info(context).await
    }

    /// Looks up an application service.
    pub fn service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    /// Per-message scratch space.
    pub fn stash(&self) -> &Stash {
        &self.stash
    }

    /// Mutable per-message scratch space.
    pub fn stash_mut(&mut self) -> &mut Stash {
        &mut self.stash
    }

    /// Marks the message as handled.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Returns `true` once locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}
