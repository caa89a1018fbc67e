//! Per-connection state that outlives a single message.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::connection::{ConnectionId, SharedConnection};
use crate::error::RealtimeResult;
use crate::hub::TopicHub;

/// A live, accepted connection.
///
/// Holds keyed storage that every message on the connection sees, such as
/// the identity established by an `auth` event. The per-message stash, by
/// contrast, starts empty for each message.
///
/// Once closed, a session takes no new subscriptions. A handler still
/// holding the session while its connection closes cannot leave entries
/// behind in the hub.
pub struct Session {
    connection: SharedConnection,
    hub: Arc<TopicHub>,
    storage: RwLock<Map<String, Value>>,
    opened_at_ms: u64,
    closed: AtomicBool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("token", &self.token())
            .field("opened_at_ms", &self.opened_at_ms)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(connection: SharedConnection, hub: Arc<TopicHub>, opened_at_ms: u64) -> Self {
        Self {
            connection,
            hub,
            storage: RwLock::new(Map::new()),
            opened_at_ms,
            closed: AtomicBool::new(false),
        }
    }

    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Token the connection opened with.
    pub fn token(&self) -> Option<&str> {
        self.connection.token()
    }

    /// The underlying connection.
    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    /// When the session was accepted, in ms since the epoch.
    pub fn opened_at_ms(&self) -> u64 {
        self.opened_at_ms
    }

    /// Marks the session closed. Returns `false` if it already was.
    pub(crate) fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    /// Returns `true` once the connection has closed or been released.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stores `value` under `key`.
    pub fn push(&self, key: impl Into<String>, value: impl Serialize) -> RealtimeResult<()> {
        let value = serde_json::to_value(value)?;
        self.storage.write().insert(key.into(), value);
        Ok(())
    }

    /// Stores `value` under `key` only when `cond` holds.
    pub fn push_if(
        &self,
        cond: bool,
        key: impl Into<String>,
        value: impl Serialize,
    ) -> RealtimeResult<()> {
        if cond {
            self.push(key, value)?;
        }
        Ok(())
    }

    /// Stores every entry of `values`, replacing existing keys.
    pub fn push_many(&self, values: Map<String, Value>) {
        self.storage.write().extend(values);
    }

    /// Reads `key` back as `T`. Missing keys and type mismatches give `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.storage.read().get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    /// Reads `key` as raw JSON.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.storage.read().get(key).cloned()
    }

    /// Returns `true` if `key` is stored.
    pub fn contains(&self, key: &str) -> bool {
        self.storage.read().contains_key(key)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.storage.write().remove(key)
    }

    /// Subscribes this connection to `topic`.
    ///
    /// Returns `false` if it already was subscribed or the session is closed.
    pub fn subscribe(&self, topic: &str) -> bool {
        if self.is_closed() {
            return false;
        }
        let added = self.hub.subscribe(topic, &self.connection);
        // Close may have swept the hub between the check and the insert.
        if self.is_closed() {
            self.hub.unsubscribe(topic, self.id());
            return false;
        }
        added
    }

    /// Unsubscribes this connection from `topic`.
    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.hub.unsubscribe(topic, self.id())
    }

    /// Returns `true` if this connection is subscribed to `topic`.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.hub.is_subscribed(topic, self.id())
    }

    /// Hands `frame` to every other subscriber of `topic`.
    pub fn broadcast(&self, topic: &str, frame: &str) -> usize {
        self.hub.publish(topic, frame, Some(self.id()))
    }

    /// Topics this connection is subscribed to, sorted.
    pub fn topics(&self) -> Vec<String> {
        self.hub.topics_of(self.id())
    }
}
