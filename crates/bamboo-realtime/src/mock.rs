//! An in-memory [`Connection`] for tests.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::connection::{Connection, ConnectionId};
use crate::error::{RealtimeError, RealtimeResult};

/// Records every frame sent to it.
///
/// Once terminated, further sends fail the way a closed socket would.
///
/// ```
/// use bamboo_realtime::{Connection, MockConnection};
///
/// let conn = MockConnection::with_token("abc");
/// conn.send("hello".into()).unwrap();
/// conn.terminate();
///
/// assert_eq!(conn.sent(), ["hello"]);
/// assert!(conn.is_terminated());
/// assert!(conn.send("late".into()).is_err());
/// ```
#[derive(Debug, Default)]
pub struct MockConnection {
    id: ConnectionId,
    token: Option<String>,
    remote_addr: Option<IpAddr>,
    sent: Mutex<Vec<String>>,
    terminated: AtomicBool,
}

impl MockConnection {
    /// A connection without a token.
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection that opened with `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Sets the peer address.
    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Frames sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Frames sent so far, decoded as JSON. Non-JSON frames are skipped.
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter_map(|f| serde_json::from_str(f).ok())
            .collect()
    }

    /// Decoded frames whose `event` equals `event`.
    pub fn frames_for(&self, event: &str) -> Vec<Value> {
        self.sent_json()
            .into_iter()
            .filter(|f| f.get("event").and_then(Value::as_str) == Some(event))
            .collect()
    }

    /// Forgets recorded frames.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    /// Returns `true` once [`terminate`](Connection::terminate) was called.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Marks the connection closed without going through the trait.
    pub fn terminate_now(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

impl Connection for MockConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn send(&self, text: String) -> RealtimeResult<()> {
        if self.is_terminated() {
            return Err(RealtimeError::send_failed("connection terminated"));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    fn terminate(&self) {
        self.terminate_now();
    }

    fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }
}
