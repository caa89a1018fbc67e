//! The runtime-facing connection handle.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::RealtimeResult;

/// A unique identifier for a WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new time-ordered connection ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Shared handle to a live connection.
pub type SharedConnection = Arc<dyn Connection>;

/// A connection owned by the network runtime.
///
/// The runtime does the framing and I/O; the registry only needs to push
/// text frames and close the socket. `send` must not block: runtimes
/// usually hand the frame to a per-connection outbound queue.
pub trait Connection: Send + Sync + fmt::Debug {
    /// Stable identifier of this connection.
    fn id(&self) -> ConnectionId;

    /// Token supplied on the upgrade URL, if any.
    fn token(&self) -> Option<&str>;

    /// Queues a text frame for delivery.
    fn send(&self, text: String) -> RealtimeResult<()>;

    /// Closes the connection immediately.
    fn terminate(&self);

    /// Address of the peer, when known.
    fn remote_addr(&self) -> Option<IpAddr> {
        None
    }
}
