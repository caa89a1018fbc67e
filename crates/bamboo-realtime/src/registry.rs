//! Token-deduplicated session registry.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::connection::{ConnectionId, SharedConnection};
use crate::hub::TopicHub;
use crate::session::Session;

/// Why a connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another live connection already holds the token.
    DuplicateToken,
    /// No token was supplied and one is required.
    MissingToken,
}

impl Rejection {
    /// Short label for logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateToken => "duplicate_token",
            Self::MissingToken => "missing_token",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live sessions, at most one per token.
///
/// A newcomer with a token already in use is refused; the existing session
/// is never replaced.
#[derive(Default)]
pub struct SessionRegistry {
    tokens: DashMap<String, ConnectionId>,
    sessions: DashMap<ConnectionId, Arc<Session>>,
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `conn` or says why not.
    ///
    /// The token is claimed atomically, so two concurrent opens with the same
    /// token cannot both succeed.
    pub fn admit(
        &self,
        conn: SharedConnection,
        hub: Arc<TopicHub>,
        require_token: bool,
        now_ms: u64,
    ) -> Result<Arc<Session>, Rejection> {
        let id = conn.id();
        match conn.token().map(str::to_string) {
            None if require_token => Err(Rejection::MissingToken),
            None => {
                let session = Arc::new(Session::new(conn, hub, now_ms));
                self.sessions.insert(id, Arc::clone(&session));
                Ok(session)
            }
            Some(token) => match self.tokens.entry(token) {
                Entry::Occupied(_) => Err(Rejection::DuplicateToken),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                    let session = Arc::new(Session::new(conn, hub, now_ms));
                    self.sessions.insert(id, Arc::clone(&session));
                    Ok(session)
                }
            },
        }
    }

    /// Removes the session of connection `id`.
    ///
    /// The token entry is only released when it still points at `id`.
    /// Returns `None` if `id` never had a session.
    pub fn release(&self, id: ConnectionId) -> Option<Arc<Session>> {
        let (_, session) = self.sessions.remove(&id)?;
        if let Some(token) = session.token() {
            self.tokens.remove_if(token, |_, owner| *owner == id);
        }
        Some(session)
    }

    /// Session of connection `id`.
    pub fn get(&self, id: ConnectionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|s| Arc::clone(&s))
    }

    /// Session that holds `token`.
    pub fn by_token(&self, token: &str) -> Option<Arc<Session>> {
        let id = *self.tokens.get(token)?;
        self.get(id)
    }

    /// Returns `true` if a live session holds `token`.
    pub fn is_connected(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes and returns every session.
    pub fn drain(&self) -> Vec<Arc<Session>> {
        let ids: Vec<ConnectionId> = self.sessions.iter().map(|e| *e.key()).collect();
        ids.into_iter().filter_map(|id| self.release(id)).collect()
    }
}
