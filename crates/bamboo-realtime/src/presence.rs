//! Who is in which room, and since when.
//!
//! Room membership itself is a topic subscription in the [`TopicHub`]; this
//! tracker adds the identity and join time of each member so a room can be
//! listed and its members told when someone arrives or goes.
//!
//! [`TopicHub`]: crate::TopicHub

use std::collections::HashMap;
use std::fmt;

use dashmap::DashMap;
use serde::Serialize;

use bamboo_core::SharedClock;

use crate::connection::ConnectionId;
use crate::session::Session;

/// Event broadcast to a room when a member arrives.
pub const PRESENCE_JOIN_EVENT: &str = "presence:join";

/// Event broadcast to a room when a member leaves or disconnects.
pub const PRESENCE_LEAVE_EVENT: &str = "presence:leave";

/// One member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceEntry {
    /// The member's token, or its connection id when it has none.
    pub key: String,
    /// When the member joined the room, in ms since the epoch.
    pub online_since: u64,
}

/// Per-room member tracking.
pub struct Presence {
    rooms: DashMap<String, HashMap<ConnectionId, PresenceEntry>>,
    clock: SharedClock,
}

impl fmt::Debug for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presence")
            .field("rooms", &self.rooms.len())
            .finish_non_exhaustive()
    }
}

impl Presence {
    /// Creates an empty tracker stamping joins with `clock`.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            rooms: DashMap::new(),
            clock,
        }
    }

    /// Records `session` as present in `room`.
    ///
    /// Returns the new entry, or `None` if the session was already present
    /// (its first join time is kept) or has been closed.
    pub fn join(&self, room: &str, session: &Session) -> Option<PresenceEntry> {
        if session.is_closed() {
            return None;
        }
        let entry = PresenceEntry {
            key: session
                .token()
                .map_or_else(|| session.id().to_string(), str::to_string),
            online_since: self.clock.now_ms(),
        };
        let added = {
            let mut members = self.rooms.entry(room.to_string()).or_default();
            if members.contains_key(&session.id()) {
                false
            } else {
                members.insert(session.id(), entry.clone());
                true
            }
        };
        if session.is_closed() {
            self.leave(room, session.id());
            return None;
        }
        added.then_some(entry)
    }

    /// Removes connection `id` from `room`, returning its entry.
    pub fn leave(&self, room: &str, id: ConnectionId) -> Option<PresenceEntry> {
        let entry = self
            .rooms
            .get_mut(room)
            .and_then(|mut members| members.remove(&id));
        self.rooms.remove_if(room, |_, members| members.is_empty());
        entry
    }

    /// Removes connection `id` from every room, returning `(room, entry)` pairs.
    pub fn leave_all(&self, id: ConnectionId) -> Vec<(String, PresenceEntry)> {
        let mut left: Vec<(String, PresenceEntry)> = self
            .rooms
            .iter_mut()
            .filter_map(|mut room| {
                let entry = room.value_mut().remove(&id)?;
                Some((room.key().clone(), entry))
            })
            .collect();
        self.rooms.retain(|_, members| !members.is_empty());
        left.sort_by(|a, b| a.0.cmp(&b.0));
        left
    }

    /// Members of `room`, oldest first.
    pub fn members(&self, room: &str) -> Vec<PresenceEntry> {
        let mut members: Vec<PresenceEntry> = self
            .rooms
            .get(room)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        members.sort_by(|a, b| {
            a.online_since
                .cmp(&b.online_since)
                .then_with(|| a.key.cmp(&b.key))
        });
        members
    }

    /// Number of members in `room`.
    pub fn count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |m| m.len())
    }

    /// Returns `true` if connection `id` is present in `room`.
    pub fn is_present(&self, room: &str, id: ConnectionId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains_key(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::TopicHub;
    use crate::mock::MockConnection;
    use bamboo_core::ManualClock;
    use std::sync::Arc;
    use std::time::Duration;

    fn tracker() -> (Presence, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (Presence::new(clock.clone()), clock)
    }

    fn session(conn: MockConnection) -> Session {
        Session::new(Arc::new(conn), Arc::new(TopicHub::new()), 0)
    }

    #[test]
    fn test_join_keeps_first_timestamp() {
        let (presence, clock) = tracker();
        let ada = session(MockConnection::with_token("ada"));

        let entry = presence.join("lobby", &ada).unwrap();
        assert_eq!(entry, PresenceEntry { key: "ada".into(), online_since: 1_000 });

        clock.advance(Duration::from_millis(500));
        assert!(presence.join("lobby", &ada).is_none());
        assert_eq!(presence.members("lobby")[0].online_since, 1_000);
    }

    #[test]
    fn test_members_oldest_first() {
        let (presence, clock) = tracker();
        let late = session(MockConnection::with_token("b"));
        let early = session(MockConnection::with_token("a"));
        presence.join("lobby", &early);
        clock.advance(Duration::from_millis(10));
        presence.join("lobby", &late);

        let keys: Vec<String> = presence.members("lobby").into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(presence.count("lobby"), 2);
    }

    #[test]
    fn test_tokenless_member_keyed_by_connection() {
        let (presence, _) = tracker();
        let anon = session(MockConnection::new());
        let entry = presence.join("lobby", &anon).unwrap();
        assert_eq!(entry.key, anon.id().to_string());
    }

    #[test]
    fn test_leave_and_leave_all() {
        let (presence, _) = tracker();
        let ada = session(MockConnection::with_token("ada"));
        presence.join("a", &ada);
        presence.join("b", &ada);

        assert!(presence.leave("a", ada.id()).is_some());
        assert!(presence.leave("a", ada.id()).is_none());
        assert!(!presence.is_present("a", ada.id()));

        presence.join("c", &ada);
        let left: Vec<String> = presence.leave_all(ada.id()).into_iter().map(|(r, _)| r).collect();
        assert_eq!(left, vec!["b", "c"]);
        assert_eq!(presence.count("b"), 0);
        assert!(presence.leave_all(ada.id()).is_empty());
    }

    #[test]
    fn test_closed_session_is_not_tracked() {
        let (presence, _) = tracker();
        let ada = session(MockConnection::with_token("ada"));
        ada.close();
        assert!(presence.join("lobby", &ada).is_none());
        assert_eq!(presence.count("lobby"), 0);
    }
}
