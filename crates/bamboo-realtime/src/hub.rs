//! Topic subscriptions and fan-out.

use std::collections::{HashMap, HashSet};
use std::fmt;

use dashmap::DashMap;
use tracing::warn;

use crate::connection::{ConnectionId, SharedConnection};

/// Publish/subscribe hub shared by every connection.
///
/// Keeps both directions of the relation: the members of each topic and
/// the topics of each connection, so a closing connection can leave all of
/// its topics at once.
#[derive(Default)]
pub struct TopicHub {
    topics: DashMap<String, HashMap<ConnectionId, SharedConnection>>,
    memberships: DashMap<ConnectionId, HashSet<String>>,
}

impl fmt::Debug for TopicHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicHub")
            .field("topics", &self.topics.len())
            .field("connections", &self.memberships.len())
            .finish()
    }
}

impl TopicHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `conn` to `topic`. Returns `false` if it already was.
    pub fn subscribe(&self, topic: &str, conn: &SharedConnection) -> bool {
        let id = conn.id();
        let added = self
            .topics
            .entry(topic.to_string())
            .or_default()
            .insert(id, conn.clone())
            .is_none();
        self.memberships
            .entry(id)
            .or_default()
            .insert(topic.to_string());
        added
    }

    /// Removes `id` from `topic`. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, topic: &str, id: ConnectionId) -> bool {
        let removed = self
            .topics
            .get_mut(topic)
            .is_some_and(|mut members| members.remove(&id).is_some());
        self.topics.remove_if(topic, |_, members| members.is_empty());

        if let Some(mut topics) = self.memberships.get_mut(&id) {
            topics.remove(topic);
        }
        self.memberships.remove_if(&id, |_, topics| topics.is_empty());
        removed
    }

    /// Removes `id` from every topic. Returns how many it left.
    pub fn unsubscribe_all(&self, id: ConnectionId) -> usize {
        let Some((_, topics)) = self.memberships.remove(&id) else {
            return 0;
        };
        for topic in &topics {
            if let Some(mut members) = self.topics.get_mut(topic) {
                members.remove(&id);
            }
            self.topics.remove_if(topic, |_, members| members.is_empty());
        }
        topics.len()
    }

    /// Returns `true` if `id` is subscribed to `topic`.
    pub fn is_subscribed(&self, topic: &str, id: ConnectionId) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|members| members.contains_key(&id))
    }

    /// Topics `id` is subscribed to, sorted.
    pub fn topics_of(&self, id: ConnectionId) -> Vec<String> {
        let mut topics: Vec<String> = self
            .memberships
            .get(&id)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default();
        topics.sort();
        topics
    }

    /// Number of connections subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |members| members.len())
    }

    /// Sends `frame` to every subscriber of `topic` except `except`.
    ///
    /// Returns the number of connections the frame was handed to. Delivery
    /// failures are logged and skipped.
    pub fn publish(&self, topic: &str, frame: &str, except: Option<ConnectionId>) -> usize {
        let recipients: Vec<SharedConnection> = self
            .topics
            .get(topic)
            .map(|members| {
                members
                    .iter()
                    .filter(|(id, _)| Some(**id) != except)
                    .map(|(_, conn)| conn.clone())
                    .collect()
            })
            .unwrap_or_default();

        let mut delivered = 0;
        for conn in recipients {
            match conn.send(frame.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    topic = %topic,
                    connection_id = %conn.id(),
                    error = %e,
                    "failed to deliver published frame"
                ),
            }
        }
        delivered
    }
}
