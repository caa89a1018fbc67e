//! In-process storage.

use dashmap::DashMap;

use bamboo_core::BoxFuture;

use crate::adapter::StorageAdapter;
use crate::record::RateLimitRecord;

/// Records kept in a concurrent map.
///
/// [`track`](StorageAdapter::track) updates each key under the map's shard
/// lock, so concurrent hits on one context are never lost.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl StorageAdapter for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<RateLimitRecord>> {
        Box::pin(async move { self.records.get(key).map(|r| *r) })
    }

    fn set<'a>(&'a self, key: &'a str, record: RateLimitRecord) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.records.insert(key.to_string(), record);
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.records.remove(key);
        })
    }

    fn cleanup(&self, now_ms: u64) -> BoxFuture<'_, usize> {
        Box::pin(async move {
            let before = self.records.len();
            self.records.retain(|_, record| !record.is_expired(now_ms));
            before.saturating_sub(self.records.len())
        })
    }

    fn track<'a>(
        &'a self,
        key: &'a str,
        interval_ms: u64,
        now_ms: u64,
    ) -> BoxFuture<'a, RateLimitRecord> {
        Box::pin(async move {
            let mut entry = self
                .records
                .entry(key.to_string())
                .or_insert_with(|| RateLimitRecord {
                    current: 0,
                    timestamp: now_ms,
                    interval: interval_ms,
                });
            let updated = entry.advance(now_ms, interval_ms);
            *entry = updated;
            updated
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_set_delete() {
        let store = MemoryStore::new();
        assert!(store.get("k").await.is_none());

        store.set("k", RateLimitRecord::first(10, 100)).await;
        assert_eq!(store.get("k").await, Some(RateLimitRecord::first(10, 100)));
        assert_eq!(store.len(), 1);

        store.delete("k").await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_track_counts_and_resets() {
        let store = MemoryStore::new();
        assert_eq!(store.track("k", 1_000, 0).await.current, 1);
        assert_eq!(store.track("k", 1_000, 10).await.current, 2);
        assert_eq!(store.track("k", 1_000, 999).await.current, 3);

        let reset = store.track("k", 1_000, 1_000).await;
        assert_eq!(reset, RateLimitRecord::first(1_000, 1_000));
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_only() {
        let store = MemoryStore::new();
        store.set("old", RateLimitRecord::first(0, 100)).await;
        store.set("fresh", RateLimitRecord::first(150, 100)).await;

        assert_eq!(store.cleanup(200).await, 1);
        assert!(store.get("old").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_track_is_exact() {
        let store = Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    store.track("hot", 60_000, 1).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.get("hot").await.unwrap().current, 400);
    }
}
