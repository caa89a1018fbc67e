//! Storage adapter contract.

use std::fmt;
use std::sync::Arc;

use bamboo_core::BoxFuture;

use crate::record::RateLimitRecord;

/// Shared handle to a storage adapter.
pub type SharedStore = Arc<dyn StorageAdapter>;

/// Backend holding rate limit records.
///
/// Every operation may suspend, so a local map and a remote key-value store
/// satisfy the same interface. None of them can fail: an implementation
/// logs backend errors and answers `None` from [`get`](Self::get).
pub trait StorageAdapter: Send + Sync + fmt::Debug {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Reads the record for `key`.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<RateLimitRecord>>;

    /// Writes the record for `key`.
    fn set<'a>(&'a self, key: &'a str, record: RateLimitRecord) -> BoxFuture<'a, ()>;

    /// Removes the record for `key`.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()>;

    /// Drops records whose window has elapsed at `now_ms`.
    ///
    /// Returns how many were removed. Backends that expire entries on their
    /// own return 0.
    fn cleanup(&self, now_ms: u64) -> BoxFuture<'_, usize>;

    /// Applies one hit to `key` and returns the updated record.
    ///
    /// The provided implementation reads, advances and writes back, which is
    /// not atomic: concurrent hits can be under-counted. Adapters with an
    /// atomic primitive override it.
    fn track<'a>(
        &'a self,
        key: &'a str,
        interval_ms: u64,
        now_ms: u64,
    ) -> BoxFuture<'a, RateLimitRecord> {
        Box::pin(async move {
            let record = match self.get(key).await {
                Some(existing) => existing.advance(now_ms, interval_ms),
                None => RateLimitRecord::first(now_ms, interval_ms),
            };
            self.set(key, record).await;
            record
        })
    }
}
