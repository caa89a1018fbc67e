//! Redis-backed storage.

use std::fmt;

use redis::aio::MultiplexedConnection;
use tracing::{error, warn};

use bamboo_core::BoxFuture;

use crate::adapter::StorageAdapter;
use crate::error::RateLimitResult;
use crate::record::RateLimitRecord;

/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "rate_limit:";

/// Extra seconds a record outlives its window before Redis evicts it.
const TTL_GRACE_SECS: u64 = 60;

/// Records stored as JSON strings with a TTL.
///
/// Redis expires keys itself, so [`cleanup`](StorageAdapter::cleanup) is a
/// no-op. Tracking uses the read-modify-write default and may under-count
/// under heavy concurrency.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    prefix: String,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to `url`, e.g. `redis://127.0.0.1:6379`.
    pub async fn connect(url: &str) -> RateLimitResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self::new(conn))
    }

    /// Wraps an existing connection.
    #[must_use]
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Replaces the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, context: &str) -> String {
        format!("{}{context}", self.prefix)
    }

    /// TTL in seconds for a record with the given window.
    #[must_use]
    pub const fn ttl_secs(interval_ms: u64) -> u64 {
        interval_ms.div_ceil(1000) + TTL_GRACE_SECS
    }
}

impl StorageAdapter for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<RateLimitRecord>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let raw: Option<String> = match redis::cmd("GET")
                .arg(self.key(key))
                .query_async(&mut conn)
                .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    error!(key = %key, error = %e, "redis GET failed");
                    return None;
                }
            };
            raw.and_then(|data| match serde_json::from_str(&data) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding malformed rate limit record");
                    None
                }
            })
        })
    }

    fn set<'a>(&'a self, key: &'a str, record: RateLimitRecord) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let data = match serde_json::to_string(&record) {
                Ok(data) => data,
                Err(e) => {
                    error!(key = %key, error = %e, "failed to encode rate limit record");
                    return;
                }
            };
            let mut conn = self.conn.clone();
            let result: redis::RedisResult<()> = redis::cmd("SETEX")
                .arg(self.key(key))
                .arg(Self::ttl_secs(record.interval))
                .arg(data)
                .query_async(&mut conn)
                .await;
            if let Err(e) = result {
                error!(key = %key, error = %e, "redis SETEX failed");
            }
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let result: redis::RedisResult<()> =
                redis::cmd("DEL").arg(self.key(key)).query_async(&mut conn).await;
            if let Err(e) = result {
                error!(key = %key, error = %e, "redis DEL failed");
            }
        })
    }

    fn cleanup(&self, _now_ms: u64) -> BoxFuture<'_, usize> {
        Box::pin(async { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_rounds_up_with_grace() {
        assert_eq!(RedisStore::ttl_secs(60_000), 120);
        assert_eq!(RedisStore::ttl_secs(1_500), 62);
        assert_eq!(RedisStore::ttl_secs(0), 60);
    }
}
