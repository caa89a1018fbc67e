//! Fixed-window behaviour through the public API.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use bamboo_core::ManualClock;
use bamboo_ratelimit::{ip_context, MemoryStore, RateLimitRecord, RateLimiter, StorageAdapter};
use proptest::prelude::*;

fn limiter() -> (Arc<RateLimiter>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), clock.clone());
    (Arc::new(limiter), clock)
}

#[tokio::test]
async fn login_burst_is_blocked_until_window_ends() {
    let (limiter, clock) = limiter();
    let window = Duration::from_secs(60);

    for _ in 0..5 {
        assert!(!limiter.check("login", 5, window).await);
    }
    assert!(limiter.check("login", 5, window).await);
    assert_eq!(limiter.remaining("login", 5).await, 0);

    clock.advance(Duration::from_secs(59));
    assert!(limiter.check("login", 5, window).await);

    clock.advance(Duration::from_secs(1));
    assert!(!limiter.check("login", 5, window).await);
    assert_eq!(limiter.remaining("login", 5).await, 4);
}

#[tokio::test]
async fn addresses_are_counted_separately() {
    let (limiter, _) = limiter();
    let a = ip_context("signup", &IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)));
    let b = ip_context("signup", &IpAddr::V4(Ipv4Addr::new(2, 2, 2, 2)));
    let window = Duration::from_secs(10);

    assert!(!limiter.check(&a, 1, window).await);
    assert!(limiter.check(&a, 1, window).await);
    assert!(!limiter.check(&b, 1, window).await);
}

#[tokio::test]
async fn reset_time_counts_down() {
    let (limiter, clock) = limiter();
    limiter.check("k", 3, Duration::from_millis(3_000)).await;
    clock.advance(Duration::from_millis(1_200));

    assert_eq!(limiter.reset_time("k").await, Duration::from_millis(1_800));
    assert_eq!(limiter.info("k").await.unwrap().reset_time_seconds, 2);
}

/// A store that forgets everything, standing in for an unreachable backend.
#[derive(Debug)]
struct Unreachable;

impl StorageAdapter for Unreachable {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    fn get<'a>(&'a self, _key: &'a str) -> bamboo_core::BoxFuture<'a, Option<RateLimitRecord>> {
        Box::pin(async { None })
    }

    fn set<'a>(&'a self, _key: &'a str, _record: RateLimitRecord) -> bamboo_core::BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    fn delete<'a>(&'a self, _key: &'a str) -> bamboo_core::BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    fn cleanup(&self, _now_ms: u64) -> bamboo_core::BoxFuture<'_, usize> {
        Box::pin(async { 0 })
    }
}

#[tokio::test]
async fn failing_store_never_limits() {
    let limiter = RateLimiter::new(Arc::new(Unreachable), Arc::new(ManualClock::new(0)));
    for _ in 0..10 {
        assert!(!limiter.check("k", 1, Duration::from_secs(1)).await);
    }
}

proptest! {
    /// The stored count always equals the number of hits since the window
    /// last opened, and the window start never moves inside a window.
    #[test]
    fn count_matches_fixed_window_model(
        interval in 1u64..5_000,
        gaps in proptest::collection::vec(0u64..3_000, 1..60),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let (limiter, clock) = limiter();
            let window = Duration::from_millis(interval);
            let mut start: Option<u64> = None;
            let mut count = 0u64;

            for gap in gaps {
                clock.advance(Duration::from_millis(gap));
                let now = bamboo_core::Clock::now_ms(&*clock);
                match start {
                    Some(s) if now - s < interval => count += 1,
                    _ => {
                        start = Some(now);
                        count = 1;
                    }
                }
                let record = limiter.track("p", window).await;
                prop_assert_eq!(record.current, count);
                prop_assert_eq!(Some(record.timestamp), start);
            }
            Ok(())
        })?;
    }
}
