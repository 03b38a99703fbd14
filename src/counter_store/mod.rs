pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use std::fmt;

/// Failure classification for a counter-store round trip. Distinguishing
/// `Unavailable` from `Other` is what lets the rate limiter fail open on a
/// dead store while still surfacing a 500 for anything else (see
/// `rate_limiter::RateLimiter::check`).
#[derive(Debug)]
pub enum CounterStoreError {
    Unavailable(String),
    Other(String),
}

impl fmt::Display for CounterStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterStoreError::Unavailable(msg) => write!(f, "counter store unavailable: {msg}"),
            CounterStoreError::Other(msg) => write!(f, "counter store error: {msg}"),
        }
    }
}

impl std::error::Error for CounterStoreError {}

/// The four ordered-set primitives the sliding-window rate limiter needs,
/// executed as a single atomic pipeline per call.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// `evict` every member with score ≤ `now - window`, `insert`
    /// `(score = now, member)`, then `count` the cardinality of the set
    /// over `[now - window, +inf)`, and `expire` the key at `window`
    /// seconds. Returns the count *after* the insert.
    async fn evict_insert_count_expire(
        &self,
        key: &str,
        now: f64,
        window_secs: u64,
        member: &str,
    ) -> Result<u64, CounterStoreError>;

    /// A read-only `count` over the same range, used by the rate-limit
    /// rule's post-process phase to compute `X-RateLimit-Remaining` without
    /// re-inserting a member.
    async fn count(&self, key: &str, now: f64, window_secs: u64) -> Result<u64, CounterStoreError>;

    /// Delete every key matching `prefix*`. Used by `POST /admin/clear`
    /// (prefix `""`, i.e. everything) and route mutation (prefix
    /// `rate_limit:{route_prefix}:`).
    async fn clear_prefix(&self, prefix: &str) -> Result<(), CounterStoreError>;
}

pub fn rate_limit_key(route_prefix: &str, client_id: &str) -> String {
    format!("rate_limit:{route_prefix}:{client_id}")
}
