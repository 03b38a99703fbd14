use crate::counter_store::{rate_limit_key, CounterStore, CounterStoreError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of a single rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed(u64),
    Denied { retry_after_secs: u64 },
}

/// Sliding-window limiter keyed by `(route prefix, client identifier)`,
/// backed by a shared [`CounterStore`]. One instance is shared process-wide;
/// the per-route `limit` and the global `window` are passed in on each call.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    sequence: AtomicU64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            sequence: AtomicU64::new(0),
        }
    }

    /// A strictly-increasing member id, unique within this process — a
    /// microsecond timestamp alone is not quite enough under load, so a
    /// monotonic sequence number is appended to keep members unique under load.
    fn unique_member(&self) -> String {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{micros}-{seq}")
    }

    fn now_secs() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    /// Run the evict→insert→count→expire pipeline and decide allow/deny.
    /// `limit == 0` disables limiting entirely without touching the store.
    /// A store-unreachable error is not surfaced here — see
    /// `proxy::filter::rate_limit`, which classifies `Unavailable` as
    /// fail-open and anything else as a 500.
    pub async fn check(
        &self,
        route_prefix: &str,
        client_id: &str,
        limit: u32,
        window_secs: u64,
    ) -> Result<Decision, CounterStoreError> {
        if limit == 0 {
            return Ok(Decision::Allowed(0));
        }
        let key = rate_limit_key(route_prefix, client_id);
        let now = Self::now_secs();
        let member = self.unique_member();
        let count = self
            .store
            .evict_insert_count_expire(&key, now, window_secs, &member)
            .await?;
        Ok(if count > limit as u64 {
            Decision::Denied {
                retry_after_secs: window_secs,
            }
        } else {
            Decision::Allowed(count)
        })
    }

    /// Post-hoc, read-only count for the `X-RateLimit-Remaining` header,
    /// matching the reference implementation's second-query behavior
    /// after the decision was made, not the count used to make it.
    pub async fn remaining(&self, route_prefix: &str, client_id: &str, limit: u32, window_secs: u64) -> u64 {
        let key = rate_limit_key(route_prefix, client_id);
        let now = Self::now_secs();
        match self.store.count(&key, now, window_secs).await {
            Ok(count) => limit.saturating_sub(count.min(u32::MAX as u64) as u32) as u64,
            Err(_) => limit as u64,
        }
    }

    pub fn reset_secs(window_secs: u64) -> u64 {
        let now = Self::now_secs() as u64;
        window_secs - (now % window_secs)
    }

    pub async fn clear_all(&self) -> Result<(), CounterStoreError> {
        self.store.clear_prefix("rate_limit:").await
    }

    pub async fn clear_route(&self, route_prefix: &str) -> Result<(), CounterStoreError> {
        self.store
            .clear_prefix(&format!("rate_limit:{route_prefix}:"))
            .await
    }
}

/// Derives the client identifier: first token of
/// `X-Forwarded-For`, else the transport remote address, else `"unknown"`.
pub fn client_identifier(forwarded_for: Option<&str>, remote_addr: Option<&str>) -> String {
    if let Some(xff) = forwarded_for {
        if let Some(first) = xff.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.to_string();
        }
    }
    remote_addr.unwrap_or("unknown").to_string()
}
