use super::{CounterStore, CounterStoreError};
use async_trait::async_trait;
use dashmap::DashMap;

/// Process-local ordered-set store implementing the same four primitives as
/// the networked backend. Used for local development, tests, and
/// single-instance deployments where a separate counter-store process is
/// unnecessary overhead.
///
/// Each key's ordered set is a plain `Vec<(score, member)>` guarded by
/// DashMap's per-shard locking — adequate because the sets involved are
/// bounded by `limit`, never large.
#[derive(Default)]
pub struct InMemoryCounterStore {
    sets: DashMap<String, Vec<(f64, String)>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self {
            sets: DashMap::new(),
        }
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn evict_insert_count_expire(
        &self,
        key: &str,
        now: f64,
        window_secs: u64,
        member: &str,
    ) -> Result<u64, CounterStoreError> {
        let window_start = now - window_secs as f64;
        let mut entry = self.sets.entry(key.to_string()).or_default();
        entry.retain(|(score, _)| *score > window_start);
        entry.push((now, member.to_string()));
        let count = entry.iter().filter(|(score, _)| *score >= window_start).count() as u64;
        Ok(count)
    }

    async fn count(&self, key: &str, now: f64, window_secs: u64) -> Result<u64, CounterStoreError> {
        let window_start = now - window_secs as f64;
        let count = self
            .sets
            .get(key)
            .map(|set| set.iter().filter(|(score, _)| *score >= window_start).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<(), CounterStoreError> {
        self.sets.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_evict_insert_count_roundtrip() {
        let store = InMemoryCounterStore::new();
        let c1 = store
            .evict_insert_count_expire("k", 100.0, 60, "m1")
            .await
            .unwrap();
        assert_eq!(c1, 1);
        let c2 = store
            .evict_insert_count_expire("k", 101.0, 60, "m2")
            .await
            .unwrap();
        assert_eq!(c2, 2);
    }

    #[tokio::test]
    async fn test_entries_outside_window_are_evicted() {
        let store = InMemoryCounterStore::new();
        store
            .evict_insert_count_expire("k", 100.0, 60, "m1")
            .await
            .unwrap();
        let c = store
            .evict_insert_count_expire("k", 200.0, 60, "m2")
            .await
            .unwrap();
        assert_eq!(c, 1, "entry from t=100 must be evicted by t=200 with a 60s window");
    }

    #[tokio::test]
    async fn test_count_is_read_only() {
        let store = InMemoryCounterStore::new();
        store
            .evict_insert_count_expire("k", 100.0, 60, "m1")
            .await
            .unwrap();
        assert_eq!(store.count("k", 110.0, 60).await.unwrap(), 1);
        assert_eq!(store.count("k", 110.0, 60).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_prefix_only_affects_matching_keys() {
        let store = InMemoryCounterStore::new();
        store
            .evict_insert_count_expire("rate_limit:/a:1.1.1.1", 1.0, 60, "m1")
            .await
            .unwrap();
        store
            .evict_insert_count_expire("rate_limit:/b:1.1.1.1", 1.0, 60, "m1")
            .await
            .unwrap();
        store.clear_prefix("rate_limit:/a:").await.unwrap();
        assert_eq!(store.count("rate_limit:/a:1.1.1.1", 1.0, 60).await.unwrap(), 0);
        assert_eq!(store.count("rate_limit:/b:1.1.1.1", 1.0, 60).await.unwrap(), 1);
    }
}
