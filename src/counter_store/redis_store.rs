use super::{CounterStore, CounterStoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Networked ordered-set backend — the production counter store.
/// `ConnectionManager` transparently reconnects, so a
/// transient network blip surfaces as a `CounterStoreError::Unavailable`
/// rather than a permanently broken client.
pub struct RedisCounterStore {
    manager: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> Result<Self, CounterStoreError> {
        let client = redis::Client::open(url).map_err(|e| CounterStoreError::Other(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| CounterStoreError::Unavailable(e.to_string()))?;
        Ok(Self { manager })
    }
}

fn classify(e: redis::RedisError) -> CounterStoreError {
    if e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() || e.is_io_error() {
        CounterStoreError::Unavailable(e.to_string())
    } else {
        CounterStoreError::Other(e.to_string())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn evict_insert_count_expire(
        &self,
        key: &str,
        now: f64,
        window_secs: u64,
        member: &str,
    ) -> Result<u64, CounterStoreError> {
        let window_start = now - window_secs as f64;
        let mut conn = self.manager.clone();
        let (_, _, count, _): (i64, i64, u64, i64) = redis::pipe()
            .atomic()
            .zrembyscore(key, "-inf", window_start)
            .zadd(key, member, now)
            .zcount(key, window_start, "+inf")
            .expire(key, window_secs as i64)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(count)
    }

    async fn count(&self, key: &str, now: f64, window_secs: u64) -> Result<u64, CounterStoreError> {
        let window_start = now - window_secs as f64;
        let mut conn = self.manager.clone();
        conn.zcount(key, window_start, "+inf").await.map_err(classify)
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<(), CounterStoreError> {
        let mut conn = self.manager.clone();
        let pattern = format!("{prefix}*");
        let keys: Vec<String> = conn.keys(&pattern).await.map_err(classify)?;
        if !keys.is_empty() {
            let _: () = conn.del(keys).await.map_err(classify)?;
        }
        Ok(())
    }
}
