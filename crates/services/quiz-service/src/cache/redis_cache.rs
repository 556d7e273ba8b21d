//! Redis cache implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};

use common::{CacheConfig, CacheError, CacheResult};

use super::{ensure_key, ensure_pattern, CacheStore};

/// Keys requested per SCAN round trip
const SCAN_BATCH_SIZE: u64 = 1000;

/// Redis cache wrapper with a shared, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis.
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.as_str()).map_err(cache_error)?;
        let connection = ConnectionManager::new(client).await.map_err(cache_error)?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        ensure_key(key)?;
        let mut conn = self.connection.clone();

        tracing::debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Setting cache key");

        if ttl.is_zero() {
            conn.set::<_, _, ()>(key, value).await.map_err(cache_error)?;
        } else {
            // Millisecond precision; never round a short TTL down to "no expiry"
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            conn.pset_ex::<_, _, ()>(key, value, millis)
                .await
                .map_err(cache_error)?;
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<String> {
        ensure_key(key)?;
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(key).await.map_err(cache_error)?;
        match value {
            Some(value) => Ok(value),
            None => {
                tracing::debug!(key = %key, "Cache miss");
                Err(CacheError::Miss)
            }
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        ensure_key(key)?;
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await.map_err(cache_error)?;
        Ok(())
    }

    /// Walks the keyspace with SCAN so large keyspaces never block Redis,
    /// deleting each batch as it arrives.
    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        ensure_pattern(pattern)?;
        let mut conn = self.connection.clone();

        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE)
                .query_async(&mut conn)
                .await
                .map_err(cache_error)?;

            if !keys.is_empty() {
                let removed: u64 = conn.del(&keys).await.map_err(cache_error)?;
                deleted += removed;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        tracing::debug!(pattern = %pattern, deleted, "Deleted cache keys by pattern");
        Ok(deleted)
    }
}

/// Convert Redis error to CacheError.
fn cache_error(e: RedisError) -> CacheError {
    tracing::error!("Redis error: {}", e);
    CacheError::from(e)
}
