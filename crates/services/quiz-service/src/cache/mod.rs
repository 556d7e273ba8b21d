//! Key-value cache primitive used by the quiz repository.
//!
//! The cache only ever holds disposable projections of rows that live in
//! the database. Every entry may disappear at any time; callers must treat
//! `CacheError::Miss` as an ordinary outcome and fall back to the store.
//!
//! Two backends:
//! - [`RedisCache`]: networked Redis through a multiplexed `ConnectionManager`
//! - [`MemoryCache`]: in-process map with the same semantics, for tests and local runs

mod memory_cache;
mod redis_cache;

use std::time::Duration;

use async_trait::async_trait;

use common::{CacheError, CacheResult};

pub use memory_cache::MemoryCache;
pub use redis_cache::RedisCache;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Minimal cache surface: string keys, string values, optional expiry.
///
/// No operation retries internally.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store `value` under `key`. A zero `ttl` keeps the entry until it is
    /// deleted or evicted.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Fetch the value stored under `key`.
    ///
    /// Returns `CacheError::Miss` when the key is absent or expired.
    async fn get(&self, key: &str) -> CacheResult<String>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Remove every key matching the Redis glob `pattern`
    /// (`*`, `?`, `[...]`, `\` escapes).
    /// Returns how many keys were removed.
    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<u64>;
}

pub(crate) fn ensure_key(key: &str) -> CacheResult<()> {
    if key.is_empty() {
        return Err(CacheError::invalid_argument("key cannot be empty"));
    }
    Ok(())
}

pub(crate) fn ensure_pattern(pattern: &str) -> CacheResult<()> {
    if pattern.is_empty() {
        return Err(CacheError::invalid_argument("pattern cannot be empty"));
    }
    Ok(())
}
