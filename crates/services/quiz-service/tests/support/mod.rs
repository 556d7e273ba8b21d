//! Shared fixtures for repository integration tests.
//!
//! The store is SQLite in memory behind the same SeaORM code paths as
//! PostgreSQL; the cache is either `MemoryCache` or a cache that always fails.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use common::{CacheError, CacheResult, DatabaseConfig};
use domain::{CreateQuiz, Quiz};
use quiz_service_lib::cache::{CacheStore, MemoryCache};
use quiz_service_lib::infra::{Database, Persistence};
use quiz_service_lib::{QuizRepository, QuizStore};

// =============================================================================
// Test Doubles
// =============================================================================

/// Cache whose backend is permanently unreachable.
pub struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn get(&self, _key: &str) -> CacheResult<String> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> CacheResult<u64> {
        Err(CacheError::unavailable("connection refused"))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub struct Fixture {
    pub uow: Arc<Persistence>,
    pub cache: Arc<MemoryCache>,
    pub store: Arc<QuizStore>,
}

/// Fresh migrated in-memory database.
pub async fn sqlite_uow() -> Arc<Persistence> {
    // One connection: every pooled connection would otherwise get its own database
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
    };
    let db = Database::connect(&config)
        .await
        .expect("in-memory database should migrate");
    Arc::new(Persistence::new(db.get_connection()))
}

pub async fn fixture() -> Fixture {
    let uow = sqlite_uow().await;
    let cache = Arc::new(MemoryCache::new());
    let store = Arc::new(QuizStore::new(uow.clone(), cache.clone()));
    Fixture { uow, cache, store }
}

pub fn new_quiz(quiz_set_id: i64, text: &str, quiz_order: i32) -> CreateQuiz {
    CreateQuiz::new(quiz_set_id, text, "Yes", "No", quiz_order)
}

pub async fn create(store: &QuizStore, quiz_set_id: i64, text: &str, quiz_order: i32) -> Quiz {
    store
        .create(new_quiz(quiz_set_id, text, quiz_order))
        .await
        .expect("quiz should be created")
}

/// `(id, quiz_order)` pairs of a set, in order.
pub async fn orders(store: &QuizStore, quiz_set_id: i64) -> Vec<(i64, i32)> {
    store
        .get_by_quiz_set_id(quiz_set_id)
        .await
        .expect("set should be readable")
        .into_iter()
        .map(|quiz| (quiz.id, quiz.quiz_order))
        .collect()
}
