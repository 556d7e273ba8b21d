//! Quiz Service Library
//!
//! Cache-aside data access for ordered quizzes: PostgreSQL (through SeaORM)
//! holds the truth, Redis holds disposable copies of single quizzes and list
//! pages. Handlers depend on the [`QuizRepository`] trait.

pub mod cache;
pub mod commands;
pub mod config;
pub mod infra;
pub mod repository;

use std::sync::Arc;

use crate::cache::RedisCache;
use crate::config::QuizServiceConfig;
use crate::infra::{Database, Persistence};

pub use crate::cache::{CacheStore, MemoryCache};
pub use crate::commands::{MigrateAction, PurgeTarget};
pub use crate::repository::{QuizRepository, QuizStore};

/// Connect to both stores (running pending migrations) and build the repository.
pub async fn connect_repository(
    config: &QuizServiceConfig,
) -> Result<QuizStore, Box<dyn std::error::Error>> {
    let db = Database::connect(&config.database).await?;
    let cache = RedisCache::connect(&config.cache).await?;

    let uow = Arc::new(Persistence::new(db.get_connection()));
    Ok(QuizStore::new(uow, Arc::new(cache)).with_ttl(config.cache_ttl()))
}
