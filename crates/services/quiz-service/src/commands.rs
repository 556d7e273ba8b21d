//! Operator commands behind the CLI.
//!
//! Each command has a backend-agnostic core (tested against fakes) and a thin
//! entry point that loads configuration and connects to the real stores.

use std::fmt;

use tracing::info;

use crate::cache::{CacheStore, RedisCache};
use crate::config::QuizServiceConfig;
use crate::infra::Database;
use crate::repository::QuizRepository;
use common::{AppResult, CacheResult};
use domain::{list_cache_pattern, validate_quiz_set_id, CACHE_PREFIX_GROUP, CACHE_PREFIX_ITEM};

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Which cached entries to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeTarget {
    /// Every cached list page of one quiz set
    QuizSet(i64),
    /// Every quiz and list entry
    All,
}

/// Uncached counters for a quiz set, or for the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizStats {
    pub total: u64,
    pub quiz_set: Option<QuizSetStats>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSetStats {
    pub quiz_set_id: i64,
    pub count: u64,
    pub max_order: i32,
}

impl fmt::Display for QuizStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quizzes: {}", self.total)?;
        if let Some(set) = &self.quiz_set {
            write!(
                f,
                "\nquiz set {}: {} quizzes, max order {}",
                set.quiz_set_id, set.count, set.max_order
            )?;
        }
        Ok(())
    }
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = QuizServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Drop cached entries, e.g. after invalidations failed during an outage.
pub async fn purge(cache: &dyn CacheStore, target: PurgeTarget) -> CacheResult<u64> {
    let patterns = match target {
        PurgeTarget::QuizSet(quiz_set_id) => vec![list_cache_pattern(quiz_set_id)],
        PurgeTarget::All => vec![
            format!("{}*", CACHE_PREFIX_ITEM),
            format!("{}*", CACHE_PREFIX_GROUP),
        ],
    };

    let mut deleted = 0;
    for pattern in &patterns {
        deleted += cache.delete_by_pattern(pattern).await?;
    }
    Ok(deleted)
}

/// Connect to Redis and purge (for CLI commands).
pub async fn run_cache_purge(target: PurgeTarget) -> Result<(), Box<dyn std::error::Error>> {
    if let PurgeTarget::QuizSet(quiz_set_id) = target {
        validate_quiz_set_id(quiz_set_id)?;
    }

    let config = QuizServiceConfig::from_env();
    let cache = RedisCache::connect(&config.cache).await?;

    let deleted = purge(&cache, target).await?;
    info!(?target, deleted, "Cache purged");
    println!("deleted {} cache keys", deleted);

    Ok(())
}

/// Collect counters straight from the store.
pub async fn collect_stats(
    repo: &dyn QuizRepository,
    quiz_set_id: Option<i64>,
) -> AppResult<QuizStats> {
    let total = repo.count().await?;

    let quiz_set = match quiz_set_id {
        Some(quiz_set_id) => Some(QuizSetStats {
            quiz_set_id,
            count: repo.count_by_quiz_set_id(quiz_set_id).await?,
            max_order: repo.get_max_order_by_quiz_set_id(quiz_set_id).await?,
        }),
        None => None,
    };

    Ok(QuizStats { total, quiz_set })
}

/// Connect to both stores and print counters (for CLI commands).
pub async fn run_stats(quiz_set_id: Option<i64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = QuizServiceConfig::from_env();
    let repo = crate::connect_repository(&config).await?;

    let stats = collect_stats(&repo, quiz_set_id).await?;
    println!("{}", stats);

    Ok(())
}
