//! Quiz service configuration.

use std::env;
use std::time::Duration;

use common::{CacheConfig, DatabaseConfig};

/// Quiz service configuration.
#[derive(Debug, Clone, Default)]
pub struct QuizServiceConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
}

impl QuizServiceConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database: DatabaseConfig {
                url: env::var("QUIZ_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.database.url),
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(defaults.database.max_connections),
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or(defaults.database.min_connections),
            },
            cache: CacheConfig {
                url: env::var("QUIZ_SERVICE_REDIS_URL")
                    .or_else(|_| env::var("REDIS_URL"))
                    .unwrap_or(defaults.cache.url),
                default_ttl_seconds: parse_var("QUIZ_CACHE_TTL_SECONDS")
                    .unwrap_or(defaults.cache.default_ttl_seconds),
            },
        }
    }

    /// TTL applied to cached quizzes and list pages
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.default_ttl_seconds)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}
