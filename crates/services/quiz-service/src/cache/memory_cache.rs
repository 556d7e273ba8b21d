//! In-process cache with the same contract as the Redis backend.

use std::collections::HashMap;
use std::str::Chars;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;

use common::{CacheError, CacheResult};

use super::{ensure_key, ensure_pattern, CacheStore};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// HashMap-backed cache. Expired entries are dropped lazily.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        ensure_key(key)?;
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };

        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<String> {
        ensure_key(key)?;
        let now = Instant::now();

        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                Err(CacheError::Miss)
            }
            None => Err(CacheError::Miss),
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        ensure_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        ensure_pattern(pattern)?;
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();

        let mut entries = self.entries.write().await;
        let mut deleted = 0;
        entries.retain(|key, entry| {
            if !matcher.is_match(key) {
                return true;
            }
            if entry.is_live(now) {
                deleted += 1;
            }
            false
        });
        Ok(deleted)
    }
}

/// Translate a Redis glob into an anchored regex.
///
/// Supports `*`, `?`, `\` escapes and `[...]` classes with `^` negation and
/// `a-z` ranges. As in Redis, an unterminated class runs to the end of the
/// pattern and a reversed range matches like its swapped form.
fn glob_to_regex(pattern: &str) -> CacheResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push_str("(?s)^");

    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            '\\' => push_literal(&mut expr, chars.next().unwrap_or('\\')),
            '[' => push_class(&mut expr, &mut chars),
            other => push_literal(&mut expr, other),
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| {
        CacheError::invalid_argument(format!("invalid pattern '{}': {}", pattern, e))
    })
}

fn push_literal(expr: &mut String, ch: char) {
    expr.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
}

/// Consume a class body (after the opening `[`) and append its regex form.
fn push_class(expr: &mut String, chars: &mut Chars<'_>) {
    let negated = chars.as_str().starts_with('^');
    if negated {
        chars.next();
    }

    let mut members = String::new();
    while let Some(ch) = chars.next() {
        match ch {
            ']' => break,
            '\\' => push_literal(&mut members, chars.next().unwrap_or('\\')),
            start => {
                let mut rest = chars.as_str().chars();
                match (rest.next(), rest.next()) {
                    (Some('-'), Some(end)) => {
                        chars.next();
                        chars.next();
                        let (low, high) = if start <= end { (start, end) } else { (end, start) };
                        push_literal(&mut members, low);
                        members.push('-');
                        push_literal(&mut members, high);
                    }
                    _ => push_literal(&mut members, start),
                }
            }
        }
    }

    match (members.is_empty(), negated) {
        (true, true) => expr.push('.'),
        // `[]` matches nothing
        (true, false) => expr.push_str("(?:$.)"),
        (false, true) => {
            expr.push_str("[^");
            expr.push_str(&members);
            expr.push(']');
        }
        (false, false) => {
            expr.push('[');
            expr.push_str(&members);
            expr.push(']');
        }
    }
}
