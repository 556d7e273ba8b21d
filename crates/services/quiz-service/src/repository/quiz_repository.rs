//! Cache-aside quiz repository.
//!
//! Reads try the cache first and fall back to the database; writes run in a
//! single transaction and, once committed, delete every cache entry they may
//! have made stale (the item keys and all list pages of the quiz set).
//! Cache failures never fail a request whose data came from the database.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CacheStore;
use crate::infra::{Persistence, UnitOfWork};
use common::{AppError, AppResult, CacheError, OptionExt};
use domain::{
    item_cache_key, list_cache_key, list_cache_pattern, validate_quiz_id, validate_quiz_set_id,
    CreateQuiz, PageRequest, Quiz, DEFAULT_QUIZ_CACHE_TTL_SECONDS,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Quiz repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert one quiz; its order must be free in the quiz set
    async fn create(&self, input: CreateQuiz) -> AppResult<Quiz>;

    /// Insert quizzes of one quiz set atomically, returned in input order
    async fn create_batch(&self, inputs: Vec<CreateQuiz>) -> AppResult<Vec<Quiz>>;

    async fn get_by_id(&self, id: i64) -> AppResult<Quiz>;

    /// All quizzes of a set, ascending by order
    async fn get_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<Vec<Quiz>>;

    /// One page of a set and the set's total size
    async fn get_by_quiz_set_id_paginated(
        &self,
        quiz_set_id: i64,
        page: i64,
        page_size: i64,
    ) -> AppResult<(Vec<Quiz>, u64)>;

    /// Replace text, options and order. The quiz set cannot change.
    async fn update(&self, quiz: Quiz) -> AppResult<Quiz>;

    async fn update_text(&self, id: i64, text: String) -> AppResult<Quiz>;

    async fn update_option_a(&self, id: i64, option_a: String) -> AppResult<Quiz>;

    async fn update_option_b(&self, id: i64, option_b: String) -> AppResult<Quiz>;

    async fn update_options(&self, id: i64, option_a: String, option_b: String) -> AppResult<Quiz>;

    async fn update_quiz_order(&self, id: i64, quiz_order: i32) -> AppResult<Quiz>;

    async fn delete(&self, id: i64) -> AppResult<()>;

    /// Delete a whole quiz set. Returns how many quizzes were removed.
    async fn delete_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<u64>;

    /// Give `ordered_ids[i]` the order `i + 1`
    async fn reorder_quizzes(&self, quiz_set_id: i64, ordered_ids: Vec<i64>) -> AppResult<()>;

    async fn count(&self) -> AppResult<u64>;

    async fn count_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<u64>;

    async fn exists(&self, id: i64) -> AppResult<bool>;

    /// Highest order in the set, 0 for an empty set
    async fn get_max_order_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<i32>;

    /// Case-insensitive substring search over question text
    async fn search_by_text(
        &self,
        pattern: &str,
        page: i64,
        page_size: i64,
    ) -> AppResult<(Vec<Quiz>, u64)>;
}

/// Concrete implementation of QuizRepository
pub struct QuizStore<U: UnitOfWork = Persistence> {
    uow: Arc<U>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl<U: UnitOfWork> QuizStore<U> {
    pub fn new(uow: Arc<U>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            uow,
            cache,
            ttl: Duration::from_secs(DEFAULT_QUIZ_CACHE_TTL_SECONDS),
        }
    }

    /// Override the TTL applied to cached entries. Zero disables expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read and decode a cached value. Any failure reads as a miss.
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw,
            Err(CacheError::Miss) => {
                tracing::debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, using database");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                if let Err(e) = self.cache.delete(key).await {
                    tracing::warn!(key = %key, error = %e, "Failed to delete cache entry");
                }
                None
            }
        }
    }

    /// Best-effort cache population after a database read.
    async fn fill_cache<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, &payload, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Failed to populate cache");
        }
    }

    /// Drop the item keys of `quiz_ids` and every list page of the set.
    /// Failures are logged; the entries then age out through their TTL.
    async fn invalidate(&self, quiz_set_id: i64, quiz_ids: &[i64]) {
        let keys: Vec<String> = quiz_ids.iter().map(|id| item_cache_key(*id)).collect();
        let results = join_all(keys.iter().map(|key| self.cache.delete(key))).await;
        for (key, result) in keys.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(key = %key, error = %e, "Failed to invalidate cache entry");
            }
        }

        let pattern = list_cache_pattern(quiz_set_id);
        match self.cache.delete_by_pattern(&pattern).await {
            Ok(deleted) => {
                tracing::debug!(pattern = %pattern, deleted, "Invalidated quiz set list pages");
            }
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Failed to invalidate list pages");
            }
        }
    }

    /// Load a quiz inside a transaction, change it, re-check its invariants
    /// and write it back.
    async fn modify<F>(&self, id: i64, apply: F) -> AppResult<Quiz>
    where
        F: FnOnce(&mut Quiz) -> AppResult<()> + Send + 'static,
    {
        validate_quiz_id(id)?;

        let quiz = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let queries = ctx.quizzes();
                    let mut quiz = queries.find_by_id(id).await?.ok_or_not_found()?;
                    let previous_order = quiz.quiz_order;

                    apply(&mut quiz)?;
                    quiz.validate()?;

                    if quiz.quiz_order != previous_order {
                        let taken = queries
                            .taken_orders(quiz.quiz_set_id, &[quiz.quiz_order], Some(id))
                            .await?;
                        if !taken.is_empty() {
                            return Err(order_taken(quiz.quiz_set_id, quiz.quiz_order));
                        }
                    }

                    queries.update(&quiz).await
                })
            })
            .await?;

        tracing::info!(quiz_id = id, quiz_set_id = quiz.quiz_set_id, "Quiz updated");
        self.invalidate(quiz.quiz_set_id, &[id]).await;

        Ok(quiz)
    }
}

#[async_trait]
impl<U: UnitOfWork> QuizRepository for QuizStore<U> {
    async fn create(&self, input: CreateQuiz) -> AppResult<Quiz> {
        input.validate()?;

        let quiz = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let queries = ctx.quizzes();
                    let taken = queries
                        .taken_orders(input.quiz_set_id, &[input.quiz_order], None)
                        .await?;
                    if !taken.is_empty() {
                        return Err(order_taken(input.quiz_set_id, input.quiz_order));
                    }
                    queries.insert(input, Utc::now()).await
                })
            })
            .await?;

        tracing::info!(
            quiz_id = quiz.id,
            quiz_set_id = quiz.quiz_set_id,
            quiz_order = quiz.quiz_order,
            "Quiz created"
        );
        self.invalidate(quiz.quiz_set_id, &[]).await;

        Ok(quiz)
    }

    async fn create_batch(&self, inputs: Vec<CreateQuiz>) -> AppResult<Vec<Quiz>> {
        let quiz_set_id = match inputs.first() {
            Some(first) => first.quiz_set_id,
            None => return Ok(Vec::new()),
        };

        for input in &inputs {
            input.validate()?;
        }
        if inputs.iter().any(|input| input.quiz_set_id != quiz_set_id) {
            return Err(AppError::validation(
                "all quizzes in a batch must belong to the same quiz set",
            ));
        }

        let mut orders = Vec::with_capacity(inputs.len());
        let mut seen = HashSet::with_capacity(inputs.len());
        for input in &inputs {
            if !seen.insert(input.quiz_order) {
                return Err(AppError::order_conflict(format!(
                    "quiz order {} appears more than once in the batch",
                    input.quiz_order
                )));
            }
            orders.push(input.quiz_order);
        }

        let created = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let queries = ctx.quizzes();
                    let taken = queries.taken_orders(quiz_set_id, &orders, None).await?;
                    if let Some(order) = taken.first() {
                        return Err(order_taken(quiz_set_id, *order));
                    }

                    let now = Utc::now();
                    let mut created = Vec::with_capacity(inputs.len());
                    for input in inputs {
                        created.push(queries.insert(input, now).await?);
                    }
                    Ok(created)
                })
            })
            .await?;

        tracing::info!(quiz_set_id, count = created.len(), "Quiz batch created");
        self.invalidate(quiz_set_id, &[]).await;

        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Quiz> {
        validate_quiz_id(id)?;

        let key = item_cache_key(id);
        if let Some(quiz) = self.cached::<Quiz>(&key).await {
            return Ok(quiz);
        }

        let quiz = self.uow.quizzes().find_by_id(id).await?.ok_or_not_found()?;
        self.fill_cache(&key, &quiz).await;

        Ok(quiz)
    }

    async fn get_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<Vec<Quiz>> {
        validate_quiz_set_id(quiz_set_id)?;
        self.uow.quizzes().find_by_quiz_set_id(quiz_set_id).await
    }

    async fn get_by_quiz_set_id_paginated(
        &self,
        quiz_set_id: i64,
        page: i64,
        page_size: i64,
    ) -> AppResult<(Vec<Quiz>, u64)> {
        validate_quiz_set_id(quiz_set_id)?;
        let page = PageRequest::new(page, page_size)?;
        let queries = self.uow.quizzes();

        let key = list_cache_key(quiz_set_id, page.page(), page.page_size());
        let items = match self.cached::<Vec<Quiz>>(&key).await {
            Some(items) => items,
            None => {
                let items = queries.find_page_by_quiz_set_id(quiz_set_id, page).await?;
                self.fill_cache(&key, &items).await;
                items
            }
        };

        // Counts are never cached
        let total = queries.count_by_quiz_set_id(quiz_set_id).await?;

        Ok((items, total))
    }

    async fn update(&self, quiz: Quiz) -> AppResult<Quiz> {
        validate_quiz_id(quiz.id)?;
        quiz.validate()?;

        let id = quiz.id;
        self.modify(id, move |current| {
            if current.quiz_set_id != quiz.quiz_set_id {
                return Err(AppError::validation("quiz set of a quiz cannot be changed"));
            }
            current.text = quiz.text;
            current.option_a = quiz.option_a;
            current.option_b = quiz.option_b;
            current.quiz_order = quiz.quiz_order;
            current.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    async fn update_text(&self, id: i64, text: String) -> AppResult<Quiz> {
        self.modify(id, move |quiz| {
            quiz.update_text(text);
            Ok(())
        })
        .await
    }

    async fn update_option_a(&self, id: i64, option_a: String) -> AppResult<Quiz> {
        self.modify(id, move |quiz| {
            quiz.update_option_a(option_a);
            Ok(())
        })
        .await
    }

    async fn update_option_b(&self, id: i64, option_b: String) -> AppResult<Quiz> {
        self.modify(id, move |quiz| {
            quiz.update_option_b(option_b);
            Ok(())
        })
        .await
    }

    async fn update_options(&self, id: i64, option_a: String, option_b: String) -> AppResult<Quiz> {
        self.modify(id, move |quiz| {
            quiz.update_options(option_a, option_b);
            Ok(())
        })
        .await
    }

    async fn update_quiz_order(&self, id: i64, quiz_order: i32) -> AppResult<Quiz> {
        self.modify(id, move |quiz| {
            quiz.update_quiz_order(quiz_order);
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        validate_quiz_id(id)?;

        let quiz_set_id = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let queries = ctx.quizzes();
                    let quiz = queries.find_by_id(id).await?.ok_or_not_found()?;
                    queries.delete_by_id(id).await?;
                    Ok::<_, AppError>(quiz.quiz_set_id)
                })
            })
            .await?;

        tracing::info!(quiz_id = id, quiz_set_id, "Quiz deleted");
        self.invalidate(quiz_set_id, &[id]).await;

        Ok(())
    }

    async fn delete_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<u64> {
        validate_quiz_set_id(quiz_set_id)?;

        let (ids, deleted) = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let queries = ctx.quizzes();
                    let ids = queries.ids_by_quiz_set_id(quiz_set_id).await?;
                    let deleted = queries.delete_by_quiz_set_id(quiz_set_id).await?;
                    Ok::<_, AppError>((ids, deleted))
                })
            })
            .await?;

        tracing::info!(quiz_set_id, deleted, "Quiz set deleted");
        self.invalidate(quiz_set_id, &ids).await;

        Ok(deleted)
    }

    async fn reorder_quizzes(&self, quiz_set_id: i64, ordered_ids: Vec<i64>) -> AppResult<()> {
        validate_quiz_set_id(quiz_set_id)?;

        let mut seen = HashSet::with_capacity(ordered_ids.len());
        if let Some(duplicate) = ordered_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(AppError::validation(format!(
                "quiz ID {} appears more than once in the new order",
                duplicate
            )));
        }
        if ordered_ids.is_empty() {
            return Ok(());
        }
        if i32::try_from(ordered_ids.len()).is_err() {
            return Err(AppError::validation("too many quizzes to reorder"));
        }

        let moved = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let queries = ctx.quizzes();
                    let current: HashMap<i64, i32> = queries
                        .find_by_quiz_set_id(quiz_set_id)
                        .await?
                        .into_iter()
                        .map(|quiz| (quiz.id, quiz.quiz_order))
                        .collect();

                    if let Some(missing) = ordered_ids.iter().find(|id| !current.contains_key(*id)) {
                        tracing::debug!(quiz_id = *missing, quiz_set_id, "Quiz not in quiz set");
                        return Err(AppError::NotFound);
                    }

                    let targets: Vec<(i64, i32)> = ordered_ids
                        .iter()
                        .zip(1..)
                        .map(|(id, order)| (*id, order))
                        .collect();

                    let listed: HashSet<i64> = ordered_ids.iter().copied().collect();
                    let held_by_unlisted: HashSet<i32> = current
                        .iter()
                        .filter(|(id, _)| !listed.contains(*id))
                        .map(|(_, order)| *order)
                        .collect();
                    if let Some((_, order)) =
                        targets.iter().find(|(_, order)| held_by_unlisted.contains(order))
                    {
                        return Err(order_taken(quiz_set_id, *order));
                    }

                    // Rows already in place are left alone
                    let moves: Vec<(i64, i32)> = targets
                        .into_iter()
                        .filter(|(id, order)| current.get(id) != Some(order))
                        .collect();

                    // Park moving rows on distinct negative orders first so no
                    // statement ever collides with a row that has yet to move
                    let now = Utc::now();
                    for ((id, _), parking) in moves.iter().zip(1..) {
                        queries.set_order(*id, -parking, now).await?;
                    }
                    for (id, order) in &moves {
                        queries.set_order(*id, *order, now).await?;
                    }

                    Ok(moves.into_iter().map(|(id, _)| id).collect::<Vec<i64>>())
                })
            })
            .await?;

        if !moved.is_empty() {
            tracing::info!(quiz_set_id, moved = moved.len(), "Quiz set reordered");
            self.invalidate(quiz_set_id, &moved).await;
        }

        Ok(())
    }

    async fn count(&self) -> AppResult<u64> {
        self.uow.quizzes().count().await
    }

    async fn count_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<u64> {
        validate_quiz_set_id(quiz_set_id)?;
        self.uow.quizzes().count_by_quiz_set_id(quiz_set_id).await
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        if validate_quiz_id(id).is_err() {
            return Ok(false);
        }
        self.uow.quizzes().exists(id).await
    }

    async fn get_max_order_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<i32> {
        validate_quiz_set_id(quiz_set_id)?;
        self.uow.quizzes().max_order(quiz_set_id).await
    }

    async fn search_by_text(
        &self,
        pattern: &str,
        page: i64,
        page_size: i64,
    ) -> AppResult<(Vec<Quiz>, u64)> {
        if pattern.trim().is_empty() {
            return Err(AppError::validation("search pattern is required"));
        }
        let page = PageRequest::new(page, page_size)?;
        self.uow.quizzes().search_by_text(pattern, page).await
    }
}

fn order_taken(quiz_set_id: i64, quiz_order: i32) -> AppError {
    AppError::order_conflict(format!(
        "quiz order {} is already taken in quiz set {}",
        quiz_order, quiz_set_id
    ))
}
