//! Integration tests for the cache-aside quiz repository.
//!
//! These run the real repository against in-memory SQLite and an in-process
//! cache, so no PostgreSQL or Redis is required.

mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_test::{assert_err, assert_ok};

use common::AppError;
use domain::{item_cache_key, list_cache_key, CreateQuiz, MAX_OPTION_LENGTH};
use quiz_service_lib::cache::CacheStore;
use quiz_service_lib::infra::UnitOfWork;
use quiz_service_lib::{QuizRepository, QuizStore};

use crate::support::{create, fixture, new_quiz, orders, sqlite_uow, FailingCache};

// =============================================================================
// Ordering Scenario
// =============================================================================

#[tokio::test]
async fn test_order_conflict_reorder_and_first_page() {
    let fx = fixture().await;
    let a = create(&fx.store, 7, "A", 1).await;
    let b = create(&fx.store, 7, "B", 2).await;

    let result = fx.store.create(new_quiz(7, "C", 2)).await;
    assert!(matches!(result, Err(AppError::OrderConflict(_))));
    assert_eq!(orders(&fx.store, 7).await, vec![(a.id, 1), (b.id, 2)]);

    assert_ok!(fx.store.reorder_quizzes(7, vec![b.id, a.id]).await);
    assert_eq!(fx.store.get_by_id(a.id).await.unwrap().quiz_order, 2);
    assert_eq!(fx.store.get_by_id(b.id).await.unwrap().quiz_order, 1);

    let (items, total) = fx.store.get_by_quiz_set_id_paginated(7, 1, 1).await.unwrap();
    assert_eq!(items.iter().map(|q| q.id).collect::<Vec<_>>(), vec![b.id]);
    assert_eq!(total, 2);
}

#[tokio::test]
async fn test_same_order_in_different_sets_is_allowed() {
    let fx = fixture().await;
    create(&fx.store, 7, "Set seven", 1).await;
    create(&fx.store, 8, "Set eight", 1).await;

    assert_eq!(fx.store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_concurrent_creates_at_same_order_admit_one() {
    let fx = fixture().await;

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let store = fx.store.clone();
            tokio::spawn(async move {
                store
                    .create(new_quiz(9, &format!("Racer {}", i), 1))
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(AppError::OrderConflict(_)))));
    assert_eq!(fx.store.count_by_quiz_set_id(9).await.unwrap(), 1);
}

// =============================================================================
// Batch Creation
// =============================================================================

#[tokio::test]
async fn test_batch_returns_items_in_input_order() {
    let fx = fixture().await;

    let created = fx
        .store
        .create_batch(vec![new_quiz(3, "Third", 3), new_quiz(3, "First", 1), new_quiz(3, "Second", 2)])
        .await
        .unwrap();

    let texts: Vec<_> = created.iter().map(|q| q.text.as_str()).collect();
    assert_eq!(texts, vec!["Third", "First", "Second"]);
    assert!(created.iter().all(|q| q.id > 0 && q.created_at == q.updated_at));

    let stored: Vec<_> = fx
        .store
        .get_by_quiz_set_id(3)
        .await
        .unwrap()
        .into_iter()
        .map(|q| q.text)
        .collect();
    assert_eq!(stored, vec!["First", "Second", "Third"]);
}

#[tokio::test]
async fn test_batch_with_internal_collision_writes_nothing() {
    let fx = fixture().await;
    let existing = create(&fx.store, 7, "Existing", 1).await;

    let result = fx
        .store
        .create_batch(vec![new_quiz(7, "X", 2), new_quiz(7, "Y", 3), new_quiz(7, "Z", 2)])
        .await;

    assert!(matches!(result, Err(AppError::OrderConflict(_))));
    assert_eq!(orders(&fx.store, 7).await, vec![(existing.id, 1)]);
}

#[tokio::test]
async fn test_batch_colliding_with_stored_row_writes_nothing() {
    let fx = fixture().await;
    let existing = create(&fx.store, 7, "Existing", 3).await;

    let result = fx
        .store
        .create_batch(vec![new_quiz(7, "X", 1), new_quiz(7, "Y", 2), new_quiz(7, "Z", 3)])
        .await;

    assert!(matches!(result, Err(AppError::OrderConflict(_))));
    assert_eq!(orders(&fx.store, 7).await, vec![(existing.id, 3)]);
}

#[tokio::test]
async fn test_batch_rejects_mixed_sets_and_accepts_empty() {
    let fx = fixture().await;

    let result = fx
        .store
        .create_batch(vec![new_quiz(7, "X", 1), new_quiz(8, "Y", 2)])
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let created = assert_ok!(fx.store.create_batch(Vec::new()).await);
    assert!(created.is_empty());
    assert_eq!(fx.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_batch_rejects_invalid_member() {
    let fx = fixture().await;

    let result = fx
        .store
        .create_batch(vec![new_quiz(7, "Fine", 1), CreateQuiz::new(7, "", "Yes", "No", 2)])
        .await;

    assert!(matches!(result, Err(AppError::Validation(msg)) if msg == "quiz text is required"));
    assert_eq!(fx.store.count().await.unwrap(), 0);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_create_validates_fields() {
    let fx = fixture().await;

    let at_limit = "é".repeat(MAX_OPTION_LENGTH);
    let over_limit = "é".repeat(MAX_OPTION_LENGTH + 1);

    assert_ok!(
        fx.store
            .create(CreateQuiz::new(7, "Long options", at_limit.clone(), at_limit, 1))
            .await
    );

    let result = fx
        .store
        .create(CreateQuiz::new(7, "Too long", over_limit, "No", 2))
        .await;
    assert!(matches!(
        result,
        Err(AppError::Validation(msg)) if msg == "quiz option A is too long (maximum 255 characters)"
    ));

    let result = fx.store.create(new_quiz(7, "Zero", 0)).await;
    assert!(matches!(result, Err(AppError::Validation(msg)) if msg == "quiz order must be positive"));

    let result = fx.store.create(new_quiz(0, "No set", 1)).await;
    assert!(matches!(result, Err(AppError::Validation(msg)) if msg == "invalid quiz set ID for quiz"));
}

#[tokio::test]
async fn test_invalid_ids_and_pagination() {
    let fx = fixture().await;

    assert!(matches!(fx.store.get_by_id(0).await, Err(AppError::InvalidId)));
    assert!(matches!(fx.store.get_by_id(-3).await, Err(AppError::InvalidId)));
    assert!(matches!(fx.store.delete(0).await, Err(AppError::InvalidId)));
    assert!(matches!(
        fx.store.update_text(-1, "x".to_string()).await,
        Err(AppError::InvalidId)
    ));

    assert!(!fx.store.exists(0).await.unwrap());
    assert!(!fx.store.exists(12345).await.unwrap());

    for (page, page_size) in [(0, 10), (1, 0), (-1, 5), (1, 101)] {
        let result = fx.store.get_by_quiz_set_id_paginated(7, page, page_size).await;
        assert!(matches!(result, Err(AppError::InvalidPagination)));

        let result = fx.store.search_by_text("quiz", page, page_size).await;
        assert!(matches!(result, Err(AppError::InvalidPagination)));
    }

    assert!(matches!(fx.store.get_by_id(999).await, Err(AppError::NotFound)));
    assert!(matches!(fx.store.delete(999).await, Err(AppError::NotFound)));
}

// =============================================================================
// Cache-Aside Behavior
// =============================================================================

#[tokio::test]
async fn test_update_invalidates_item_populated_before_direct_store_change() {
    let fx = fixture().await;
    let quiz = create(&fx.store, 7, "Original", 1).await;

    // Populate the cache
    fx.store.get_by_id(quiz.id).await.unwrap();
    assert_ok!(fx.cache.get(&item_cache_key(quiz.id)).await);

    // Change the row behind the repository's back
    let mut changed = quiz.clone();
    changed.text = "Changed directly".to_string();
    fx.uow.quizzes().update(&changed).await.unwrap();

    // Still served from the cache
    assert_eq!(fx.store.get_by_id(quiz.id).await.unwrap().text, "Original");

    fx.store
        .update_options(quiz.id, "Left".to_string(), "Right".to_string())
        .await
        .unwrap();

    let fresh = fx.store.get_by_id(quiz.id).await.unwrap();
    assert_eq!(fresh.text, "Changed directly");
    assert_eq!((fresh.option_a.as_str(), fresh.option_b.as_str()), ("Left", "Right"));
}

#[tokio::test]
async fn test_delete_invalidates_cached_item() {
    let fx = fixture().await;
    let quiz = create(&fx.store, 7, "Doomed", 1).await;
    fx.store.get_by_id(quiz.id).await.unwrap();

    fx.store.delete(quiz.id).await.unwrap();

    assert!(matches!(fx.store.get_by_id(quiz.id).await, Err(AppError::NotFound)));
    assert!(fx.cache.get(&item_cache_key(quiz.id)).await.unwrap_err().is_miss());
}

#[tokio::test]
async fn test_writes_invalidate_cached_pages() {
    let fx = fixture().await;
    create(&fx.store, 7, "One", 1).await;

    let (items, _) = fx.store.get_by_quiz_set_id_paginated(7, 1, 10).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_ok!(fx.cache.get(&list_cache_key(7, 1, 10)).await);

    create(&fx.store, 7, "Two", 2).await;
    assert_err!(fx.cache.get(&list_cache_key(7, 1, 10)).await);

    let (items, total) = fx.store.get_by_quiz_set_id_paginated(7, 1, 10).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(total, 2);
}

#[tokio::test]
async fn test_writes_leave_other_sets_cached() {
    let fx = fixture().await;
    create(&fx.store, 7, "Seven", 1).await;
    create(&fx.store, 8, "Eight", 1).await;
    fx.store.get_by_quiz_set_id_paginated(8, 1, 10).await.unwrap();

    create(&fx.store, 7, "Seven again", 2).await;

    assert_ok!(fx.cache.get(&list_cache_key(8, 1, 10)).await);
}

#[tokio::test]
async fn test_undecodable_cache_entry_falls_back_to_store() {
    let fx = fixture().await;
    let quiz = create(&fx.store, 7, "Sturdy", 1).await;
    let key = item_cache_key(quiz.id);
    fx.cache.set(&key, "garbage", Duration::ZERO).await.unwrap();

    assert_eq!(fx.store.get_by_id(quiz.id).await.unwrap(), quiz);

    // Replaced by a decodable copy
    let repaired = fx.cache.get(&key).await.unwrap();
    assert_eq!(serde_json::from_str::<domain::Quiz>(&repaired).unwrap(), quiz);
}

#[tokio::test]
async fn test_cached_entries_expire_with_ttl() {
    let uow = sqlite_uow().await;
    let cache = Arc::new(quiz_service_lib::MemoryCache::new());
    let store = QuizStore::new(uow.clone(), cache.clone()).with_ttl(Duration::from_millis(50));

    let quiz = create(&store, 7, "Short lived", 1).await;
    store.get_by_id(quiz.id).await.unwrap();

    let mut changed = quiz.clone();
    changed.text = "Changed directly".to_string();
    uow.quizzes().update(&changed).await.unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(store.get_by_id(quiz.id).await.unwrap().text, "Changed directly");
}

#[tokio::test]
async fn test_unreachable_cache_never_fails_requests() {
    let uow = sqlite_uow().await;
    let store = QuizStore::new(uow, Arc::new(FailingCache));

    let a = create(&store, 7, "A", 1).await;
    let b = create(&store, 7, "B", 2).await;

    assert_eq!(store.get_by_id(a.id).await.unwrap(), a);
    let (items, total) = store.get_by_quiz_set_id_paginated(7, 1, 10).await.unwrap();
    assert_eq!(items, vec![a.clone(), b.clone()]);
    assert_eq!(total, 2);

    assert_ok!(store.update_text(a.id, "A2".to_string()).await);
    assert_ok!(store.reorder_quizzes(7, vec![b.id, a.id]).await);
    assert_ok!(store.delete(b.id).await);
    assert_eq!(store.delete_by_quiz_set_id(7).await.unwrap(), 1);
}

// =============================================================================
// Updates
// =============================================================================

#[tokio::test]
async fn test_field_updates_refresh_updated_at() {
    let fx = fixture().await;
    let quiz = create(&fx.store, 7, "Before", 1).await;

    let updated = fx.store.update_text(quiz.id, "After".to_string()).await.unwrap();
    assert_eq!(updated.text, "After");
    assert_eq!(updated.created_at, quiz.created_at);
    assert!(updated.updated_at >= quiz.updated_at);

    let updated = fx.store.update_option_a(quiz.id, "Sure".to_string()).await.unwrap();
    assert_eq!(updated.option_a, "Sure");

    let updated = fx.store.update_option_b(quiz.id, "Nope".to_string()).await.unwrap();
    assert_eq!(updated.option_b, "Nope");

    let result = fx.store.update_option_b(quiz.id, String::new()).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(fx.store.get_by_id(quiz.id).await.unwrap().option_b, "Nope");
}

#[tokio::test]
async fn test_order_changes_are_checked() {
    let fx = fixture().await;
    let a = create(&fx.store, 7, "A", 1).await;
    create(&fx.store, 7, "B", 2).await;

    let result = fx.store.update_quiz_order(a.id, 2).await;
    assert!(matches!(result, Err(AppError::OrderConflict(_))));

    let moved = fx.store.update_quiz_order(a.id, 5).await.unwrap();
    assert_eq!(moved.quiz_order, 5);
    assert_eq!(fx.store.get_max_order_by_quiz_set_id(7).await.unwrap(), 5);

    // Full replace keeping its own order is not a conflict
    let mut replacement = moved.clone();
    replacement.text = "A, revised".to_string();
    let replaced = fx.store.update(replacement).await.unwrap();
    assert_eq!(replaced.text, "A, revised");
    assert_eq!(replaced.quiz_order, 5);

    let mut other_set = replaced.clone();
    other_set.quiz_set_id = 8;
    assert!(matches!(
        fx.store.update(other_set).await,
        Err(AppError::Validation(_))
    ));
}

// =============================================================================
// Reordering
// =============================================================================

#[tokio::test]
async fn test_reorder_is_deterministic_and_idempotent() {
    let fx = fixture().await;
    let q1 = create(&fx.store, 7, "One", 1).await;
    let q2 = create(&fx.store, 7, "Two", 2).await;
    let q3 = create(&fx.store, 7, "Three", 3).await;

    fx.store
        .reorder_quizzes(7, vec![q3.id, q1.id, q2.id])
        .await
        .unwrap();
    let first = fx.store.get_by_quiz_set_id(7).await.unwrap();
    assert_eq!(
        first.iter().map(|q| (q.id, q.quiz_order)).collect::<Vec<_>>(),
        vec![(q3.id, 1), (q1.id, 2), (q2.id, 3)]
    );

    fx.store
        .reorder_quizzes(7, vec![q3.id, q1.id, q2.id])
        .await
        .unwrap();
    let second = fx.store.get_by_quiz_set_id(7).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_reorder_invalidates_moved_items() {
    let fx = fixture().await;
    let a = create(&fx.store, 7, "A", 1).await;
    let b = create(&fx.store, 7, "B", 2).await;
    fx.store.get_by_id(a.id).await.unwrap();
    fx.store.get_by_id(b.id).await.unwrap();

    fx.store.reorder_quizzes(7, vec![b.id, a.id]).await.unwrap();

    assert_err!(fx.cache.get(&item_cache_key(a.id)).await);
    assert_err!(fx.cache.get(&item_cache_key(b.id)).await);
}

#[tokio::test]
async fn test_reorder_rejections_leave_state_unchanged() {
    let fx = fixture().await;
    let a = create(&fx.store, 7, "A", 1).await;
    let b = create(&fx.store, 7, "B", 2).await;
    let foreign = create(&fx.store, 8, "Foreign", 1).await;
    let before = orders(&fx.store, 7).await;

    let result = fx.store.reorder_quizzes(7, vec![b.id, foreign.id]).await;
    assert!(matches!(result, Err(AppError::NotFound)));

    let result = fx.store.reorder_quizzes(7, vec![a.id, a.id]).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    // A is already first; unlisted B keeps its place
    assert_ok!(fx.store.reorder_quizzes(7, vec![a.id]).await);
    assert_eq!(orders(&fx.store, 7).await, before);

    // Order 2 is held by B, which is not part of the new order
    let c = create(&fx.store, 7, "C", 3).await;
    let result = fx.store.reorder_quizzes(7, vec![c.id, a.id]).await;
    assert!(matches!(result, Err(AppError::OrderConflict(_))));
    assert_eq!(
        orders(&fx.store, 7).await,
        vec![(a.id, 1), (b.id, 2), (c.id, 3)]
    );

    assert_ok!(fx.store.reorder_quizzes(7, Vec::new()).await);
}

// =============================================================================
// Listing, Counting and Search
// =============================================================================

#[tokio::test]
async fn test_pages_concatenate_to_full_set() {
    let fx = fixture().await;
    let inputs: Vec<_> = (1..=7)
        .rev()
        .map(|order| new_quiz(5, &format!("Quiz {}", order), order))
        .collect();
    fx.store.create_batch(inputs).await.unwrap();

    let full = fx.store.get_by_quiz_set_id(5).await.unwrap();
    assert_eq!(
        full.iter().map(|q| q.quiz_order).collect::<Vec<_>>(),
        (1..=7).collect::<Vec<_>>()
    );

    let mut paged = Vec::new();
    for page in 1..=3 {
        let (items, total) = fx.store.get_by_quiz_set_id_paginated(5, page, 3).await.unwrap();
        assert_eq!(total, 7);
        paged.extend(items);
    }
    assert_eq!(paged, full);

    let (beyond, total) = fx.store.get_by_quiz_set_id_paginated(5, 4, 3).await.unwrap();
    assert!(beyond.is_empty());
    assert_eq!(total, 7);

    let unique: HashSet<i64> = paged.iter().map(|q| q.id).collect();
    assert_eq!(unique.len(), 7);
}

#[tokio::test]
async fn test_far_pages_are_empty() {
    let fx = fixture().await;
    create(&fx.store, 7, "Only quiz", 1).await;

    for page_size in [1, 100] {
        let (items, total) = assert_ok!(
            fx.store
                .get_by_quiz_set_id_paginated(7, i64::MAX, page_size)
                .await
        );
        assert!(items.is_empty());
        assert_eq!(total, 1);

        let (items, total) = assert_ok!(fx.store.search_by_text("quiz", i64::MAX, page_size).await);
        assert!(items.is_empty());
        assert_eq!(total, 1);
    }

    // The first page is unaffected by the cached far page
    let (items, _) = assert_ok!(fx.store.get_by_quiz_set_id_paginated(7, 1, 100).await);
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_empty_set_reads() {
    let fx = fixture().await;

    assert!(fx.store.get_by_quiz_set_id(42).await.unwrap().is_empty());
    assert_eq!(fx.store.count_by_quiz_set_id(42).await.unwrap(), 0);
    assert_eq!(fx.store.get_max_order_by_quiz_set_id(42).await.unwrap(), 0);

    let (items, total) = fx.store.get_by_quiz_set_id_paginated(42, 1, 20).await.unwrap();
    assert!(items.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_counts_exists_and_max_order() {
    let fx = fixture().await;
    let a = create(&fx.store, 7, "A", 2).await;
    create(&fx.store, 7, "B", 9).await;
    create(&fx.store, 8, "C", 4).await;

    assert_eq!(fx.store.count().await.unwrap(), 3);
    assert_eq!(fx.store.count_by_quiz_set_id(7).await.unwrap(), 2);
    assert_eq!(fx.store.get_max_order_by_quiz_set_id(7).await.unwrap(), 9);
    assert_eq!(fx.store.get_max_order_by_quiz_set_id(8).await.unwrap(), 4);
    assert!(fx.store.exists(a.id).await.unwrap());

    fx.store.delete(a.id).await.unwrap();
    assert!(!fx.store.exists(a.id).await.unwrap());
}

#[tokio::test]
async fn test_delete_by_quiz_set_is_idempotent() {
    let fx = fixture().await;
    let a = create(&fx.store, 7, "A", 1).await;
    create(&fx.store, 7, "B", 2).await;
    let other = create(&fx.store, 8, "Other", 1).await;
    fx.store.get_by_id(a.id).await.unwrap();

    assert_eq!(fx.store.delete_by_quiz_set_id(7).await.unwrap(), 2);
    assert_eq!(fx.store.delete_by_quiz_set_id(7).await.unwrap(), 0);
    assert_eq!(fx.store.delete_by_quiz_set_id(7).await.unwrap(), 0);

    assert!(fx.cache.get(&item_cache_key(a.id)).await.unwrap_err().is_miss());
    assert!(matches!(fx.store.get_by_id(a.id).await, Err(AppError::NotFound)));
    assert!(fx.store.exists(other.id).await.unwrap());
}

#[tokio::test]
async fn test_search_by_text() {
    let fx = fixture().await;
    fx.store
        .create_batch(vec![
            new_quiz(2, "Is 100% juice healthy?", 1),
            new_quiz(2, "Do you like JUICE?", 2),
        ])
        .await
        .unwrap();
    create(&fx.store, 1, "Orange juice or apple juice?", 1).await;
    create(&fx.store, 1, "Snake_case or camelCase?", 2).await;

    let (items, total) = fx.store.search_by_text("juice", 1, 10).await.unwrap();
    assert_eq!(total, 3);
    let found: Vec<_> = items.iter().map(|q| (q.quiz_set_id, q.quiz_order)).collect();
    assert_eq!(found, vec![(1, 1), (2, 1), (2, 2)]);

    let (items, total) = fx.store.search_by_text("juice", 2, 2).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(items.len(), 1);

    // Wildcard characters match literally
    let (items, _) = fx.store.search_by_text("100%", 1, 10).await.unwrap();
    assert_eq!(items.len(), 1);
    let (items, _) = fx.store.search_by_text("e_c", 1, 10).await.unwrap();
    assert_eq!(items.len(), 1);
    let (items, total) = fx.store.search_by_text("%", 1, 10).await.unwrap();
    assert_eq!((items.len(), total), (1, 1));

    let (items, total) = fx.store.search_by_text("nothing like this", 1, 10).await.unwrap();
    assert!(items.is_empty());
    assert_eq!(total, 0);

    assert!(matches!(
        fx.store.search_by_text("   ", 1, 10).await,
        Err(AppError::Validation(_))
    ));
}
