//! Domain-level constants.
//!
//! These constants define business rules, validation limits and the
//! cache key-space shared by every component that touches quizzes.

// =============================================================================
// Validation
// =============================================================================

/// Maximum length of an answer option, in characters
pub const MAX_OPTION_LENGTH: usize = 255;

/// Lowest valid quiz order within a quiz set
pub const MIN_QUIZ_ORDER: i32 = 1;

// =============================================================================
// Pagination
// =============================================================================

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum allowed items per page to prevent excessive queries
pub const MAX_PAGE_SIZE: u64 = 100;

/// First page number (1-indexed)
pub const FIRST_PAGE: u64 = 1;

// =============================================================================
// Cache key-space
// =============================================================================

/// Cache key prefix for a single quiz: `item:{id}`
pub const CACHE_PREFIX_ITEM: &str = "item:";

/// Cache key prefix for quiz set listings: `group:{quiz_set_id}:list:{page}:{page_size}`
pub const CACHE_PREFIX_GROUP: &str = "group:";

/// Segment separating the quiz set id from the page coordinates
pub const CACHE_LIST_SEGMENT: &str = ":list:";

/// Default TTL for cached quizzes and pages, in seconds.
///
/// Kept short: it is the upper bound on staleness when an invalidation
/// fails or races with a concurrent read.
pub const DEFAULT_QUIZ_CACHE_TTL_SECONDS: u64 = 300;

/// Build the cache key of a single quiz.
pub fn item_cache_key(id: i64) -> String {
    format!("{}{}", CACHE_PREFIX_ITEM, id)
}

/// Build the cache key of one listing page of a quiz set.
pub fn list_cache_key(quiz_set_id: i64, page: u64, page_size: u64) -> String {
    format!(
        "{}{}{}{}:{}",
        CACHE_PREFIX_GROUP, quiz_set_id, CACHE_LIST_SEGMENT, page, page_size
    )
}

/// Glob pattern matching every listing page of a quiz set.
pub fn list_cache_pattern(quiz_set_id: i64) -> String {
    format!("{}{}{}*", CACHE_PREFIX_GROUP, quiz_set_id, CACHE_LIST_SEGMENT)
}
