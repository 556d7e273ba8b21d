//! Domain layer - Core quiz entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! The cache key-space lives here too, so every service builds keys the same way.

pub mod constants;
pub mod error;
pub mod pagination;
pub mod quiz;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use pagination::PageRequest;
pub use quiz::{validate_quiz_id, validate_quiz_set_id, CreateQuiz, Quiz};
