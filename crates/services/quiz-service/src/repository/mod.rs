//! Repository layer for data access.

pub mod entities;
mod queries;
mod quiz_repository;

pub use queries::QuizQueries;
pub use quiz_repository::{QuizRepository, QuizStore};

#[cfg(any(test, feature = "test-utils"))]
pub use quiz_repository::MockQuizRepository;
