//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod quiz;

pub use quiz::{ActiveModel as QuizActiveModel, Entity as QuizEntity, Model as QuizModel};
