//! Quiz domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_OPTION_LENGTH, MIN_QUIZ_ORDER};
use crate::error::{DomainError, DomainResult};

/// A single binary-choice question, ordered within its quiz set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub quiz_set_id: i64,
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    /// Position within the quiz set, unique per set, starting at 1
    pub quiz_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    /// Update the question text
    pub fn update_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.touch();
    }

    /// Update the first answer option
    pub fn update_option_a(&mut self, option_a: impl Into<String>) {
        self.option_a = option_a.into();
        self.touch();
    }

    /// Update the second answer option
    pub fn update_option_b(&mut self, option_b: impl Into<String>) {
        self.option_b = option_b.into();
        self.touch();
    }

    /// Update both answer options at once
    pub fn update_options(&mut self, option_a: impl Into<String>, option_b: impl Into<String>) {
        self.option_a = option_a.into();
        self.option_b = option_b.into();
        self.touch();
    }

    /// Move the quiz to another position within its set
    pub fn update_quiz_order(&mut self, quiz_order: i32) {
        self.quiz_order = quiz_order;
        self.touch();
    }

    /// Text of the chosen answer: `true` selects option A, `false` option B.
    pub fn answer_text(&self, choice: bool) -> &str {
        if choice {
            &self.option_a
        } else {
            &self.option_b
        }
    }

    /// Check field-level invariants.
    pub fn validate(&self) -> DomainResult<()> {
        validate_fields(
            self.quiz_set_id,
            &self.text,
            &self.option_a,
            &self.option_b,
            self.quiz_order,
        )
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Quiz creation data transfer object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuiz {
    /// Owning quiz set
    pub quiz_set_id: i64,
    /// Question text
    pub text: String,
    /// First answer option (at most 255 characters)
    pub option_a: String,
    /// Second answer option (at most 255 characters)
    pub option_b: String,
    /// Requested position within the set
    pub quiz_order: i32,
}

impl CreateQuiz {
    pub fn new(
        quiz_set_id: i64,
        text: impl Into<String>,
        option_a: impl Into<String>,
        option_b: impl Into<String>,
        quiz_order: i32,
    ) -> Self {
        Self {
            quiz_set_id,
            text: text.into(),
            option_a: option_a.into(),
            option_b: option_b.into(),
            quiz_order,
        }
    }

    /// Check field-level invariants.
    pub fn validate(&self) -> DomainResult<()> {
        validate_fields(
            self.quiz_set_id,
            &self.text,
            &self.option_a,
            &self.option_b,
            self.quiz_order,
        )
    }
}

/// Reject non-positive quiz identifiers.
pub fn validate_quiz_id(id: i64) -> DomainResult<()> {
    if id <= 0 {
        return Err(DomainError::InvalidId);
    }
    Ok(())
}

/// Reject non-positive quiz set identifiers.
pub fn validate_quiz_set_id(quiz_set_id: i64) -> DomainResult<()> {
    if quiz_set_id <= 0 {
        return Err(DomainError::validation("invalid quiz set ID for quiz"));
    }
    Ok(())
}

fn validate_fields(
    quiz_set_id: i64,
    text: &str,
    option_a: &str,
    option_b: &str,
    quiz_order: i32,
) -> DomainResult<()> {
    validate_quiz_set_id(quiz_set_id)?;
    if text.is_empty() {
        return Err(DomainError::validation("quiz text is required"));
    }
    if option_a.is_empty() {
        return Err(DomainError::validation("quiz option A is required"));
    }
    if option_b.is_empty() {
        return Err(DomainError::validation("quiz option B is required"));
    }
    if option_a.chars().count() > MAX_OPTION_LENGTH {
        return Err(DomainError::validation(format!(
            "quiz option A is too long (maximum {} characters)",
            MAX_OPTION_LENGTH
        )));
    }
    if option_b.chars().count() > MAX_OPTION_LENGTH {
        return Err(DomainError::validation(format!(
            "quiz option B is too long (maximum {} characters)",
            MAX_OPTION_LENGTH
        )));
    }
    if quiz_order < MIN_QUIZ_ORDER {
        return Err(DomainError::validation("quiz order must be positive"));
    }
    Ok(())
}
