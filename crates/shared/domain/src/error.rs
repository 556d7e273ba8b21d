//! Domain-level errors.
//!
//! These errors represent business rule violations and domain logic failures.
//! They are independent of infrastructure concerns (gRPC, database, cache).

use thiserror::Error;

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed for a field or input
    #[error("{0}")]
    Validation(String),

    /// Quiz identifier is not a positive integer
    #[error("invalid quiz ID")]
    InvalidId,

    /// Page number or page size out of range
    #[error("invalid pagination parameters")]
    InvalidPagination,

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Requested order collides with another quiz of the same set
    #[error("{0}")]
    OrderConflict(String),

    /// Forbidden action
    #[error("Forbidden")]
    Forbidden,

    /// Internal domain error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Create an order conflict error
    pub fn order_conflict(msg: impl Into<String>) -> Self {
        DomainError::OrderConflict(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        DomainError::Internal(msg.into())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
