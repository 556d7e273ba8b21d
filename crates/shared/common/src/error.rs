//! Unified error handling for the quiz data-access layer.
//!
//! Provides a single error type that can be:
//! - classified into a small, stable set of kinds (`ErrorKind`)
//! - converted to Tonic gRPC status codes for handlers built on top
//!
//! Cache failures have their own type (`CacheError`) because a cache miss
//! is an expected outcome every caller branches on, not a failure.

use domain::DomainError;
use thiserror::Error;
use tonic::Status;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authorization (propagated from upstream, never generated here)
    #[error("Access denied")]
    Forbidden,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0}")]
    OrderConflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    #[error("invalid quiz ID")]
    InvalidId,

    #[error("invalid pagination parameters")]
    InvalidPagination,

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(sea_orm::DbErr),

    #[error("Service unavailable")]
    Unavailable(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Coarse error classification shared with every consumer of the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    OrderConflict,
    PermissionDenied,
    Unavailable,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::OrderConflict => "order_conflict",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

impl AppError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::InvalidId | AppError::InvalidPagination => {
                ErrorKind::InvalidArgument
            }
            AppError::NotFound => ErrorKind::NotFound,
            AppError::OrderConflict(_) => ErrorKind::OrderConflict,
            AppError::Forbidden => ErrorKind::PermissionDenied,
            AppError::Unavailable(_) => ErrorKind::Unavailable,
            #[cfg(feature = "database")]
            AppError::Database(_) => ErrorKind::Internal,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a read may be retried with backoff.
    ///
    /// Writes should not be retried blindly: there are no idempotency keys.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }

    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound => "NOT_FOUND",
            AppError::OrderConflict(_) => "ORDER_CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidId => "INVALID_ID",
            AppError::InvalidPagination => "INVALID_PAGINATION",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),
            AppError::OrderConflict(msg) => msg.clone(),

            // Hide details for internal errors
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Unavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                "A backing store is unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// gRPC Status (Tonic)
// =============================================================================

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        let code = match err.kind() {
            ErrorKind::InvalidArgument => tonic::Code::InvalidArgument,
            ErrorKind::NotFound => tonic::Code::NotFound,
            ErrorKind::OrderConflict => tonic::Code::AlreadyExists,
            ErrorKind::PermissionDenied => tonic::Code::PermissionDenied,
            ErrorKind::Unavailable => tonic::Code::Unavailable,
            ErrorKind::Internal => tonic::Code::Internal,
        };

        Status::new(code, err.user_message())
    }
}

impl From<Status> for AppError {
    fn from(status: Status) -> Self {
        match status.code() {
            tonic::Code::Unauthenticated | tonic::Code::PermissionDenied => AppError::Forbidden,
            tonic::Code::NotFound => AppError::NotFound,
            tonic::Code::AlreadyExists => AppError::OrderConflict(status.message().to_string()),
            tonic::Code::InvalidArgument => AppError::Validation(status.message().to_string()),
            tonic::Code::Unavailable => AppError::Unavailable(status.message().to_string()),
            _ => AppError::Internal(status.message().to_string()),
        }
    }
}

// =============================================================================
// Domain / Store / Cache Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::InvalidId => AppError::InvalidId,
            DomainError::InvalidPagination => AppError::InvalidPagination,
            DomainError::NotFound(_) => AppError::NotFound,
            DomainError::OrderConflict(msg) => AppError::OrderConflict(msg),
            DomainError::Forbidden => AppError::Forbidden,
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        // Pool exhaustion and dropped connections are worth retrying
        if matches!(
            err,
            sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_)
        ) {
            return AppError::Unavailable(err.to_string());
        }
        AppError::Database(err)
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Miss => AppError::NotFound,
            CacheError::InvalidArgument(msg) => AppError::Validation(msg),
            CacheError::Unavailable(msg) => AppError::Unavailable(msg),
        }
    }
}

/// Cache operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is absent or expired
    #[error("cache miss: key not found or expired")]
    Miss,

    #[error("{0}")]
    InvalidArgument(String),

    /// Backend could not be reached or rejected the command
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CacheError::InvalidArgument(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        CacheError::Unavailable(msg.into())
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss)
    }
}

#[cfg(feature = "cache")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn order_conflict(msg: impl Into<String>) -> Self {
        AppError::OrderConflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn unavailable(service: impl Into<String>) -> Self {
        AppError::Unavailable(service.into())
    }
}
