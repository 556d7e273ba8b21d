//! Common utilities shared across services.
//!
//! This crate provides:
//! - Unified error handling (`AppError`, `CacheError`) with gRPC mapping
//! - Configuration structures for the database and cache

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, CacheError, CacheResult, ErrorKind, OptionExt};
