//! Repository Module
//!
//! Provides storage operations over the SQLite tables. Each repository is a
//! module of free async functions taking `&SqlitePool` (or a transaction
//! connection where atomicity spans multiple statements).

pub mod board;
pub mod capture_policy;
pub mod escalation_record;
pub mod occurrence;
pub mod sla_policy;
pub mod ticket;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Database(format!("JSON serialization: {err}"))
    }
}

impl From<RepoError> for shared::error::AppError {
    fn from(err: RepoError) -> Self {
        match &err {
            RepoError::NotFound(what) => shared::error::AppError::not_found(what.clone()),
            RepoError::Validation(msg) => shared::error::AppError::validation(msg.clone()),
            _ => shared::error::AppError::database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
