//! Unified error system for the Desk back-office
//!
//! Provides:
//! - [`ErrorCode`]: standardized codes grouped by domain
//! - [`AppError`]: rich error type with code, message, and details
//! - [`AppResult`]: result alias used across service layers
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 4xxx: Ticket / escalation errors
//! - 6xxx: Error-capture errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Standardized error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // ═══ General (0xxx) ═══
    /// Input failed validation
    ValidationFailed,
    /// Resource not found
    NotFound,
    /// Resource already exists
    Conflict,

    // ═══ Ticket / escalation (4xxx) ═══
    /// Escalation state transition rejected
    EscalationRejected,
    /// Ticket has no active escalation to resolve
    NoActiveEscalation,

    // ═══ Error capture (6xxx) ═══
    /// Capture policy payload out of bounds
    InvalidCapturePolicy,
    /// Occurrence is in a terminal state
    OccurrenceTerminal,

    // ═══ System (9xxx) ═══
    /// Database error
    Database,
    /// Internal error
    Internal,
}

impl ErrorCode {
    /// Numeric code (stable across releases, used in logs)
    pub fn code(&self) -> u16 {
        match self {
            Self::ValidationFailed => 1,
            Self::NotFound => 2,
            Self::Conflict => 3,
            Self::EscalationRejected => 4001,
            Self::NoActiveEscalation => 4002,
            Self::InvalidCapturePolicy => 6001,
            Self::OccurrenceTerminal => 6002,
            Self::Database => 9001,
            Self::Internal => 9000,
        }
    }

    /// Default human-readable message
    pub fn message(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Resource already exists",
            Self::EscalationRejected => "Escalation transition rejected",
            Self::NoActiveEscalation => "No active escalation",
            Self::InvalidCapturePolicy => "Invalid capture policy",
            Self::OccurrenceTerminal => "Occurrence is terminal",
            Self::Database => "Database error",
            Self::Internal => "Internal error",
        }
    }
}

/// Application error with structured error code and details
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::Database, msg)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::Internal, msg)
    }
}

/// Result type alias using [`AppError`]
pub type AppResult<T> = Result<T, AppError>;
