//! Input validation helpers
//!
//! Centralized text length constants and truncation functions.
//! SQLite TEXT has no built-in length enforcement, so bounds are applied
//! before anything reaches the repository layer.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Ticket titles built from captured errors
pub const MAX_TITLE_LEN: usize = 200;

/// Human-readable error messages stored on an occurrence
pub const MAX_MESSAGE_LEN: usize = 500;

/// Free-text escalation reasons
pub const MAX_REASON_LEN: usize = 500;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{} exceeds {} characters",
            field, max_len
        )));
    }
    Ok(())
}

/// Truncate a string to `max_len` characters (char-boundary safe).
pub fn truncate_chars(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        return value.to_string();
    }
    value.chars().take(max_len).collect()
}
