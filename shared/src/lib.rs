//! Shared types for the Desk back-office
//!
//! Common types used across crates: domain models for the incident
//! lifecycle engine, the unified error type, and time/ID utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use serde::{Deserialize, Serialize};
