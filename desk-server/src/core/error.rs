//! 引擎启动/运行期错误

use thiserror::Error;

/// Engine-level error (startup and background wiring)
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<shared::error::AppError> for EngineError {
    fn from(err: shared::error::AppError) -> Self {
        EngineError::Database(err.to_string())
    }
}
