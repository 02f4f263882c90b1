//! Custom error types and handling
//!
//! Errors returned here are infrastructure and precondition failures.
//! Faults of a submitted program (wrong answer, timeout, crash) are never
//! errors: they are captured as test results and judged normally.

/// Crate-wide error type
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    // Resource errors
    #[error("Not found: {0}")]
    NotFound(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    // External service errors
    #[error("Docker error: {0}")]
    Docker(String),

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // Calibration errors
    #[error("Calibration error: {0}")]
    Calibration(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<bollard::errors::Error> for JudgeError {
    fn from(err: bollard::errors::Error) -> Self {
        JudgeError::Docker(err.to_string())
    }
}

/// Result type alias using JudgeError
pub type JudgeResult<T> = Result<T, JudgeError>;
