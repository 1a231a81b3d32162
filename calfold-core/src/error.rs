//! Error types for calfold.

use thiserror::Error;

/// Errors that can occur in calfold operations.
#[derive(Error, Debug)]
pub enum CalFoldError {
    #[error("Invalid recurrence pattern '{pattern}': {reason}")]
    InvalidRecurrencePattern { pattern: String, reason: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event log error: {0}")]
    Log(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CalFoldError {
    pub(crate) fn pattern(pattern: &str, reason: impl Into<String>) -> Self {
        CalFoldError::InvalidRecurrencePattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CalFoldError {
    fn from(err: serde_json::Error) -> Self {
        CalFoldError::Serialization(err.to_string())
    }
}

/// Result type alias for calfold operations.
pub type CalFoldResult<T> = Result<T, CalFoldError>;
