use std::io;
use thiserror::Error;

use domain::error::DomainError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Transient medium failure (connection, I/O). The only retryable kind;
    /// `safe_*` accessors on the storage facade convert it into a default.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Caller misuse. Never retried, always surfaced immediately.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Unmet topology precondition. Surfaced immediately, no side effects.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Operation vetoed by a pre-event listener")]
    Vetoed,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Task error: {message}")]
    TaskError { message: String },
}

impl AppError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::IoError(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
