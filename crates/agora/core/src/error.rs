//! Error types for legislative workflow operations

use agora_storage::StorageError;
use thiserror::Error;

/// Result type for workflow operations
pub type CivicResult<T> = Result<T, CivicError>;

/// Failures surfaced by the workflow engine.
///
/// Every variant except `Internal` carries a message meant for the caller.
#[derive(Debug, Error)]
pub enum CivicError {
    /// Malformed or missing input
    #[error("{0}")]
    InvalidInput(String),

    /// Credential missing or not recognised
    #[error("{0}")]
    Unauthenticated(String),

    /// Caller is known but not eligible
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness or state conflict
    #[error("{0}")]
    Conflict(String),

    /// Store failure; never shown to callers verbatim
    #[error("storage failure: {0}")]
    Internal(StorageError),
}

impl CivicError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<StorageError> for CivicError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(message) => Self::NotFound(message),
            StorageError::Conflict(message) => Self::Conflict(message),
            other => Self::Internal(other),
        }
    }
}
