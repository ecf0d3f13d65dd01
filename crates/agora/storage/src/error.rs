use agora_types::BillStatus;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// Uniqueness constraint violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Freshly issued claim code collides with a stored one
    #[error("claim code already issued")]
    DuplicateClaimCode,

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Reject status changes the bill lifecycle does not allow.
pub(crate) fn ensure_transition(from: BillStatus, to: BillStatus) -> StorageResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StorageError::InvariantViolation(format!(
            "bill cannot move from {from} to {to}"
        )))
    }
}

/// Share of each score kept by one decay step, in percent.
pub(crate) fn decay_keep_percent(percent: u8) -> StorageResult<u64> {
    if percent > 100 {
        return Err(StorageError::InvalidInput(format!(
            "decay percent must be at most 100, got {percent}"
        )));
    }
    Ok(100 - u64::from(percent))
}
