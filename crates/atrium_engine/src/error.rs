//! Layout error taxonomy
//!
//! Validation errors are detected before any store write and leave no
//! partial effect; storage failures surface as-is, retry is a caller
//! concern.

use thiserror::Error;

use atrium_store::StoreError;

/// Errors returned by layout operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Row capacity exceeded: {occupied} + {requested} > {capacity}")]
    CapacityExceeded {
        /// Size units already occupied in the row
        occupied: u32,
        /// Size units the operation would add
        requested: u32,
        /// Row capacity of the space
        capacity: u32,
    },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Storage failure: {0}")]
    Storage(StoreError),

    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

/// Result type for layout operations
pub type EngineResult<T> = Result<T, EngineError>;

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Constraint(msg) => Self::InvariantViolation(msg),
            StoreError::Transaction(_) => Self::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let err: EngineError = StoreError::NotFound("block x".into()).into();
        assert!(matches!(err, EngineError::NotFound(_)));

        let err: EngineError = StoreError::Conflict("slug".into()).into();
        assert!(matches!(err, EngineError::Conflict(_)));

        let err: EngineError = StoreError::Constraint("root".into()).into();
        assert!(matches!(err, EngineError::InvariantViolation(_)));

        let err: EngineError = StoreError::Transaction("pool down".into()).into();
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
