use thiserror::Error;

use coopbooks_core::{DomainError, ErrorCategory};
use coopbooks_events::HookError;

use crate::store::StoreError;

/// Error returned by every engine operation and by every lifecycle hook.
///
/// Domain errors pass through verbatim so callers can match on the exact gate that
/// refused an operation (`DayNotOpen`, `AccountLocked`, ...).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hook(#[from] HookError),

    /// Failed to serialize a record (e.g. an audit snapshot).
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Publication failed after a successful commit; the committed writes stand.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl EngineError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            EngineError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// Category for domain errors; store conflicts count as `Conflict`.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            EngineError::Domain(err) => Some(err.category()),
            EngineError::Store(StoreError::UniqueViolation { .. })
            | EngineError::Store(StoreError::SerializationConflict(_)) => {
                Some(ErrorCategory::Conflict)
            }
            _ => None,
        }
    }
}
