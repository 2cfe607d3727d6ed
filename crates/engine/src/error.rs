//! Engine errors

use claim_store::StoreError;
use thiserror::Error;

/// Errors from workflow operations
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Cap exceeded: {0}")]
    CapExceeded(String),

    #[error("Payment overdue: {0}")]
    PaymentOverdue(String),

    #[error("Organization is paused")]
    OrgPaused,

    #[error("Request already fulfilled")]
    AlreadyFulfilled,

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ClaimError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { namespace, key } => {
                ClaimError::AlreadyExists(format!("{namespace}/{key}"))
            }
            StoreError::NotFound { namespace, key } => {
                ClaimError::NotFound(format!("{namespace}/{key}"))
            }
            other => ClaimError::Store(other),
        }
    }
}

/// Result type for engine operations
pub type ClaimResult<T> = Result<T, ClaimError>;
