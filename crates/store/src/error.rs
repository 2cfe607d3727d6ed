//! Store errors

use claim_core::{Namespace, RecordKey};
use thiserror::Error;

/// Errors from the account store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record already exists: {namespace}/{key}")]
    AlreadyExists { namespace: Namespace, key: RecordKey },

    #[error("Record not found: {namespace}/{key}")]
    NotFound { namespace: Namespace, key: RecordKey },

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}
