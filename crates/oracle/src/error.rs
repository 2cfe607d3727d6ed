//! Oracle error types

use claim_engine::ClaimError;
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Error)]
pub enum OracleError {
    /// No extraction result for a document reference
    #[error("No manifest entry for source reference {reference}")]
    ManifestEntryMissing { reference: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Randomness proof did not verify against the oracle key
    #[error("Randomness verification failed for request {request_id}: {reason}")]
    VerificationFailed { request_id: String, reason: String },

    #[error("Engine rejected the operation: {0}")]
    Engine(#[from] ClaimError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<OracleError> for ClaimError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Engine(inner) => inner,
            other => ClaimError::Oracle(other.to_string()),
        }
    }
}
