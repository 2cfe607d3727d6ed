//! Document extraction port
//!
//! The extraction pipeline itself (document fetch, OCR, field parsing) runs
//! outside this workspace. `ManifestExtractor` stands in for it by looking up
//! pre-extracted results by source reference.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use claim_core::TokenAmount;
use claim_engine::{Fulfillment, InvoiceRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::OracleError;

/// Fields extracted from an invoice document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    pub vendor_name: String,
    pub amount: TokenAmount,
    pub due_date: DateTime<Utc>,
}

impl ExtractedInvoice {
    /// Fulfillment payload for the request this was extracted from
    pub fn into_fulfillment(self, source_reference: &str) -> Fulfillment {
        Fulfillment {
            vendor_name: self.vendor_name,
            amount: self.amount,
            due_date: self.due_date,
            source_reference: source_reference.to_string(),
        }
    }
}

/// Extraction oracle interface
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, request: &InvoiceRequest) -> Result<ExtractedInvoice, OracleError>;
}

/// Extractor backed by a JSON manifest: `{ "<source reference>": { vendor_name, amount, due_date } }`
///
/// `amount` is in base units (6 decimals).
#[derive(Debug, Default, Clone)]
pub struct ManifestExtractor {
    entries: HashMap<String, ExtractedInvoice>,
}

impl ManifestExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OracleError> {
        let content = std::fs::read_to_string(path)?;
        let entries: HashMap<String, ExtractedInvoice> = serde_json::from_str(&content)
            .map_err(|e| OracleError::InvalidManifest(e.to_string()))?;
        Ok(Self { entries })
    }

    pub fn with_entry(mut self, source_reference: impl Into<String>, extracted: ExtractedInvoice) -> Self {
        self.entries.insert(source_reference.into(), extracted);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Extractor for ManifestExtractor {
    async fn extract(&self, request: &InvoiceRequest) -> Result<ExtractedInvoice, OracleError> {
        self.entries
            .get(&request.source_reference)
            .cloned()
            .ok_or_else(|| OracleError::ManifestEntryMissing {
                reference: request.source_reference.clone(),
            })
    }
}
