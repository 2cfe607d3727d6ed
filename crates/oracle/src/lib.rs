//! InvoiceClaim Oracles
//!
//! Off-engine participants of the workflow:
//! - [`LocalVrf`]: ed25519-keyed randomness queue serving audit sampling
//! - [`Extractor`] + [`ExtractionWorker`]: turn pending requests into invoices
//! - [`RecordingDisbursement`]: payout sink with an optional JSONL log

mod config;
mod disbursement;
mod error;
mod extraction;
mod randomness;
mod worker;

pub use config::WorkerConfig;
pub use disbursement::RecordingDisbursement;
pub use error::OracleError;
pub use extraction::{ExtractedInvoice, Extractor, ManifestExtractor};
pub use randomness::{LocalVrf, RandomnessFulfillment};
pub use worker::ExtractionWorker;
