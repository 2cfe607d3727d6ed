//! # InvoiceClaim Account Store
//!
//! Durable keyed storage for every workflow record.
//!
//! ## Features
//! - Records addressed by deterministic [`RecordKey`](claim_core::RecordKey)s,
//!   one keyspace per [`Namespace`](claim_core::Namespace)
//! - JSON payloads in SQLite, file-backed or in-memory
//! - All-or-nothing transactions via [`AccountStore::atomically`]
//! - Append-only event journal written inside the same transaction

mod error;
mod store;

pub use error::StoreError;
pub use store::{AccountStore, Record, StoreTx, StoredEvent};
