//! # InvoiceClaim Engine
//!
//! State machine for the invoice-claim workflow.
//!
//! ## Flow
//! ```text
//! submit -> fulfill -> Validated -> request_sample -> AwaitingRandomness
//!   -> (callback) AuditPending -> audit_decide -> ReadyForPayment | AuditRejected
//!   -> (callback) ReadyForPayment
//!   -> process_payment -> InEscrow -> settle -> Paid
//! ```
//!
//! Every operation runs in one store transaction and appends a
//! [`ClaimEvent`] to the journal before committing.

mod audit;
mod config;
mod engine;
mod error;
mod event;
mod invoice;
mod lifecycle;
mod org;
mod ports;
mod request;
mod state;
mod vendor;

pub use audit::audit_selected;
pub use config::EngineConfig;
pub use engine::ClaimEngine;
pub use error::{ClaimError, ClaimResult};
pub use event::ClaimEvent;
pub use invoice::Settlement;
pub use lifecycle::Reclamation;
pub use org::{OrgInit, OrgUpdate};
pub use ports::{Disbursement, Payout, Randomness, RandomnessQueue, RandomnessRequest};
pub use request::Fulfillment;
pub use state::{
    InvoiceAccount, InvoiceRequest, InvoiceStatus, OrgConfig, RequestStatus, Role, VendorAccount,
};
