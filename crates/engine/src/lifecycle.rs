//! Account lifecycle - closing records and reclaiming their allocation

use claim_core::{Identity, Namespace, RecordKey};
use claim_store::{Record, StoreTx};
use serde::{Deserialize, Serialize};

use crate::engine::{journal, ClaimEngine};
use crate::error::{ClaimError, ClaimResult};
use crate::event::ClaimEvent;
use crate::state::{InvoiceAccount, InvoiceRequest};

/// Storage freed by closing a record, credited to its creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reclamation {
    pub key: RecordKey,
    pub namespace: Namespace,
    pub beneficiary: Identity,
    pub allocation: u64,
}

fn close_record<R: Record>(
    tx: &StoreTx<'_>,
    key: &RecordKey,
    caller: &Identity,
    owner: &Identity,
    now: chrono::DateTime<chrono::Utc>,
) -> ClaimResult<Reclamation> {
    if caller != owner {
        return Err(ClaimError::Unauthorized(format!(
            "{caller} did not create {}/{key}",
            R::NAMESPACE
        )));
    }

    let allocation = tx.remove::<R>(key)?;
    let reclamation = Reclamation {
        key: *key,
        namespace: R::NAMESPACE,
        beneficiary: *owner,
        allocation,
    };
    journal(
        tx,
        ClaimEvent::RecordClosed {
            namespace: R::NAMESPACE,
            key: *key,
            beneficiary: *owner,
            allocation,
            timestamp: now,
        },
    )?;
    Ok(reclamation)
}

impl ClaimEngine {
    /// Close an invoice in any status. Allowed while the org is paused.
    pub fn close_invoice(&mut self, caller: &Identity, invoice_key: &RecordKey) -> ClaimResult<Reclamation> {
        let now = self.now();

        let reclamation = self.store.atomically(|tx| {
            let invoice: InvoiceAccount = tx.fetch(invoice_key)?;
            close_record::<InvoiceAccount>(tx, invoice_key, caller, &invoice.authority, now)
        })?;

        tracing::info!(invoice = %invoice_key, allocation = reclamation.allocation, "invoice closed");
        Ok(reclamation)
    }

    /// Close a request, Pending or Fulfilled. The requester may submit again afterwards.
    pub fn close_request(&mut self, caller: &Identity, request_key: &RecordKey) -> ClaimResult<Reclamation> {
        let now = self.now();

        let reclamation = self.store.atomically(|tx| {
            let request: InvoiceRequest = tx.fetch(request_key)?;
            close_record::<InvoiceRequest>(tx, request_key, caller, &request.authority, now)
        })?;

        tracing::info!(request = %request_key, allocation = reclamation.allocation, "request closed");
        Ok(reclamation)
    }
}
