//! Invoice Request Pipeline
//!
//! A requester submits a document reference; the extraction oracle later
//! fulfills the request, which creates the invoice in `Validated`.

use chrono::{DateTime, Utc};
use claim_core::{Identity, RecordKey, TokenAmount};
use serde::{Deserialize, Serialize};

use crate::engine::{journal, ClaimEngine};
use crate::error::{ClaimError, ClaimResult};
use crate::event::ClaimEvent;
use crate::state::{
    InvoiceAccount, InvoiceRequest, InvoiceStatus, OrgConfig, RequestStatus, Role, VendorAccount,
};
use crate::vendor::validate_vendor_name;

/// Extracted invoice data delivered by the oracle signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub vendor_name: String,
    pub amount: TokenAmount,
    pub due_date: DateTime<Utc>,
    /// Must match the reference the request was submitted with
    pub source_reference: String,
}

impl ClaimEngine {
    /// Submit a document for extraction. One open request per requester and org.
    pub fn submit_request(
        &mut self,
        org: &RecordKey,
        requester: &Identity,
        source_reference: &str,
        requested_amount: Option<TokenAmount>,
    ) -> ClaimResult<RecordKey> {
        if source_reference.is_empty() || source_reference.len() > self.config.max_source_reference_len {
            return Err(ClaimError::InvalidParameter(format!(
                "source reference must be 1..={} bytes",
                self.config.max_source_reference_len
            )));
        }
        if requested_amount.is_some_and(|amount| amount.is_zero()) {
            return Err(ClaimError::InvalidParameter("requested amount is zero".into()));
        }

        let now = self.now();
        let key = RecordKey::request(org, requester);

        self.store.atomically(|tx| {
            let config: OrgConfig = tx.fetch(org)?;
            config.require_active()?;

            let request = InvoiceRequest {
                org: *org,
                authority: *requester,
                source_reference: source_reference.to_string(),
                requested_amount,
                status: RequestStatus::Pending,
                timestamp: now,
            };
            tx.create(&key, &request)?;
            journal(
                tx,
                ClaimEvent::RequestSubmitted {
                    org: *org,
                    request: key,
                    requester: *requester,
                    source_reference: source_reference.to_string(),
                    timestamp: now,
                },
            )
        })?;

        tracing::info!(org = %org, request = %key, requester = %requester, "invoice request submitted");
        Ok(key)
    }

    /// Record extracted data and create the invoice. Oracle signer only.
    pub fn fulfill_request(
        &mut self,
        caller: &Identity,
        request_key: &RecordKey,
        fulfillment: Fulfillment,
    ) -> ClaimResult<RecordKey> {
        let now = self.now();
        let engine_config = &self.config;

        let (invoice_key, counter) = self.store.atomically(|tx| {
            let mut request: InvoiceRequest = tx.fetch(request_key)?;
            let mut org: OrgConfig = tx.fetch(&request.org)?;

            org.require_active()?;
            org.require_role(caller, &[Role::OracleSigner])?;
            if request.status == RequestStatus::Fulfilled {
                return Err(ClaimError::AlreadyFulfilled);
            }

            if fulfillment.amount.is_zero() {
                return Err(ClaimError::InvalidParameter("amount is zero".into()));
            }
            if fulfillment.amount > org.per_invoice_cap {
                return Err(ClaimError::CapExceeded(format!(
                    "amount {} exceeds per-invoice cap {}",
                    fulfillment.amount, org.per_invoice_cap
                )));
            }
            validate_vendor_name(engine_config, &fulfillment.vendor_name)?;
            if engine_config.require_future_due_date && fulfillment.due_date <= now {
                return Err(ClaimError::InvalidParameter(format!(
                    "due date {} is not in the future",
                    fulfillment.due_date
                )));
            }
            if fulfillment.source_reference != request.source_reference {
                return Err(ClaimError::InvalidParameter(
                    "source reference does not match the request".into(),
                ));
            }

            let vendor_key = RecordKey::vendor(&request.org, &fulfillment.vendor_name);
            let vendor: VendorAccount = tx.fetch(&vendor_key)?;
            if !vendor.is_active {
                return Err(ClaimError::InvalidState(format!(
                    "vendor {} is inactive",
                    vendor.name
                )));
            }

            let invoice_key = RecordKey::invoice(&request.org, &request.authority);
            let invoice = InvoiceAccount {
                org: request.org,
                authority: request.authority,
                vendor: vendor_key,
                vendor_name: fulfillment.vendor_name.clone(),
                amount: fulfillment.amount,
                due_date: fulfillment.due_date,
                source_reference: request.source_reference.clone(),
                status: InvoiceStatus::Validated,
                created_at: now,
                timestamp: now,
            };
            tx.create(&invoice_key, &invoice)?;

            request.status = RequestStatus::Fulfilled;
            request.timestamp = now;
            tx.save(request_key, &request)?;

            org.invoice_counter += 1;
            tx.save(&request.org, &org)?;

            journal(
                tx,
                ClaimEvent::RequestFulfilled {
                    request: *request_key,
                    invoice: invoice_key,
                    vendor_name: fulfillment.vendor_name.clone(),
                    amount: fulfillment.amount,
                    timestamp: now,
                },
            )?;
            Ok::<_, ClaimError>((invoice_key, org.invoice_counter))
        })?;

        tracing::info!(
            request = %request_key,
            invoice = %invoice_key,
            amount = %fulfillment.amount,
            invoice_counter = counter,
            "invoice request fulfilled"
        );
        Ok(invoice_key)
    }

    pub fn request(&self, key: &RecordKey) -> ClaimResult<InvoiceRequest> {
        self.store.read(|tx| tx.fetch(key)).map_err(ClaimError::from)
    }

    /// Pending requests, optionally restricted to one org
    pub fn pending_requests(&self, org: Option<&RecordKey>) -> ClaimResult<Vec<(RecordKey, InvoiceRequest)>> {
        let all: Vec<(RecordKey, InvoiceRequest)> = self.store.read(|tx| tx.list())?;
        Ok(all
            .into_iter()
            .filter(|(_, request)| request.status == RequestStatus::Pending)
            .filter(|(_, request)| org.map_or(true, |org| request.org == *org))
            .collect())
    }
}
