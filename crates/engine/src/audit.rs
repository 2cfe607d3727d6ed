//! Audit Sampling Engine
//!
//! Sampling is two-phase: `request_sample` hands a request to the randomness
//! queue and returns immediately; the oracle later calls
//! `on_randomness_fulfilled`, which applies the selection rule.

use claim_core::{Identity, RecordKey};

use crate::config::MAX_AUDIT_RATE_BPS;
use crate::engine::{journal, ClaimEngine};
use crate::error::{ClaimError, ClaimResult};
use crate::event::ClaimEvent;
use crate::ports::{Randomness, RandomnessQueue, RandomnessRequest};
use crate::state::{InvoiceAccount, InvoiceStatus, OrgConfig, Role};

/// Whether an invoice with random value `r` is selected for audit
///
/// ```
/// use claim_engine::audit_selected;
///
/// assert!(audit_selected(200, 500));
/// assert!(!audit_selected(7_000, 500));
/// ```
pub fn audit_selected(random_value: u64, audit_rate_bps: u16) -> bool {
    random_value % u64::from(MAX_AUDIT_RATE_BPS) < u64::from(audit_rate_bps)
}

impl ClaimEngine {
    /// Ask the randomness oracle to sample a `Validated` invoice.
    ///
    /// The queue submission happens inside the transaction, so a rejected
    /// submission leaves the invoice untouched.
    pub fn request_sample(
        &mut self,
        payer: &Identity,
        invoice_key: &RecordKey,
        queue: &dyn RandomnessQueue,
        client_seed: u8,
    ) -> ClaimResult<RandomnessRequest> {
        let now = self.now();
        let request_id = uuid::Uuid::new_v4().to_string();

        let request = self.store.atomically(|tx| {
            let mut invoice: InvoiceAccount = tx.fetch(invoice_key)?;
            let org: OrgConfig = tx.fetch(&invoice.org)?;
            org.require_active()?;
            invoice.require_status(&InvoiceStatus::Validated)?;

            let request = RandomnessRequest {
                request_id: request_id.clone(),
                invoice: *invoice_key,
                oracle: queue.reference(),
                seed: RandomnessRequest::derive_seed(invoice_key, payer, &request_id, client_seed),
            };

            invoice.transition(
                InvoiceStatus::AwaitingRandomness {
                    request_id: request.request_id.clone(),
                    oracle: request.oracle,
                    seed: request.seed.clone(),
                },
                now,
            );
            tx.save(invoice_key, &invoice)?;
            journal(
                tx,
                ClaimEvent::RandomnessRequested {
                    invoice: *invoice_key,
                    request_id: request.request_id.clone(),
                    oracle: request.oracle,
                    payer: *payer,
                    timestamp: now,
                },
            )?;

            queue.submit(&request)?;
            Ok::<_, ClaimError>(request)
        })?;

        tracing::info!(
            invoice = %invoice_key,
            request_id = %request.request_id,
            oracle = %request.oracle,
            "randomness requested"
        );
        Ok(request)
    }

    /// Oracle callback. Applies even while the org is paused, since it only
    /// completes a request already in flight.
    pub fn on_randomness_fulfilled(
        &mut self,
        caller: &Identity,
        invoice_key: &RecordKey,
        randomness: &Randomness,
    ) -> ClaimResult<InvoiceStatus> {
        let now = self.now();

        let (status, value) = self.store.atomically(|tx| {
            let mut invoice: InvoiceAccount = tx.fetch(invoice_key)?;
            let (request_id, oracle) = match &invoice.status {
                InvoiceStatus::AwaitingRandomness { request_id, oracle, .. } => {
                    (request_id.clone(), *oracle)
                }
                other => {
                    return Err(ClaimError::InvalidState(format!(
                        "invoice is {other}, not awaiting randomness"
                    )))
                }
            };
            if *caller != oracle {
                return Err(ClaimError::Unauthorized(format!(
                    "{caller} is not the requested oracle"
                )));
            }

            let org: OrgConfig = tx.fetch(&invoice.org)?;
            let value = randomness.value();
            let selected = audit_selected(value, org.audit_rate_bps);
            let next = if selected {
                InvoiceStatus::AuditPending
            } else {
                InvoiceStatus::ReadyForPayment
            };

            invoice.transition(next.clone(), now);
            tx.save(invoice_key, &invoice)?;
            journal(
                tx,
                ClaimEvent::AuditSampled {
                    invoice: *invoice_key,
                    request_id,
                    random_value: value,
                    selected,
                    timestamp: now,
                },
            )?;
            Ok::<_, ClaimError>((next, value))
        })?;

        tracing::info!(invoice = %invoice_key, random_value = value, status = %status, "audit sampled");
        Ok(status)
    }

    /// Resolve a sampled invoice. Authority or oracle signer only.
    pub fn audit_decide(
        &mut self,
        caller: &Identity,
        invoice_key: &RecordKey,
        approve: bool,
    ) -> ClaimResult<InvoiceStatus> {
        let now = self.now();

        let status = self.store.atomically(|tx| {
            let mut invoice: InvoiceAccount = tx.fetch(invoice_key)?;
            let org: OrgConfig = tx.fetch(&invoice.org)?;
            org.require_role(caller, &[Role::Authority, Role::OracleSigner])?;
            org.require_active()?;
            invoice.require_status(&InvoiceStatus::AuditPending)?;

            let next = if approve {
                InvoiceStatus::ReadyForPayment
            } else {
                InvoiceStatus::AuditRejected
            };
            invoice.transition(next.clone(), now);
            tx.save(invoice_key, &invoice)?;
            journal(
                tx,
                ClaimEvent::AuditDecided {
                    invoice: *invoice_key,
                    auditor: *caller,
                    approved: approve,
                    timestamp: now,
                },
            )?;
            Ok::<_, ClaimError>(next)
        })?;

        tracing::info!(invoice = %invoice_key, auditor = %caller, approved = approve, "audit decided");
        Ok(status)
    }

    /// Randomness requests still waiting for a callback
    pub fn pending_randomness(&self) -> ClaimResult<Vec<RandomnessRequest>> {
        let all: Vec<(RecordKey, InvoiceAccount)> = self.store.read(|tx| tx.list())?;
        Ok(all
            .into_iter()
            .filter_map(|(key, invoice)| match invoice.status {
                InvoiceStatus::AwaitingRandomness { request_id, oracle, seed } => Some(RandomnessRequest {
                    request_id,
                    invoice: key,
                    oracle,
                    seed,
                }),
                _ => None,
            })
            .collect())
    }
}
