//! Invoice State Machine - payment and settlement

use claim_core::{Identity, RecordKey, TokenAmount};
use serde::{Deserialize, Serialize};

use crate::engine::{journal, ClaimEngine};
use crate::error::{ClaimError, ClaimResult};
use crate::event::ClaimEvent;
use crate::ports::{Disbursement, Payout};
use crate::state::{InvoiceAccount, InvoiceStatus, OrgConfig, VendorAccount};

/// Result of releasing an escrowed invoice to its vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub invoice: RecordKey,
    pub vendor: RecordKey,
    pub payout_identity: Identity,
    pub amount: TokenAmount,
    pub reference: String,
}

impl ClaimEngine {
    /// Move a `ReadyForPayment` invoice into escrow, no later than its due date.
    ///
    /// Cap checks and the daily-total increment run in the same transaction,
    /// so a rejected payment changes neither the total nor the status.
    pub fn process_payment(&mut self, caller: &Identity, invoice_key: &RecordKey) -> ClaimResult<InvoiceAccount> {
        let now = self.now();
        let engine_config = &self.config;

        let (invoice, daily_spent) = self.store.atomically(|tx| {
            let mut invoice: InvoiceAccount = tx.fetch(invoice_key)?;
            if *caller != invoice.authority {
                return Err(ClaimError::Unauthorized(format!(
                    "{caller} is not the invoice authority"
                )));
            }

            let mut org: OrgConfig = tx.fetch(&invoice.org)?;
            org.require_active()?;
            invoice.require_status(&InvoiceStatus::ReadyForPayment)?;
            if now > invoice.due_date {
                return Err(ClaimError::PaymentOverdue(format!(
                    "invoice was due {}",
                    invoice.due_date.to_rfc3339()
                )));
            }

            if invoice.amount > org.per_invoice_cap {
                return Err(ClaimError::CapExceeded(format!(
                    "amount {} exceeds per-invoice cap {}",
                    invoice.amount, org.per_invoice_cap
                )));
            }

            org.roll_daily_window(engine_config, now);
            let total = org
                .daily_spent
                .checked_add(invoice.amount)
                .filter(|total| *total <= org.daily_cap)
                .ok_or_else(|| {
                    ClaimError::CapExceeded(format!(
                        "daily total {} + {} exceeds daily cap {}",
                        org.daily_spent, invoice.amount, org.daily_cap
                    ))
                })?;
            org.daily_spent = total;
            tx.save(&invoice.org, &org)?;

            invoice.transition(InvoiceStatus::InEscrow, now);
            tx.save(invoice_key, &invoice)?;
            journal(
                tx,
                ClaimEvent::PaymentEscrowed {
                    org: invoice.org,
                    invoice: *invoice_key,
                    amount: invoice.amount,
                    daily_spent: total,
                    timestamp: now,
                },
            )?;
            Ok::<_, ClaimError>((invoice, total))
        })
        .inspect_err(|err| tracing::debug!(invoice = %invoice_key, error = %err, "payment rejected"))?;

        tracing::info!(
            invoice = %invoice_key,
            amount = %invoice.amount,
            daily_spent = %daily_spent,
            "payment escrowed"
        );
        Ok(invoice)
    }

    /// Release an escrowed invoice to the vendor's payout identity.
    ///
    /// The disbursement runs after every other write, so a failure anywhere
    /// leaves the invoice `InEscrow` and a retry carries the same reference.
    pub fn settle(
        &mut self,
        caller: &Identity,
        invoice_key: &RecordKey,
        disbursement: &dyn Disbursement,
    ) -> ClaimResult<Settlement> {
        let now = self.now();

        let settlement = self.store.atomically(|tx| {
            let mut invoice: InvoiceAccount = tx.fetch(invoice_key)?;
            if *caller != invoice.authority {
                return Err(ClaimError::Unauthorized(format!(
                    "{caller} is not the invoice authority"
                )));
            }

            let org: OrgConfig = tx.fetch(&invoice.org)?;
            org.require_active()?;
            invoice.require_status(&InvoiceStatus::InEscrow)?;

            let mut vendor: VendorAccount = tx.fetch(&invoice.vendor)?;
            if !vendor.is_active {
                return Err(ClaimError::InvalidState(format!(
                    "vendor {} is inactive",
                    vendor.name
                )));
            }

            vendor.total_paid = vendor.total_paid.checked_add(invoice.amount).ok_or_else(|| {
                ClaimError::InvalidParameter(format!("total paid to {} overflows", vendor.name))
            })?;
            vendor.last_payment = Some(now);
            tx.save(&invoice.vendor, &vendor)?;

            invoice.transition(InvoiceStatus::Paid, now);
            tx.save(invoice_key, &invoice)?;

            let payout = Payout {
                invoice: *invoice_key,
                vendor_name: vendor.name.clone(),
                to: vendor.payout_identity,
                amount: invoice.amount,
                at: now,
                reference: Payout::reference_for(invoice_key, invoice.created_at),
            };
            journal(
                tx,
                ClaimEvent::PaymentSettled {
                    invoice: *invoice_key,
                    vendor: invoice.vendor,
                    payout_identity: vendor.payout_identity,
                    amount: invoice.amount,
                    reference: payout.reference.clone(),
                    timestamp: now,
                },
            )?;

            // Last fallible step before commit
            disbursement.disburse(&payout)?;

            Ok::<_, ClaimError>(Settlement {
                invoice: *invoice_key,
                vendor: invoice.vendor,
                payout_identity: vendor.payout_identity,
                amount: invoice.amount,
                reference: payout.reference,
            })
        })?;

        tracing::info!(
            invoice = %invoice_key,
            to = %settlement.payout_identity,
            amount = %settlement.amount,
            reference = %settlement.reference,
            "payment settled"
        );
        Ok(settlement)
    }

    pub fn invoice(&self, key: &RecordKey) -> ClaimResult<InvoiceAccount> {
        self.store.read(|tx| tx.fetch(key)).map_err(ClaimError::from)
    }

    /// Invoices, optionally restricted to one org
    pub fn invoices(&self, org: Option<&RecordKey>) -> ClaimResult<Vec<(RecordKey, InvoiceAccount)>> {
        let all: Vec<(RecordKey, InvoiceAccount)> = self.store.read(|tx| tx.list())?;
        Ok(all
            .into_iter()
            .filter(|(_, invoice)| org.map_or(true, |org| invoice.org == *org))
            .collect())
    }
}
