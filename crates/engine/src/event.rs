//! Workflow events (written to the store journal)
//!
//! Each successful operation appends exactly one event inside its own
//! transaction, so the journal never records an operation that rolled back.

use chrono::{DateTime, Utc};
use claim_core::{Identity, Namespace, RecordKey, TokenAmount};
use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

/// Events appended to the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "event_type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClaimEvent {
    OrgInitialized {
        org: RecordKey,
        authority: Identity,
        oracle_signer: Identity,
        per_invoice_cap: TokenAmount,
        daily_cap: TokenAmount,
        audit_rate_bps: u16,
        timestamp: DateTime<Utc>,
    },

    OrgUpdated {
        org: RecordKey,
        oracle_signer: Identity,
        per_invoice_cap: TokenAmount,
        daily_cap: TokenAmount,
        audit_rate_bps: u16,
        paused: bool,
        timestamp: DateTime<Utc>,
    },

    VendorRegistered {
        org: RecordKey,
        vendor: RecordKey,
        name: String,
        payout_identity: Identity,
        timestamp: DateTime<Utc>,
    },

    VendorStatusChanged {
        vendor: RecordKey,
        is_active: bool,
        timestamp: DateTime<Utc>,
    },

    VendorPayoutUpdated {
        vendor: RecordKey,
        payout_identity: Identity,
        timestamp: DateTime<Utc>,
    },

    RequestSubmitted {
        org: RecordKey,
        request: RecordKey,
        requester: Identity,
        source_reference: String,
        timestamp: DateTime<Utc>,
    },

    RequestFulfilled {
        request: RecordKey,
        invoice: RecordKey,
        vendor_name: String,
        amount: TokenAmount,
        timestamp: DateTime<Utc>,
    },

    RandomnessRequested {
        invoice: RecordKey,
        request_id: String,
        oracle: Identity,
        payer: Identity,
        timestamp: DateTime<Utc>,
    },

    AuditSampled {
        invoice: RecordKey,
        request_id: String,
        random_value: u64,
        selected: bool,
        timestamp: DateTime<Utc>,
    },

    AuditDecided {
        invoice: RecordKey,
        auditor: Identity,
        approved: bool,
        timestamp: DateTime<Utc>,
    },

    PaymentEscrowed {
        org: RecordKey,
        invoice: RecordKey,
        amount: TokenAmount,
        daily_spent: TokenAmount,
        timestamp: DateTime<Utc>,
    },

    PaymentSettled {
        invoice: RecordKey,
        vendor: RecordKey,
        payout_identity: Identity,
        amount: TokenAmount,
        reference: String,
        timestamp: DateTime<Utc>,
    },

    RecordClosed {
        namespace: Namespace,
        key: RecordKey,
        beneficiary: Identity,
        allocation: u64,
        timestamp: DateTime<Utc>,
    },
}

impl ClaimEvent {
    /// Journal discriminator, matches the serde tag
    pub fn event_type(&self) -> &'static str {
        self.into()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ClaimEvent::OrgInitialized { timestamp, .. }
            | ClaimEvent::OrgUpdated { timestamp, .. }
            | ClaimEvent::VendorRegistered { timestamp, .. }
            | ClaimEvent::VendorStatusChanged { timestamp, .. }
            | ClaimEvent::VendorPayoutUpdated { timestamp, .. }
            | ClaimEvent::RequestSubmitted { timestamp, .. }
            | ClaimEvent::RequestFulfilled { timestamp, .. }
            | ClaimEvent::RandomnessRequested { timestamp, .. }
            | ClaimEvent::AuditSampled { timestamp, .. }
            | ClaimEvent::AuditDecided { timestamp, .. }
            | ClaimEvent::PaymentEscrowed { timestamp, .. }
            | ClaimEvent::PaymentSettled { timestamp, .. }
            | ClaimEvent::RecordClosed { timestamp, .. } => *timestamp,
        }
    }
}
