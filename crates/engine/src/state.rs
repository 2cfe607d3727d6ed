//! Persisted workflow records

use chrono::{DateTime, Utc};
use claim_core::{Identity, Namespace, RecordKey, TokenAmount};
use claim_store::Record;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, IntoStaticStr};

use crate::config::EngineConfig;
use crate::error::{ClaimError, ClaimResult};

/// Roles an identity can hold within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Authority,
    OracleSigner,
}

/// Per-organization configuration and running daily spend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgConfig {
    pub authority: Identity,
    pub oracle_signer: Identity,
    pub per_invoice_cap: TokenAmount,
    pub daily_cap: TokenAmount,
    pub daily_spent: TokenAmount,
    pub last_reset_day: i64,
    pub audit_rate_bps: u16,
    pub paused: bool,
    pub invoice_counter: u64,
    pub version: u8,
    pub created_at: DateTime<Utc>,
}

impl Record for OrgConfig {
    const NAMESPACE: Namespace = Namespace::OrgConfig;
}

impl OrgConfig {
    pub const VERSION: u8 = 1;

    /// Roles held by `who`. An authority that is also the oracle signer holds both.
    pub fn roles_of(&self, who: &Identity) -> Vec<Role> {
        let mut roles = Vec::with_capacity(2);
        if *who == self.authority {
            roles.push(Role::Authority);
        }
        if *who == self.oracle_signer {
            roles.push(Role::OracleSigner);
        }
        roles
    }

    /// Fail `Unauthorized` unless `who` holds one of `allowed`
    pub fn require_role(&self, who: &Identity, allowed: &[Role]) -> ClaimResult<()> {
        if self.roles_of(who).iter().any(|role| allowed.contains(role)) {
            Ok(())
        } else {
            Err(ClaimError::Unauthorized(format!(
                "{who} holds none of {allowed:?}"
            )))
        }
    }

    pub fn require_active(&self) -> ClaimResult<()> {
        if self.paused {
            Err(ClaimError::OrgPaused)
        } else {
            Ok(())
        }
    }

    /// Reset the running total when the day index has advanced
    pub fn roll_daily_window(&mut self, config: &EngineConfig, now: DateTime<Utc>) {
        let today = config.day_index(now.timestamp());
        if today > self.last_reset_day {
            self.daily_spent = TokenAmount::ZERO;
            self.last_reset_day = today;
        }
    }
}

/// Caps must be non-zero and the daily cap must cover one invoice
pub(crate) fn validate_caps(per_invoice_cap: TokenAmount, daily_cap: TokenAmount) -> ClaimResult<()> {
    if per_invoice_cap.is_zero() || daily_cap.is_zero() {
        return Err(ClaimError::InvalidParameter("caps must be greater than zero".into()));
    }
    if daily_cap < per_invoice_cap {
        return Err(ClaimError::InvalidParameter(format!(
            "daily cap {daily_cap} is below per-invoice cap {per_invoice_cap}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_audit_rate(audit_rate_bps: u16) -> ClaimResult<()> {
    if audit_rate_bps > crate::config::MAX_AUDIT_RATE_BPS {
        return Err(ClaimError::InvalidParameter(format!(
            "audit rate {audit_rate_bps} bps exceeds {}",
            crate::config::MAX_AUDIT_RATE_BPS
        )));
    }
    Ok(())
}

/// A registered payee of an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorAccount {
    pub org: RecordKey,
    pub name: String,
    pub payout_identity: Identity,
    pub total_paid: TokenAmount,
    pub last_payment: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
}

impl Record for VendorAccount {
    const NAMESPACE: Namespace = Namespace::Vendor;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Fulfilled,
}

/// A requester's submission awaiting extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub org: RecordKey,
    pub authority: Identity,
    pub source_reference: String,
    pub requested_amount: Option<TokenAmount>,
    pub status: RequestStatus,
    pub timestamp: DateTime<Utc>,
}

impl Record for InvoiceRequest {
    const NAMESPACE: Namespace = Namespace::Request;
}

/// Invoice lifecycle status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(tag = "state", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvoiceStatus {
    /// Extracted and validated, not yet sampled
    Validated,
    /// Randomness requested, waiting for the oracle callback
    AwaitingRandomness {
        request_id: String,
        oracle: Identity,
        seed: String,
    },
    AuditPending,
    ReadyForPayment,
    /// Rejected by an auditor. Terminal; can only be closed.
    AuditRejected,
    InEscrow,
    Paid,
}

impl InvoiceStatus {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// An extracted invoice moving through audit and payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceAccount {
    pub org: RecordKey,
    pub authority: Identity,
    pub vendor: RecordKey,
    pub vendor_name: String,
    pub amount: TokenAmount,
    pub due_date: DateTime<Utc>,
    pub source_reference: String,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    /// Time of the last status transition
    pub timestamp: DateTime<Utc>,
}

impl Record for InvoiceAccount {
    const NAMESPACE: Namespace = Namespace::Invoice;
}

impl InvoiceAccount {
    pub(crate) fn transition(&mut self, to: InvoiceStatus, now: DateTime<Utc>) -> InvoiceStatus {
        self.timestamp = now;
        std::mem::replace(&mut self.status, to)
    }

    pub(crate) fn require_status(&self, expected: &InvoiceStatus) -> ClaimResult<()> {
        if self.status == *expected {
            Ok(())
        } else {
            Err(ClaimError::InvalidState(format!(
                "invoice is {}, expected {}",
                self.status, expected
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn org(authority: Identity, oracle: Identity) -> OrgConfig {
        OrgConfig {
            authority,
            oracle_signer: oracle,
            per_invoice_cap: TokenAmount::from_base_units(100),
            daily_cap: TokenAmount::from_base_units(500),
            daily_spent: TokenAmount::from_base_units(300),
            last_reset_day: 0,
            audit_rate_bps: 500,
            paused: false,
            invoice_counter: 0,
            version: OrgConfig::VERSION,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_roles() {
        let a = Identity::new([1; 32]);
        let o = Identity::new([2; 32]);
        let x = Identity::new([3; 32]);

        let config = org(a, o);
        assert_eq!(config.roles_of(&a), vec![Role::Authority]);
        assert_eq!(config.roles_of(&o), vec![Role::OracleSigner]);
        assert!(config.roles_of(&x).is_empty());

        let both = org(a, a);
        assert_eq!(both.roles_of(&a), vec![Role::Authority, Role::OracleSigner]);
        assert!(both.require_role(&a, &[Role::OracleSigner]).is_ok());
        assert!(matches!(
            config.require_role(&x, &[Role::Authority, Role::OracleSigner]),
            Err(ClaimError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_daily_window_rolls_forward_only() {
        let config = EngineConfig::default();
        let mut org = org(Identity::new([1; 32]), Identity::new([2; 32]));
        org.last_reset_day = config.day_index(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap().timestamp());

        org.roll_daily_window(&config, Utc.with_ymd_and_hms(2025, 1, 1, 23, 59, 59).unwrap());
        assert_eq!(org.daily_spent.base_units(), 300);

        org.roll_daily_window(&config, Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap());
        assert!(org.daily_spent.is_zero());
    }

    #[test]
    fn test_validate_caps() {
        let one = TokenAmount::from_base_units(1);
        let two = TokenAmount::from_base_units(2);
        assert!(validate_caps(one, two).is_ok());
        assert!(validate_caps(two, two).is_ok());
        assert!(validate_caps(two, one).is_err());
        assert!(validate_caps(TokenAmount::ZERO, two).is_err());
    }

    #[test]
    fn test_status_serialization() {
        let status = InvoiceStatus::AwaitingRandomness {
            request_id: "r-1".into(),
            oracle: Identity::new([9; 32]),
            seed: "00".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "awaiting_randomness");
        assert_eq!(status.name(), "awaiting_randomness");
        assert_eq!(status.to_string(), status.name());

        let json = serde_json::to_string(&InvoiceStatus::ReadyForPayment).unwrap();
        assert_eq!(json, r#"{"state":"ready_for_payment"}"#);
        assert_eq!(InvoiceStatus::ReadyForPayment.to_string(), "ready_for_payment");
    }
}
