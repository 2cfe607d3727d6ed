//! Outbound ports: randomness oracle queue and payment disbursement

use chrono::{DateTime, Utc};
use claim_core::{Identity, RecordKey, TokenAmount};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ClaimResult;

/// A randomness request handed to an oracle queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequest {
    pub request_id: String,
    pub invoice: RecordKey,
    pub oracle: Identity,
    /// Hex-encoded 32-byte seed
    pub seed: String,
}

impl RandomnessRequest {
    /// Seed mixing the invoice, the payer and the caller-chosen byte
    pub(crate) fn derive_seed(invoice: &RecordKey, payer: &Identity, request_id: &str, client_seed: u8) -> String {
        let mut hasher = Sha256::new();
        hasher.update(invoice.as_bytes());
        hasher.update(payer.as_bytes());
        hasher.update(request_id.as_bytes());
        hasher.update([client_seed]);
        hex::encode(hasher.finalize())
    }

    /// Bytes an oracle signs to fulfill this request
    pub fn message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(self.request_id.len() + 32 + self.seed.len());
        message.extend_from_slice(self.request_id.as_bytes());
        message.extend_from_slice(self.invoice.as_bytes());
        message.extend_from_slice(self.seed.as_bytes());
        message
    }
}

/// 32 bytes of oracle randomness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Randomness(pub [u8; 32]);

impl Randomness {
    /// Randomness whose first eight bytes encode `value`
    pub fn from_value(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&value.to_le_bytes());
        Self(bytes)
    }

    /// Little-endian u64 of the first eight bytes
    pub fn value(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(head)
    }
}

/// Queue accepting randomness requests; results arrive later via
/// [`ClaimEngine::on_randomness_fulfilled`](crate::ClaimEngine::on_randomness_fulfilled).
pub trait RandomnessQueue {
    /// Identity the callback must come from
    fn reference(&self) -> Identity;

    fn submit(&self, request: &RandomnessRequest) -> ClaimResult<()>;
}

/// Funds released to a vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub invoice: RecordKey,
    pub vendor_name: String,
    pub to: Identity,
    pub amount: TokenAmount,
    pub at: DateTime<Utc>,
    /// Same for every attempt to settle one invoice
    pub reference: String,
}

impl Payout {
    /// Transfer reference for the invoice stored at `invoice`, created at `created_at`
    pub(crate) fn reference_for(invoice: &RecordKey, created_at: DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(invoice.as_bytes());
        hasher.update(created_at.timestamp().to_le_bytes());
        hasher.update(created_at.timestamp_subsec_nanos().to_le_bytes());
        hex::encode(&hasher.finalize()[..16])
    }
}

/// Moves escrowed funds to the vendor.
///
/// Settlement may be retried after a failure, so an implementation that has
/// already paid `payout.reference` must not pay it again.
pub trait Disbursement {
    fn disburse(&self, payout: &Payout) -> ClaimResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_randomness_value_is_little_endian_head() {
        let r = Randomness::from_value(7000);
        assert_eq!(r.value(), 7000);

        let mut bytes = [0xffu8; 32];
        bytes[..8].copy_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(Randomness(bytes).value(), 1);
    }

    #[test]
    fn test_seed_depends_on_client_seed() {
        let invoice = RecordKey::org(&Identity::new([1; 32]));
        let payer = Identity::new([2; 32]);
        let a = RandomnessRequest::derive_seed(&invoice, &payer, "id", 0);
        let b = RandomnessRequest::derive_seed(&invoice, &payer, "id", 1);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_payout_reference_is_stable_per_invoice() {
        let invoice = RecordKey::org(&Identity::new([1; 32]));
        let created = Utc::now();

        let a = Payout::reference_for(&invoice, created);
        assert_eq!(a, Payout::reference_for(&invoice, created));
        assert_eq!(a.len(), 32);
        // A recreated invoice at the same address gets a fresh reference
        assert_ne!(a, Payout::reference_for(&invoice, created + chrono::Duration::seconds(1)));
    }
}
