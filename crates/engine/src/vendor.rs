//! Vendor Registry

use claim_core::{Identity, RecordKey, TokenAmount};

use crate::config::EngineConfig;
use crate::engine::{journal, ClaimEngine};
use crate::error::{ClaimError, ClaimResult};
use crate::event::ClaimEvent;
use crate::state::{OrgConfig, Role, VendorAccount};

pub(crate) fn validate_vendor_name(config: &EngineConfig, name: &str) -> ClaimResult<()> {
    if name.is_empty() {
        return Err(ClaimError::InvalidParameter("vendor name is empty".into()));
    }
    if name.len() > config.max_vendor_name_len {
        return Err(ClaimError::InvalidParameter(format!(
            "vendor name longer than {} bytes",
            config.max_vendor_name_len
        )));
    }
    Ok(())
}

fn validate_payout(payout_identity: &Identity) -> ClaimResult<()> {
    if payout_identity.is_zero() {
        return Err(ClaimError::InvalidParameter("payout identity is unset".into()));
    }
    Ok(())
}

impl ClaimEngine {
    /// Register a vendor under `org`. Authority only.
    pub fn register_vendor(
        &mut self,
        caller: &Identity,
        org: &RecordKey,
        name: &str,
        payout_identity: Identity,
    ) -> ClaimResult<RecordKey> {
        validate_vendor_name(&self.config, name)?;
        validate_payout(&payout_identity)?;

        let now = self.now();
        let key = RecordKey::vendor(org, name);

        self.store.atomically(|tx| {
            let config: OrgConfig = tx.fetch(org)?;
            config.require_role(caller, &[Role::Authority])?;

            let vendor = VendorAccount {
                org: *org,
                name: name.to_string(),
                payout_identity,
                total_paid: TokenAmount::ZERO,
                last_payment: None,
                is_active: true,
                registered_at: now,
            };
            tx.create(&key, &vendor)?;
            journal(
                tx,
                ClaimEvent::VendorRegistered {
                    org: *org,
                    vendor: key,
                    name: name.to_string(),
                    payout_identity,
                    timestamp: now,
                },
            )
        })?;

        tracing::info!(org = %org, vendor = %key, name, "vendor registered");
        Ok(key)
    }

    pub fn activate_vendor(&mut self, caller: &Identity, org: &RecordKey, name: &str) -> ClaimResult<VendorAccount> {
        self.set_vendor_active(caller, org, name, true)
    }

    pub fn deactivate_vendor(&mut self, caller: &Identity, org: &RecordKey, name: &str) -> ClaimResult<VendorAccount> {
        self.set_vendor_active(caller, org, name, false)
    }

    fn set_vendor_active(
        &mut self,
        caller: &Identity,
        org: &RecordKey,
        name: &str,
        active: bool,
    ) -> ClaimResult<VendorAccount> {
        let now = self.now();
        let key = RecordKey::vendor(org, name);

        let vendor = self.store.atomically(|tx| {
            let config: OrgConfig = tx.fetch(org)?;
            config.require_role(caller, &[Role::Authority])?;

            let mut vendor: VendorAccount = tx.fetch(&key)?;
            if vendor.is_active == active {
                return Err(ClaimError::InvalidState(format!(
                    "vendor {name} is already {}",
                    if active { "active" } else { "inactive" }
                )));
            }
            vendor.is_active = active;
            tx.save(&key, &vendor)?;
            journal(
                tx,
                ClaimEvent::VendorStatusChanged {
                    vendor: key,
                    is_active: active,
                    timestamp: now,
                },
            )?;
            Ok::<_, ClaimError>(vendor)
        })?;

        tracing::info!(vendor = %key, is_active = active, "vendor status changed");
        Ok(vendor)
    }

    /// Change where a vendor is paid. Authority only.
    pub fn update_vendor_payout(
        &mut self,
        caller: &Identity,
        org: &RecordKey,
        name: &str,
        payout_identity: Identity,
    ) -> ClaimResult<VendorAccount> {
        validate_payout(&payout_identity)?;

        let now = self.now();
        let key = RecordKey::vendor(org, name);

        let vendor = self.store.atomically(|tx| {
            let config: OrgConfig = tx.fetch(org)?;
            config.require_role(caller, &[Role::Authority])?;

            let mut vendor: VendorAccount = tx.fetch(&key)?;
            vendor.payout_identity = payout_identity;
            tx.save(&key, &vendor)?;
            journal(
                tx,
                ClaimEvent::VendorPayoutUpdated {
                    vendor: key,
                    payout_identity,
                    timestamp: now,
                },
            )?;
            Ok::<_, ClaimError>(vendor)
        })?;

        tracing::info!(vendor = %key, payout = %payout_identity, "vendor payout updated");
        Ok(vendor)
    }

    pub fn vendor(&self, org: &RecordKey, name: &str) -> ClaimResult<VendorAccount> {
        let key = RecordKey::vendor(org, name);
        self.store.read(|tx| tx.fetch(&key)).map_err(ClaimError::from)
    }

    /// All vendors registered under `org`
    pub fn vendors(&self, org: &RecordKey) -> ClaimResult<Vec<VendorAccount>> {
        let all: Vec<(RecordKey, VendorAccount)> = self.store.read(|tx| tx.list())?;
        Ok(all
            .into_iter()
            .filter(|(_, vendor)| vendor.org == *org)
            .map(|(_, vendor)| vendor)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::org::OrgInit;

    fn authority() -> Identity {
        Identity::new([1; 32])
    }

    fn payout() -> Identity {
        Identity::new([5; 32])
    }

    fn setup() -> (ClaimEngine, RecordKey) {
        let mut engine = ClaimEngine::in_memory().unwrap();
        let org = engine
            .init_org(OrgInit {
                authority: authority(),
                oracle_signer: None,
                per_invoice_cap: TokenAmount::from_whole(100).unwrap(),
                daily_cap: TokenAmount::from_whole(1_000).unwrap(),
                audit_rate_bps: 0,
            })
            .unwrap();
        (engine, org)
    }

    #[test]
    fn test_register_vendor() {
        let (mut engine, org) = setup();
        let key = engine.register_vendor(&authority(), &org, "Acme", payout()).unwrap();

        assert_eq!(key, RecordKey::vendor(&org, "Acme"));
        let vendor = engine.vendor(&org, "Acme").unwrap();
        assert!(vendor.is_active);
        assert!(vendor.total_paid.is_zero());
        assert_eq!(vendor.payout_identity, payout());
    }

    #[test]
    fn test_register_duplicate_fails() {
        let (mut engine, org) = setup();
        engine.register_vendor(&authority(), &org, "Acme", payout()).unwrap();

        let result = engine.register_vendor(&authority(), &org, "Acme", Identity::new([6; 32]));
        assert!(matches!(result, Err(ClaimError::AlreadyExists(_))));
    }

    #[test]
    fn test_register_requires_authority() {
        let (mut engine, org) = setup();
        let result = engine.register_vendor(&Identity::new([9; 32]), &org, "Acme", payout());
        assert!(matches!(result, Err(ClaimError::Unauthorized(_))));
        assert!(engine.vendors(&org).unwrap().is_empty());
    }

    #[test]
    fn test_register_validates_input() {
        let (mut engine, org) = setup();

        let result = engine.register_vendor(&authority(), &org, "", payout());
        assert!(matches!(result, Err(ClaimError::InvalidParameter(_))));

        let long = "x".repeat(51);
        let result = engine.register_vendor(&authority(), &org, &long, payout());
        assert!(matches!(result, Err(ClaimError::InvalidParameter(_))));

        let result = engine.register_vendor(&authority(), &org, "Acme", Identity::ZERO);
        assert!(matches!(result, Err(ClaimError::InvalidParameter(_))));

        let max = "x".repeat(50);
        assert!(engine.register_vendor(&authority(), &org, &max, payout()).is_ok());
    }

    #[test]
    fn test_activate_deactivate() {
        let (mut engine, org) = setup();
        engine.register_vendor(&authority(), &org, "Acme", payout()).unwrap();

        let result = engine.activate_vendor(&authority(), &org, "Acme");
        assert!(matches!(result, Err(ClaimError::InvalidState(_))));

        let vendor = engine.deactivate_vendor(&authority(), &org, "Acme").unwrap();
        assert!(!vendor.is_active);

        let vendor = engine.activate_vendor(&authority(), &org, "Acme").unwrap();
        assert!(vendor.is_active);
    }

    #[test]
    fn test_update_payout() {
        let (mut engine, org) = setup();
        engine.register_vendor(&authority(), &org, "Acme", payout()).unwrap();

        let next = Identity::new([8; 32]);
        let vendor = engine.update_vendor_payout(&authority(), &org, "Acme", next).unwrap();
        assert_eq!(vendor.payout_identity, next);

        let result = engine.update_vendor_payout(&authority(), &org, "Acme", Identity::ZERO);
        assert!(matches!(result, Err(ClaimError::InvalidParameter(_))));
    }

    #[test]
    fn test_list_is_scoped_to_org() {
        let (mut engine, org) = setup();
        engine.register_vendor(&authority(), &org, "Acme", payout()).unwrap();
        engine.register_vendor(&authority(), &org, "Globex", payout()).unwrap();

        let other_authority = Identity::new([2; 32]);
        let other = engine
            .init_org(OrgInit {
                authority: other_authority,
                oracle_signer: None,
                per_invoice_cap: TokenAmount::from_whole(1).unwrap(),
                daily_cap: TokenAmount::from_whole(1).unwrap(),
                audit_rate_bps: 0,
            })
            .unwrap();
        engine.register_vendor(&other_authority, &other, "Acme", payout()).unwrap();

        assert_eq!(engine.vendors(&org).unwrap().len(), 2);
        assert_eq!(engine.vendors(&other).unwrap().len(), 1);
    }
}
