//! Org Config Manager

use claim_core::{Identity, RecordKey, TokenAmount};
use serde::{Deserialize, Serialize};

use crate::engine::{journal, ClaimEngine};
use crate::error::{ClaimError, ClaimResult};
use crate::event::ClaimEvent;
use crate::state::{validate_audit_rate, validate_caps, OrgConfig, Role};

/// Parameters for creating an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgInit {
    pub authority: Identity,
    /// Defaults to the authority when omitted
    pub oracle_signer: Option<Identity>,
    pub per_invoice_cap: TokenAmount,
    pub daily_cap: TokenAmount,
    pub audit_rate_bps: u16,
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgUpdate {
    pub oracle_signer: Option<Identity>,
    pub per_invoice_cap: Option<TokenAmount>,
    pub daily_cap: Option<TokenAmount>,
    pub paused: Option<bool>,
    pub audit_rate_bps: Option<u16>,
}

impl ClaimEngine {
    /// Create the configuration for `params.authority`'s organization
    pub fn init_org(&mut self, params: OrgInit) -> ClaimResult<RecordKey> {
        validate_audit_rate(params.audit_rate_bps)?;
        validate_caps(params.per_invoice_cap, params.daily_cap)?;

        let now = self.now();
        let key = RecordKey::org(&params.authority);
        let config = OrgConfig {
            authority: params.authority,
            oracle_signer: params.oracle_signer.unwrap_or(params.authority),
            per_invoice_cap: params.per_invoice_cap,
            daily_cap: params.daily_cap,
            daily_spent: TokenAmount::ZERO,
            last_reset_day: self.config.day_index(now.timestamp()),
            audit_rate_bps: params.audit_rate_bps,
            paused: false,
            invoice_counter: 0,
            version: OrgConfig::VERSION,
            created_at: now,
        };

        self.store.atomically(|tx| {
            tx.create(&key, &config)?;
            journal(
                tx,
                ClaimEvent::OrgInitialized {
                    org: key,
                    authority: config.authority,
                    oracle_signer: config.oracle_signer,
                    per_invoice_cap: config.per_invoice_cap,
                    daily_cap: config.daily_cap,
                    audit_rate_bps: config.audit_rate_bps,
                    timestamp: now,
                },
            )
        })?;

        tracing::info!(
            org = %key,
            authority = %config.authority,
            audit_rate_bps = config.audit_rate_bps,
            "organization initialized"
        );
        Ok(key)
    }

    /// Apply a partial update. Authority only.
    pub fn update_org(
        &mut self,
        caller: &Identity,
        org: &RecordKey,
        update: OrgUpdate,
    ) -> ClaimResult<OrgConfig> {
        let now = self.now();

        let updated = self.store.atomically(|tx| {
            let mut config: OrgConfig = tx.fetch(org)?;
            config.require_role(caller, &[Role::Authority])?;

            if let Some(signer) = update.oracle_signer {
                config.oracle_signer = signer;
            }
            if let Some(cap) = update.per_invoice_cap {
                config.per_invoice_cap = cap;
            }
            if let Some(cap) = update.daily_cap {
                config.daily_cap = cap;
            }
            if let Some(paused) = update.paused {
                config.paused = paused;
            }
            if let Some(bps) = update.audit_rate_bps {
                validate_audit_rate(bps)?;
                config.audit_rate_bps = bps;
            }
            validate_caps(config.per_invoice_cap, config.daily_cap)?;

            tx.save(org, &config)?;
            journal(
                tx,
                ClaimEvent::OrgUpdated {
                    org: *org,
                    oracle_signer: config.oracle_signer,
                    per_invoice_cap: config.per_invoice_cap,
                    daily_cap: config.daily_cap,
                    audit_rate_bps: config.audit_rate_bps,
                    paused: config.paused,
                    timestamp: now,
                },
            )?;
            Ok::<_, ClaimError>(config)
        })?;

        tracing::info!(org = %org, paused = updated.paused, "organization updated");
        Ok(updated)
    }

    pub fn org(&self, org: &RecordKey) -> ClaimResult<OrgConfig> {
        self.store.read(|tx| tx.fetch(org)).map_err(ClaimError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> Identity {
        Identity::new([1; 32])
    }

    fn tokens(n: u64) -> TokenAmount {
        TokenAmount::from_whole(n).unwrap()
    }

    fn params() -> OrgInit {
        OrgInit {
            authority: authority(),
            oracle_signer: None,
            per_invoice_cap: tokens(1_000),
            daily_cap: tokens(5_000),
            audit_rate_bps: 500,
        }
    }

    #[test]
    fn test_init_defaults_oracle_signer_to_authority() {
        let mut engine = ClaimEngine::in_memory().unwrap();
        let key = engine.init_org(params()).unwrap();

        let config = engine.org(&key).unwrap();
        assert_eq!(key, RecordKey::org(&authority()));
        assert_eq!(config.oracle_signer, authority());
        assert!(config.daily_spent.is_zero());
        assert!(!config.paused);
    }

    #[test]
    fn test_init_twice_fails() {
        let mut engine = ClaimEngine::in_memory().unwrap();
        engine.init_org(params()).unwrap();

        let result = engine.init_org(params());
        assert!(matches!(result, Err(ClaimError::AlreadyExists(_))));
    }

    #[test]
    fn test_init_rejects_invalid_parameters() {
        let mut engine = ClaimEngine::in_memory().unwrap();

        let mut p = params();
        p.audit_rate_bps = 10_001;
        assert!(matches!(engine.init_org(p), Err(ClaimError::InvalidParameter(_))));

        let mut p = params();
        p.daily_cap = tokens(10);
        assert!(matches!(engine.init_org(p), Err(ClaimError::InvalidParameter(_))));

        let mut p = params();
        p.per_invoice_cap = TokenAmount::ZERO;
        assert!(matches!(engine.init_org(p), Err(ClaimError::InvalidParameter(_))));

        // 100% sampling is allowed
        let mut p = params();
        p.audit_rate_bps = 10_000;
        assert!(engine.init_org(p).is_ok());
    }

    #[test]
    fn test_update_applies_only_provided_fields() {
        let mut engine = ClaimEngine::in_memory().unwrap();
        let key = engine.init_org(params()).unwrap();
        let signer = Identity::new([7; 32]);

        let updated = engine
            .update_org(
                &authority(),
                &key,
                OrgUpdate {
                    oracle_signer: Some(signer),
                    paused: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.oracle_signer, signer);
        assert!(updated.paused);
        assert_eq!(updated.per_invoice_cap, tokens(1_000));
        assert_eq!(updated.audit_rate_bps, 500);
    }

    #[test]
    fn test_update_requires_authority() {
        let mut engine = ClaimEngine::in_memory().unwrap();
        let key = engine.init_org(params()).unwrap();

        let result = engine.update_org(&Identity::new([9; 32]), &key, OrgUpdate::default());
        assert!(matches!(result, Err(ClaimError::Unauthorized(_))));
    }

    #[test]
    fn test_invalid_update_leaves_config_unchanged() {
        let mut engine = ClaimEngine::in_memory().unwrap();
        let key = engine.init_org(params()).unwrap();

        let result = engine.update_org(
            &authority(),
            &key,
            OrgUpdate {
                paused: Some(true),
                audit_rate_bps: Some(20_000),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ClaimError::InvalidParameter(_))));

        let result = engine.update_org(
            &authority(),
            &key,
            OrgUpdate {
                daily_cap: Some(tokens(1)),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ClaimError::InvalidParameter(_))));

        let config = engine.org(&key).unwrap();
        assert!(!config.paused);
        assert_eq!(config.audit_rate_bps, 500);
        assert_eq!(config.daily_cap, tokens(5_000));
    }

    #[test]
    fn test_missing_org() {
        let engine = ClaimEngine::in_memory().unwrap();
        let result = engine.org(&RecordKey::org(&authority()));
        assert!(matches!(result, Err(ClaimError::NotFound(_))));
    }
}
