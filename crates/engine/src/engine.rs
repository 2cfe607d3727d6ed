//! Claim Engine - main orchestrator
//!
//! Owns the account store, the configuration and the clock. The workflow
//! operations themselves live in the `org`, `vendor`, `request`, `audit`,
//! `invoice` and `lifecycle` modules as further `impl ClaimEngine` blocks.

use chrono::{DateTime, Utc};
use claim_core::{Clock, SystemClock};
use claim_store::{AccountStore, StoreError, StoreTx};
use std::path::Path;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{ClaimError, ClaimResult};
use crate::event::ClaimEvent;

/// Main workflow engine. Single writer: every mutation takes `&mut self`.
pub struct ClaimEngine {
    pub(crate) store: AccountStore,
    pub(crate) config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl ClaimEngine {
    pub fn new(store: AccountStore, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: store.with_clock(clock.clone()),
            config,
            clock,
        }
    }

    /// Open a file-backed engine using wall-clock time
    pub fn open<P: AsRef<Path>>(path: P, config: EngineConfig) -> ClaimResult<Self> {
        let store = AccountStore::open(path)?;
        Ok(Self::new(store, config, Arc::new(SystemClock)))
    }

    /// Create an engine with an in-memory store (for testing)
    pub fn in_memory() -> ClaimResult<Self> {
        Ok(Self::new(
            AccountStore::in_memory()?,
            EngineConfig::default(),
            Arc::new(SystemClock),
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Most recent journal events, oldest first
    pub fn history(&self, limit: usize) -> ClaimResult<Vec<ClaimEvent>> {
        self.store
            .events(limit)?
            .into_iter()
            .map(|stored| {
                serde_json::from_value(stored.payload)
                    .map_err(|e| ClaimError::Store(StoreError::Serialization(e)))
            })
            .collect()
    }
}

/// Append an event within the operation's transaction
pub(crate) fn journal(tx: &StoreTx<'_>, event: ClaimEvent) -> ClaimResult<()> {
    tx.append_event(event.event_type(), &event, event.timestamp())?;
    Ok(())
}
