//! Application context - wires everything together

use claim_core::{Identity, Keypair, RecordKey};
use claim_engine::{ClaimEngine, EngineConfig};
use claim_oracle::{LocalVrf, RecordingDisbursement, WorkerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Combined configuration file: `{ "engine": { .. }, "worker": { .. } }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Application context - wires together all components
pub struct AppContext {
    pub engine: Arc<Mutex<ClaimEngine>>,
    pub config: AppConfig,
    keypair: Option<Keypair>,
    data_path: PathBuf,
}

impl AppContext {
    /// Open (or create) the data directory and its store
    pub async fn new(
        data_path: impl AsRef<Path>,
        config: AppConfig,
        keypair: Option<Keypair>,
    ) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_path)?;

        let engine = ClaimEngine::open(data_path.join("claims.db"), config.engine.clone())?;
        tracing::debug!(data = %data_path.display(), "store opened");

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            config,
            keypair,
            data_path,
        })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Keypair of the operator running the command
    pub fn keypair(&self) -> Result<&Keypair, anyhow::Error> {
        self.keypair
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No keypair configured (use --keypair or CLAIM_KEYPAIR)"))
    }

    /// Identity of the operator running the command
    pub fn caller(&self) -> Result<Identity, anyhow::Error> {
        Ok(self.keypair()?.identity())
    }

    /// Resolve an org key from its authority, defaulting to the caller
    pub fn org_key(&self, authority: Option<Identity>) -> Result<RecordKey, anyhow::Error> {
        let authority = match authority {
            Some(authority) => authority,
            None => self.caller()?,
        };
        Ok(RecordKey::org(&authority))
    }

    /// Randomness oracle keyed by `vrf.key` in the data directory.
    ///
    /// The key is generated on first use so sampling and serving agree on
    /// the oracle identity across runs.
    pub fn vrf(&self) -> Result<LocalVrf, anyhow::Error> {
        let path = self.data_path.join("vrf.key");
        let keypair = if path.exists() {
            Keypair::read_file(&path)?
        } else {
            let keypair = Keypair::generate();
            keypair.write_file(&path)?;
            tracing::info!(oracle = %keypair.identity(), "randomness oracle key generated");
            keypair
        };
        Ok(LocalVrf::new(keypair))
    }

    /// Payout sink appending to `payouts.jsonl` in the data directory
    pub fn disbursement(&self) -> Result<RecordingDisbursement, anyhow::Error> {
        Ok(RecordingDisbursement::new(self.data_path.join("payouts.jsonl"))?)
    }
}
