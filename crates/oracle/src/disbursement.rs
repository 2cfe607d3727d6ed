//! Recording disbursement - payouts kept in memory and optionally appended
//! to a JSONL log
//!
//! A payout whose reference is already recorded (including entries read back
//! from an existing log) is acknowledged without being recorded again.

use claim_engine::{ClaimResult, Disbursement, Payout};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::error::OracleError;

pub struct RecordingDisbursement {
    payouts: Mutex<Vec<Payout>>,
    log: Option<Mutex<File>>,
}

impl RecordingDisbursement {
    /// Disbursement that appends every payout to `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, OracleError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut payouts = Vec::new();
        if path.exists() {
            for line in BufReader::new(File::open(path)?).lines() {
                let line = line?;
                if !line.trim().is_empty() {
                    payouts.push(serde_json::from_str::<Payout>(&line)?);
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            payouts: Mutex::new(payouts),
            log: Some(Mutex::new(file)),
        })
    }

    /// Create an in-memory disbursement (for testing)
    pub fn in_memory() -> Self {
        Self {
            payouts: Mutex::new(Vec::new()),
            log: None,
        }
    }

    pub fn payouts(&self) -> Vec<Payout> {
        self.payouts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn append(&self, payout: &Payout) -> Result<(), OracleError> {
        if let Some(log) = &self.log {
            let json = serde_json::to_string(payout)?;
            let mut file = log.lock().unwrap_or_else(PoisonError::into_inner);
            writeln!(file, "{json}")?;
            file.flush()?;
        }
        Ok(())
    }
}

impl Disbursement for RecordingDisbursement {
    fn disburse(&self, payout: &Payout) -> ClaimResult<()> {
        let mut payouts = self.payouts.lock().unwrap_or_else(PoisonError::into_inner);
        if payouts.iter().any(|paid| paid.reference == payout.reference) {
            tracing::warn!(reference = %payout.reference, "payout already recorded, skipping");
            return Ok(());
        }

        self.append(payout)?;
        payouts.push(payout.clone());
        tracing::info!(to = %payout.to, amount = %payout.amount, reference = %payout.reference, "payout recorded");
        Ok(())
    }
}
