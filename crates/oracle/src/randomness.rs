//! Local VRF - ed25519-keyed randomness oracle
//!
//! Output for a request is `sha256(signature(request.message()))`. Ed25519
//! signatures are deterministic, so the output is fixed by the key and the
//! request, and anyone holding the oracle's public identity can verify it.

use claim_core::{Identity, Keypair, RecordKey};
use claim_engine::{
    ClaimEngine, ClaimError, ClaimResult, InvoiceStatus, Randomness, RandomnessQueue, RandomnessRequest,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, PoisonError};

use crate::error::OracleError;

/// Randomness plus the proof it was produced by the oracle key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessFulfillment {
    pub request_id: String,
    pub invoice: RecordKey,
    pub randomness: Randomness,
    /// Hex-encoded ed25519 signature over the request message
    pub proof: String,
}

/// In-process randomness queue keyed by an ed25519 signing key
pub struct LocalVrf {
    keypair: Keypair,
    queued: Mutex<Vec<RandomnessRequest>>,
}

impl LocalVrf {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            queued: Mutex::new(Vec::new()),
        }
    }

    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    /// Produce randomness and proof for a request
    pub fn prove(&self, request: &RandomnessRequest) -> RandomnessFulfillment {
        let signature = self.keypair.sign(&request.message());
        RandomnessFulfillment {
            request_id: request.request_id.clone(),
            invoice: request.invoice,
            randomness: Randomness(Sha256::digest(signature).into()),
            proof: hex::encode(signature),
        }
    }

    /// Check a fulfillment against `oracle`'s public identity
    pub fn verify(
        oracle: &Identity,
        request: &RandomnessRequest,
        fulfillment: &RandomnessFulfillment,
    ) -> Result<Randomness, OracleError> {
        let failed = |reason: String| OracleError::VerificationFailed {
            request_id: request.request_id.clone(),
            reason,
        };

        if fulfillment.request_id != request.request_id || fulfillment.invoice != request.invoice {
            return Err(failed("fulfillment belongs to another request".into()));
        }

        let signature = hex::decode(&fulfillment.proof).map_err(|e| failed(e.to_string()))?;
        oracle
            .verify(&request.message(), &signature)
            .map_err(|e| failed(e.to_string()))?;

        let expected = Randomness(Sha256::digest(&signature).into());
        if expected != fulfillment.randomness {
            return Err(failed("randomness does not match proof".into()));
        }
        Ok(expected)
    }

    /// Requests submitted to this queue and not yet served
    pub fn queued(&self) -> Vec<RandomnessRequest> {
        self.queued.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Serve every outstanding request addressed to this oracle.
    ///
    /// Outstanding requests are read from the engine, so requests made by an
    /// earlier process are served too. Failures are logged and skipped.
    pub fn serve(&self, engine: &mut ClaimEngine) -> Result<usize, OracleError> {
        let me = self.identity();
        let pending: Vec<RandomnessRequest> = engine
            .pending_randomness()?
            .into_iter()
            .filter(|request| request.oracle == me)
            .collect();

        let mut served = 0;
        for request in &pending {
            let fulfillment = self.prove(request);
            let randomness = Self::verify(&me, request, &fulfillment)?;

            match engine.on_randomness_fulfilled(&me, &request.invoice, &randomness) {
                Ok(status) => {
                    served += 1;
                    tracing::info!(
                        request_id = %request.request_id,
                        invoice = %request.invoice,
                        selected = matches!(status, InvoiceStatus::AuditPending),
                        "randomness served"
                    );
                }
                Err(err) => {
                    tracing::error!(request_id = %request.request_id, error = %err, "randomness callback failed");
                }
            }
        }

        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|queued| !pending.iter().any(|p| p.request_id == queued.request_id));
        Ok(served)
    }
}

impl RandomnessQueue for LocalVrf {
    fn reference(&self) -> Identity {
        self.identity()
    }

    fn submit(&self, request: &RandomnessRequest) -> ClaimResult<()> {
        if request.oracle != self.identity() {
            return Err(ClaimError::Oracle(format!(
                "request {} addressed to another oracle",
                request.request_id
            )));
        }
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        tracing::debug!(request_id = %request.request_id, "randomness request queued");
        Ok(())
    }
}
