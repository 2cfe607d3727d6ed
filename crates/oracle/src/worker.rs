//! Extraction worker - polls pending requests and fulfills them
//!
//! Each poll reads the pending requests, runs the extractor on each one
//! without holding the engine lock, then fulfills through the engine as the
//! oracle signer. A failing request is logged and left pending for the next
//! poll.

use claim_core::Identity;
use claim_engine::ClaimEngine;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::WorkerConfig;
use crate::error::OracleError;
use crate::extraction::Extractor;
use crate::randomness::LocalVrf;

pub struct ExtractionWorker {
    engine: Arc<Mutex<ClaimEngine>>,
    extractor: Arc<dyn Extractor>,
    signer: Identity,
    vrf: Option<Arc<LocalVrf>>,
    config: WorkerConfig,
}

impl ExtractionWorker {
    pub fn new(
        engine: Arc<Mutex<ClaimEngine>>,
        extractor: Arc<dyn Extractor>,
        signer: Identity,
        config: WorkerConfig,
    ) -> Self {
        Self {
            engine,
            extractor,
            signer,
            vrf: None,
            config,
        }
    }

    /// Also serve randomness requests addressed to `vrf` on every poll
    pub fn with_vrf(mut self, vrf: Arc<LocalVrf>) -> Self {
        self.vrf = Some(vrf);
        self
    }

    /// One poll. Returns the number of requests fulfilled plus randomness
    /// requests served.
    pub async fn run_once(&self) -> Result<usize, OracleError> {
        let pending = {
            let engine = self.engine.lock().await;
            let mut pending = engine.pending_requests(None)?;
            pending.truncate(self.config.batch_limit);
            pending
        };

        let mut processed = 0;
        for (key, request) in pending {
            let extracted = match self.extractor.extract(&request).await {
                Ok(extracted) => extracted,
                Err(err) => {
                    tracing::error!(request = %key, error = %err, "extraction failed");
                    continue;
                }
            };

            let fulfillment = extracted.into_fulfillment(&request.source_reference);
            let mut engine = self.engine.lock().await;
            match engine.fulfill_request(&self.signer, &key, fulfillment) {
                Ok(invoice) => {
                    processed += 1;
                    tracing::info!(request = %key, invoice = %invoice, "request fulfilled by oracle");
                }
                Err(err) => {
                    tracing::error!(request = %key, error = %err, "fulfillment rejected");
                }
            }
        }

        if let Some(vrf) = &self.vrf {
            let mut engine = self.engine.lock().await;
            processed += vrf.serve(&mut engine)?;
        }

        Ok(processed)
    }

    /// Poll every `poll_interval` until `shutdown` resolves
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), OracleError> {
        let mut interval = tokio::time::interval(self.config.poll_interval());
        tokio::pin!(shutdown);

        tracing::info!(
            signer = %self.signer,
            poll_interval_secs = self.config.poll_interval_secs,
            "extraction worker started"
        );

        let mut polls: u64 = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(polls, "extraction worker stopped");
                    return Ok(());
                }
                _ = interval.tick() => {
                    polls += 1;
                    match self.run_once().await {
                        Ok(0) => tracing::debug!(poll = polls, "no pending requests"),
                        Ok(processed) => tracing::info!(poll = polls, processed, "poll complete"),
                        Err(err) => tracing::error!(poll = polls, error = %err, "poll failed"),
                    }
                }
            }
        }
    }
}
