//! Batch Orchestrator
//!
//! Drives the enrichment client over an ordered batch, one record at a time.
//!
//! # Error Handling
//! - Per-record isolation: enrichment failures degrade to the fallback and
//!   the batch continues
//! - The output always has one enriched record per input, in input order
//! - An unreadable batch file yields an empty output, never a partial one

use super::batch::load_batch;
use crate::pacing::Pacer;
use crate::services::EnrichmentClient;
use crate::types::{EnrichedRecord, RawRecord};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Sequential enrichment over a batch
pub struct BatchOrchestrator {
    enricher: EnrichmentClient,
    pacer: Arc<dyn Pacer>,
}

impl BatchOrchestrator {
    pub fn new(enricher: EnrichmentClient, pacer: Arc<dyn Pacer>) -> Self {
        Self { enricher, pacer }
    }

    /// Enrich every record, preserving order
    ///
    /// The pacer is awaited between records, not after the last one.
    pub async fn run(&self, records: Vec<RawRecord>) -> Vec<EnrichedRecord> {
        info!(count = records.len(), "Starting AI enrichment");

        let total = records.len();
        let mut enriched = Vec::with_capacity(total);

        for (i, record) in records.into_iter().enumerate() {
            if i > 0 {
                self.pacer.pace().await;
            }

            let outcome = self.enricher.enrich(&record).await;
            enriched.push(EnrichedRecord::merge(record, outcome));
        }

        let degraded = enriched.iter().filter(|r| r.is_degraded()).count();
        info!(
            total,
            enriched = total - degraded,
            degraded,
            "AI enrichment complete"
        );

        enriched
    }

    /// Load a batch file and enrich it
    ///
    /// A load failure is reported and returns an empty batch; callers detect
    /// emptiness.
    pub async fn load_and_run(&self, path: &Path) -> Vec<EnrichedRecord> {
        match load_batch(path).await {
            Ok(records) => self.run(records).await,
            Err(e) => {
                error!(error = %e, "Could not load batch, nothing will be enriched");
                Vec::new()
            }
        }
    }
}
