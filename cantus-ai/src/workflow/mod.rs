//! Enrichment-and-indexing workflow
//!
//! raw batch file → `BatchOrchestrator` (enrich each record) →
//! `IndexPublisher` (settings, write, confirm)

pub mod batch;
pub mod orchestrator;
pub mod publisher;

pub use batch::{load_batch, save_batch};
pub use orchestrator::BatchOrchestrator;
pub use publisher::{ConfirmedPublish, IndexPublisher, IndexingTask, PollPolicy, TaskState};

use crate::error::IndexError;
use crate::services::IndexSettings;
use std::path::Path;
use tracing::{info, warn};

/// Default destination index
pub const DEFAULT_INDEX_NAME: &str = "classical_music_enriched_by_ai";

/// Attributes searched, in ranking order
pub const SEARCHABLE_ATTRIBUTES: [&str; 8] = [
    "title",
    "composer",
    "type",
    "ai_description",
    "ai_mood",
    "ai_keywords",
    "ai_semantic_tags",
    "ai_similar_works_description",
];

/// Settings applied to the destination index before each publish
pub fn default_index_settings() -> IndexSettings {
    IndexSettings::searchable(SEARCHABLE_ATTRIBUTES)
}

/// Result of a full pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// No records came out of enrichment; the index was not touched
    NothingToIndex,
    Published {
        confirmation: ConfirmedPublish,
        degraded: usize,
    },
}

/// Enrich a batch file and publish it
///
/// An empty enrichment result (empty or unreadable input) never reaches the
/// index backend.
pub async fn run_pipeline(
    orchestrator: &BatchOrchestrator,
    publisher: &IndexPublisher,
    input: &Path,
    index_name: &str,
    settings: &IndexSettings,
) -> Result<PipelineOutcome, IndexError> {
    info!(index = %index_name, input = %input.display(), "Starting enrichment and indexing");

    let enriched = orchestrator.load_and_run(input).await;
    if enriched.is_empty() {
        warn!("No music works were enriched. Nothing to index.");
        return Ok(PipelineOutcome::NothingToIndex);
    }

    let degraded = enriched.iter().filter(|r| r.is_degraded()).count();
    info!(
        count = enriched.len(),
        degraded,
        index = %index_name,
        "Enriched batch ready, indexing"
    );

    let confirmation = publisher.publish(index_name, settings, &enriched).await?;
    info!(
        index = %index_name,
        records = confirmation.record_count,
        "Successfully indexed music works"
    );

    Ok(PipelineOutcome::Published {
        confirmation,
        degraded,
    })
}
