//! Per-record AI enrichment
//!
//! Builds the metadata prompt for one record, sends it to the generative
//! model, and extracts the structured result. `enrich` never fails: any
//! transport, shape, or extraction error degrades to the fixed fallback.

use crate::error::EnrichmentError;
use crate::extraction::extract_metadata;
use crate::services::gemini_client::GenerativeModel;
use crate::types::{EnrichmentOutcome, EnrichmentResult, RawRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

const NOT_AVAILABLE: &str = "N/A";

/// Build the enrichment prompt for one record
pub fn build_prompt(record: &RawRecord) -> String {
    let work_type = non_blank(record.work_type.as_deref()).unwrap_or(NOT_AVAILABLE);
    let language = non_blank(record.language.as_deref()).unwrap_or(NOT_AVAILABLE);
    let attributes = if record.attributes.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        record.attributes.join(", ")
    };

    format!(
        r#"You are an expert in classical and choral music. Your task is to provide concise, structured metadata for a musical work.

Given the following information about a classical music piece:
Title: "{title}"
Composer: "{composer}"
Type: "{work_type}"
Attributes: "{attributes}"
Language: "{language}"

Please provide the following in JSON format:
1. **description**: A 1-2 sentence contextual description, including style period (e.g., Baroque, Romantic), typical performance context (e.g., sacred, secular, opera, chamber), and a unique characteristic.
2. **mood**: A single general mood or a short list of primary moods (e.g., "Joyful", "Solemn", "Dramatic", "Meditative").
3. **keywords**: 5-7 relevant keywords (e.g., "Cantata", "Oratorio", "Symphony", "Aria", "Choral", "Soloist", "Orchestral").
4. **semantic_tags**: 3-5 high-level semantic tags related to its meaning or common themes (e.g., "Resurrection", "Love", "Nature", "Devotion", "Celebration", "Tragedy"). Infer them from title, composer and type.
5. **similar_works_description**: A brief description of what kind of works it is similar to, conceptually, without naming specific pieces (e.g., "Similar to other contrapuntal works of the Baroque era").

Ensure the output is ONLY the JSON object. Do not include any other text or markdown outside the JSON."#,
        title = record.title,
        composer = record.composer,
    )
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Enrichment client wrapping a generative model backend
#[derive(Clone)]
pub struct EnrichmentClient {
    model: Arc<dyn GenerativeModel>,
}

impl EnrichmentClient {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Enrich one record
    ///
    /// Always returns a usable outcome. Failures are logged with the record
    /// id and title and come back as `EnrichmentOutcome::Degraded`.
    pub async fn enrich(&self, record: &RawRecord) -> EnrichmentOutcome {
        info!(
            object_id = %record.object_id,
            title = %record.title,
            backend = self.model.name(),
            "Sending record for enrichment"
        );

        match self.try_enrich(record).await {
            Ok(result) => {
                info!(object_id = %record.object_id, "Enrichment successful");
                EnrichmentOutcome::Enriched(result)
            }
            Err(e) => {
                warn!(
                    object_id = %record.object_id,
                    title = %record.title,
                    error = %e,
                    "Enrichment failed, using fallback"
                );
                EnrichmentOutcome::degraded(e.to_string())
            }
        }
    }

    async fn try_enrich(&self, record: &RawRecord) -> Result<EnrichmentResult, EnrichmentError> {
        let prompt = build_prompt(record);
        let text = self.model.generate(&prompt).await?;

        extract_metadata(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            debug!(
                object_id = %record.object_id,
                response = %preview,
                "Could not extract metadata from model response"
            );
            EnrichmentError::from(e)
        })
    }
}
