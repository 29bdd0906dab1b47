//! Record types flowing through the enrichment pipeline
//!
//! - `RawRecord`: one musical work as read from the input file
//! - `EnrichmentResult` / `EnrichmentOutcome`: model output for one record
//! - `EnrichedRecord`: the raw record with `ai_*` fields merged in, ready to index

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Description used when enrichment could not be completed
pub const FALLBACK_DESCRIPTION: &str = "AI enrichment failed.";

/// Similar-works text used when enrichment could not be completed
pub const FALLBACK_SIMILAR_WORKS: &str = "AI analysis unavailable.";

/// Field names written by the merge step
pub const AI_FIELDS: [&str; 5] = [
    "ai_description",
    "ai_mood",
    "ai_keywords",
    "ai_semantic_tags",
    "ai_similar_works_description",
];

/// One musical work as produced by the fetch step
///
/// Unknown fields (MBIDs, ISWCs, placeholder URLs) are kept in `extra` and
/// written back to the index untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Externally assigned unique id, used as the index object id
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: String,
    pub composer: String,
    /// Work type (e.g. "Cantata", "Mass")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub work_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attributes: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawRecord {
    pub fn new(
        object_id: impl Into<String>,
        title: impl Into<String>,
        composer: impl Into<String>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            title: title.into(),
            composer: composer.into(),
            work_type: None,
            language: None,
            attributes: Vec::new(),
            extra: Map::new(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalized metadata produced by the model for one record
///
/// List fields are always lists, never raw comma-separated strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub description: Option<String>,
    pub mood: Vec<String>,
    pub keywords: Vec<String>,
    pub semantic_tags: Vec<String>,
    pub similar_works_description: Option<String>,
}

impl EnrichmentResult {
    /// Fixed substitute used whenever enrichment cannot be completed
    pub fn fallback() -> Self {
        Self {
            description: Some(FALLBACK_DESCRIPTION.to_string()),
            mood: Vec::new(),
            keywords: Vec::new(),
            semantic_tags: Vec::new(),
            similar_works_description: Some(FALLBACK_SIMILAR_WORKS.to_string()),
        }
    }
}

/// Result of enriching one record
///
/// `Degraded` always carries `EnrichmentResult::fallback()` plus the reason
/// the model output could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    Enriched(EnrichmentResult),
    Degraded {
        result: EnrichmentResult,
        reason: String,
    },
}

impl EnrichmentOutcome {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            result: EnrichmentResult::fallback(),
            reason: reason.into(),
        }
    }

    pub fn result(&self) -> &EnrichmentResult {
        match self {
            Self::Enriched(result) | Self::Degraded { result, .. } => result,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Failure reason, for degraded outcomes
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Enriched(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn into_result(self) -> EnrichmentResult {
        match self {
            Self::Enriched(result) | Self::Degraded { result, .. } => result,
        }
    }
}

/// Raw record with enrichment merged under the `ai_` namespace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: RawRecord,
    pub ai_description: Option<String>,
    pub ai_mood: Vec<String>,
    pub ai_keywords: Vec<String>,
    pub ai_semantic_tags: Vec<String>,
    pub ai_similar_works_description: Option<String>,
    /// Fallback reason when enrichment degraded (not indexed)
    #[serde(skip)]
    pub degraded_reason: Option<String>,
}

impl EnrichedRecord {
    /// Merge an enrichment outcome into its record
    ///
    /// Any `ai_*` keys already present in the raw record's extra fields are
    /// dropped so the serialized object never carries duplicate keys.
    pub fn merge(mut record: RawRecord, outcome: EnrichmentOutcome) -> Self {
        for field in AI_FIELDS {
            record.extra.remove(field);
        }

        let degraded_reason = outcome.reason().map(str::to_string);
        let result = outcome.into_result();

        Self {
            record,
            ai_description: result.description,
            ai_mood: result.mood,
            ai_keywords: result.keywords,
            ai_semantic_tags: result.semantic_tags,
            ai_similar_works_description: result.similar_works_description,
            degraded_reason,
        }
    }

    pub fn object_id(&self) -> &str {
        &self.record.object_id
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded_reason.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_record_keeps_unknown_fields() {
        let record: RawRecord = serde_json::from_value(json!({
            "objectID": "music_1",
            "title": "Mass in B minor",
            "composer": "Johann Sebastian Bach",
            "type": "Mass",
            "attributes": null,
            "mbid": "abc",
            "lyrics": null
        }))
        .unwrap();

        assert_eq!(record.work_type.as_deref(), Some("Mass"));
        assert!(record.attributes.is_empty());
        assert_eq!(record.extra.get("mbid"), Some(&json!("abc")));
        assert_eq!(record.extra.get("lyrics"), Some(&Value::Null));
    }

    #[test]
    fn test_absent_type_and_language_stay_absent() {
        let input = json!({
            "objectID": "music_4",
            "title": "Goldberg Variations",
            "composer": "Johann Sebastian Bach",
            "attributes": []
        });
        let record: RawRecord = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), input);

        let enriched = EnrichedRecord::merge(record, EnrichmentOutcome::degraded("x"));
        let value = serde_json::to_value(&enriched).unwrap();
        assert!(value.get("type").is_none());
        assert!(value.get("language").is_none());
        assert_eq!(value["title"], "Goldberg Variations");
    }

    #[test]
    fn test_raw_record_requires_object_id() {
        let result = serde_json::from_value::<RawRecord>(json!({
            "title": "Magnificat",
            "composer": "Johann Sebastian Bach"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_namespaces_fields() {
        let mut record = RawRecord::new("music_2", "Magnificat", "Johann Sebastian Bach");
        record
            .extra
            .insert("ai_description".to_string(), json!("stale"));

        let outcome = EnrichmentOutcome::Enriched(EnrichmentResult {
            description: Some("Festive Baroque canticle.".to_string()),
            mood: vec!["Joyful".to_string()],
            ..Default::default()
        });
        let enriched = EnrichedRecord::merge(record, outcome);
        let value = serde_json::to_value(&enriched).unwrap();

        assert_eq!(value["objectID"], "music_2");
        assert_eq!(value["ai_description"], "Festive Baroque canticle.");
        assert_eq!(value["ai_mood"], json!(["Joyful"]));
        assert_eq!(value["ai_keywords"], json!([]));
        assert_eq!(value["ai_similar_works_description"], Value::Null);
        assert!(value.get("degraded_reason").is_none());
        assert!(!enriched.is_degraded());
    }

    #[test]
    fn test_degraded_outcome_carries_fallback() {
        let outcome = EnrichmentOutcome::degraded("Network error: timed out");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.result(), &EnrichmentResult::fallback());
        assert_eq!(outcome.reason(), Some("Network error: timed out"));

        let enriched = EnrichedRecord::merge(RawRecord::new("music_3", "t", "c"), outcome);
        assert!(enriched.is_degraded());
        assert_eq!(enriched.ai_description.as_deref(), Some(FALLBACK_DESCRIPTION));
        assert_eq!(
            enriched.ai_similar_works_description.as_deref(),
            Some(FALLBACK_SIMILAR_WORKS)
        );
    }
}
