//! Error types for cantus-ai
//!
//! Per-record errors (`EnrichmentError`, `ExtractionError`) are absorbed by
//! the enrichment client into a fallback result. `BatchLoadError` empties the
//! run. `IndexError` is always fatal to a publish.

use std::path::PathBuf;
use thiserror::Error;

/// Input batch could not be loaded
#[derive(Debug, Error)]
pub enum BatchLoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Model response present but not parseable as the expected structure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no JSON boundaries")]
    NoJsonBoundaries,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

/// Enrichment backend unreachable or response missing expected content
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("No text candidate in response: {0}")]
    MissingContent(String),

    #[error("Response blocked by safety filter: {0}")]
    SafetyBlocked(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Indexing stage failure, with the step and index that failed
#[derive(Debug, Error)]
pub enum IndexError {
    /// Schema could not be applied; no write was attempted
    #[error("Failed to configure index '{index}': {message}")]
    Config { index: String, message: String },

    /// Write call failed or returned no task id
    #[error("Failed to write to index '{index}': {message}{}", raw_suffix(.raw_response))]
    Write {
        index: String,
        message: String,
        raw_response: Option<String>,
    },

    /// Write task did not confirm; durability unknown
    #[error("Indexing task {task_id} on '{index}' did not complete: {reason}")]
    Task {
        index: String,
        task_id: u64,
        reason: String,
    },
}

fn raw_suffix(raw: &Option<String>) -> String {
    match raw {
        Some(raw) => format!(" (response: {})", raw),
        None => String::new(),
    }
}

impl IndexError {
    /// Index the failure refers to
    pub fn index(&self) -> &str {
        match self {
            IndexError::Config { index, .. }
            | IndexError::Write { index, .. }
            | IndexError::Task { index, .. } => index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_messages() {
        assert_eq!(ExtractionError::NoJsonBoundaries.to_string(), "no JSON boundaries");
        assert!(ExtractionError::InvalidJson("eof".into())
            .to_string()
            .starts_with("invalid JSON"));
    }

    #[test]
    fn test_write_error_includes_raw_response() {
        let err = IndexError::Write {
            index: "works".to_string(),
            message: "missing task id".to_string(),
            raw_response: Some(r#"{"objectIDs":["a"]}"#.to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("'works'"));
        assert!(message.contains("missing task id"));
        assert!(message.contains(r#"{"objectIDs":["a"]}"#));
        assert_eq!(err.index(), "works");
    }
}
