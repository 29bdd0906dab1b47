//! Structured extraction of enrichment metadata from model output
//!
//! Models often wrap the requested JSON in a code fence or surround it with
//! prose. Extraction works in two stages:
//! 1. Strip a fence that wraps the whole response, then take the span from
//!    the first `{` to the last `}`
//! 2. Parse that span as a JSON object and normalize its fields
//!
//! Extraction is a pure function of its input.

use crate::error::ExtractionError;
use crate::types::EnrichmentResult;
use serde_json::{Map, Value};

/// Parse a model response into normalized enrichment metadata
pub fn extract_metadata(text: &str) -> Result<EnrichmentResult, ExtractionError> {
    let body = strip_code_fence(text);
    let span = json_object_span(body)?;

    let value: Value =
        serde_json::from_str(span).map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ExtractionError::InvalidJson("not a JSON object".to_string()))?;

    Ok(EnrichmentResult {
        description: text_field(object, &["description"]),
        mood: list_field(object, &["mood"]),
        keywords: list_field(object, &["keywords"]),
        semantic_tags: list_field(object, &["semantic_tags", "semanticTags"]),
        similar_works_description: text_field(
            object,
            &["similar_works_description", "similarWorksDescription"],
        ),
    })
}

/// Remove a fenced code block wrapping the entire response
///
/// Only an exact outer wrapper is removed: an opening ```` ``` ```` line with
/// an optional language tag and a closing ```` ``` ````. Fences inside the
/// text are left alone.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    match inner.find('\n') {
        Some(newline) if is_language_tag(&inner[..newline]) => inner[newline + 1..].trim(),
        _ => inner.trim(),
    }
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Slice from the first `{` to the last `}`, inclusive
pub fn json_object_span(text: &str) -> Result<&str, ExtractionError> {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(ExtractionError::NoJsonBoundaries),
    }
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match lookup(object, keys)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// List normalization: arrays pass through, strings split on commas
fn list_field(object: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match lookup(object, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence_with_language_tag() {
        let text = "```json\n{\"mood\": \"Solemn\"}\n```";
        assert_eq!(strip_code_fence(text), "{\"mood\": \"Solemn\"}");
    }

    #[test]
    fn test_strip_bare_fence() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(text), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_fence_leaves_unwrapped_text() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(text), text);
    }

    #[test]
    fn test_span_requires_ordered_braces() {
        assert_eq!(json_object_span("} nothing {"), Err(ExtractionError::NoJsonBoundaries));
        assert_eq!(json_object_span("{"), Err(ExtractionError::NoJsonBoundaries));
        assert_eq!(json_object_span("no braces"), Err(ExtractionError::NoJsonBoundaries));
        assert_eq!(json_object_span("x {} y"), Ok("{}"));
    }

    #[test]
    fn test_list_field_variants() {
        let object: Map<String, Value> = serde_json::from_str(
            r#"{"a": ["x", null, 3], "b": " p , ,q ", "c": "", "d": null, "e": 7}"#,
        )
        .unwrap();

        assert_eq!(list_field(&object, &["a"]), vec!["x", "3"]);
        assert_eq!(list_field(&object, &["b"]), vec!["p", "q"]);
        assert!(list_field(&object, &["c"]).is_empty());
        assert!(list_field(&object, &["d"]).is_empty());
        assert!(list_field(&object, &["e"]).is_empty());
        assert!(list_field(&object, &["missing"]).is_empty());
    }

    #[test]
    fn test_non_object_json_is_invalid() {
        // Braces present, but the span is not a single object
        let err = extract_metadata("{} and {}").unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidJson(_)));
    }
}
