//! Google Gemini API client
//!
//! Single-turn `generateContent` calls: one free-text prompt in, the first
//! candidate's text out. No streaming, no conversation state.
//!
//! API Reference: https://ai.google.dev/api/generate-content

use crate::error::EnrichmentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model when none is configured
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Generative text backend used by the enrichment client
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Backend name for log output
    fn name(&self) -> &'static str;

    /// Send one prompt and return the response text
    ///
    /// # Errors
    /// Returns `EnrichmentError` when the backend is unreachable or the
    /// response carries no usable text.
    async fn generate(&self, prompt: &str) -> Result<String, EnrichmentError>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<serde_json::Value>,
}

/// Gemini REST client
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self, EnrichmentError> {
        let http_client = reqwest::Client::builder()
            .user_agent(cantus_common::config::get_user_agent())
            .build()
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Point the client at another host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-request timeout (default 60 s)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, EnrichmentError> {
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, "Querying Gemini API");

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(EnrichmentError::Api(status.as_u16(), body));
        }

        if body.trim().is_empty() {
            return Err(EnrichmentError::EmptyResponse);
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| EnrichmentError::Parse(e.to_string()))?;

        candidate_text(parsed)
    }
}

/// Text of the first candidate's first part
fn candidate_text(response: GenerateContentResponse) -> Result<String, EnrichmentError> {
    let first = response.candidates.into_iter().next();
    let finish_reason = first.as_ref().and_then(|c| c.finish_reason.clone());

    let text = first
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.trim().is_empty());

    if let Some(text) = text {
        return Ok(text);
    }

    if let Some(feedback) = response.prompt_feedback {
        if feedback.block_reason.is_some() || !feedback.safety_ratings.is_empty() {
            warn!(
                block_reason = ?feedback.block_reason,
                safety_ratings = %serde_json::Value::Array(feedback.safety_ratings.clone()),
                "Gemini returned safety feedback without a text candidate"
            );
            let reason = feedback
                .block_reason
                .unwrap_or_else(|| "safety ratings only".to_string());
            return Err(EnrichmentError::SafetyBlocked(reason));
        }
    }

    Err(EnrichmentError::MissingContent(
        finish_reason.unwrap_or_else(|| "no candidates".to_string()),
    ))
}
