//! Algolia search index client
//!
//! Three REST calls back the index publisher:
//! - `PUT  /1/indexes/{index}/settings`: searchable attributes
//! - `POST /1/indexes/{index}/batch`: object upsert, returns a `taskID`
//! - `GET  /1/indexes/{index}/task/{taskID}`: task status
//!
//! API Reference: https://www.algolia.com/doc/rest-api/search/

use crate::types::EnrichedRecord;
use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Algolia client errors
#[derive(Debug, Error)]
pub enum AlgoliaError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Index settings applied before writing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    pub searchable_attributes: Vec<String>,
}

impl IndexSettings {
    pub fn searchable<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            searchable_attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Acknowledgment of a batch write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAcknowledgment {
    /// Task id to wait on; `None` when the response did not carry one
    pub task_id: Option<u64>,
    /// Response body as received
    pub raw: String,
}

impl WriteAcknowledgment {
    /// Read `taskID` from a write response body
    pub fn from_body(raw: String) -> Self {
        let task_id = serde_json::from_str::<serde_json::Value>(&raw)
            .ok()
            .and_then(|value| value.get("taskID").and_then(serde_json::Value::as_u64));
        Self { task_id, raw }
    }
}

/// Server-side status of an indexing task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Published,
    NotPublished,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    status: String,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    requests: Vec<BatchOperation<'a>>,
}

#[derive(Debug, Serialize)]
struct BatchOperation<'a> {
    action: &'static str,
    body: &'a EnrichedRecord,
}

/// Destination index backend used by the publisher
#[async_trait]
pub trait IndexBackend: Send + Sync {
    async fn set_settings(&self, index: &str, settings: &IndexSettings) -> Result<(), AlgoliaError>;

    async fn save_objects(
        &self,
        index: &str,
        records: &[EnrichedRecord],
    ) -> Result<WriteAcknowledgment, AlgoliaError>;

    async fn task_status(&self, index: &str, task_id: u64) -> Result<TaskStatus, AlgoliaError>;
}

/// Algolia REST client
pub struct AlgoliaClient {
    http_client: Client,
    base_url: Url,
}

impl AlgoliaClient {
    /// Create client for `https://{app_id}.algolia.net`
    pub fn new(app_id: &str, api_key: &str) -> Result<Self, AlgoliaError> {
        Self::with_base_url(app_id, api_key, &format!("https://{}.algolia.net", app_id))
    }

    /// Create client against an explicit host (used by tests)
    pub fn with_base_url(app_id: &str, api_key: &str, base_url: &str) -> Result<Self, AlgoliaError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-algolia-application-id",
            header::HeaderValue::from_str(app_id)
                .map_err(|e| AlgoliaError::InvalidConfig(format!("application id: {}", e)))?,
        );
        let mut key = header::HeaderValue::from_str(api_key)
            .map_err(|e| AlgoliaError::InvalidConfig(format!("api key: {}", e)))?;
        key.set_sensitive(true);
        headers.insert("x-algolia-api-key", key);

        let http_client = Client::builder()
            .user_agent(cantus_common::config::get_user_agent())
            .timeout(DEFAULT_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| AlgoliaError::NetworkError(e.to_string()))?;

        let base_url = Url::parse(base_url).map_err(|e| AlgoliaError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// `/1/indexes/{index}/{segments..}` with each segment percent-encoded
    fn index_url(&self, index: &str, segments: &[&str]) -> Result<Url, AlgoliaError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AlgoliaError::InvalidConfig(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["1", "indexes", index])
            .extend(segments);
        Ok(url)
    }

    async fn read_success(response: reqwest::Response) -> Result<String, AlgoliaError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AlgoliaError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            return Err(AlgoliaError::ApiError(status.as_u16(), body));
        }
        Ok(body)
    }
}

#[async_trait]
impl IndexBackend for AlgoliaClient {
    async fn set_settings(&self, index: &str, settings: &IndexSettings) -> Result<(), AlgoliaError> {
        let url = self.index_url(index, &["settings"])?;
        debug!(index = %index, url = %url, "Applying Algolia index settings");

        let response = self
            .http_client
            .put(url)
            .json(settings)
            .send()
            .await
            .map_err(|e| AlgoliaError::NetworkError(e.to_string()))?;

        Self::read_success(response).await.map(|_| ())
    }

    async fn save_objects(
        &self,
        index: &str,
        records: &[EnrichedRecord],
    ) -> Result<WriteAcknowledgment, AlgoliaError> {
        let url = self.index_url(index, &["batch"])?;
        debug!(index = %index, records = records.len(), "Submitting Algolia batch write");

        let request = BatchRequest {
            requests: records
                .iter()
                .map(|body| BatchOperation {
                    action: "addObject",
                    body,
                })
                .collect(),
        };

        let response = self
            .http_client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AlgoliaError::NetworkError(e.to_string()))?;

        let body = Self::read_success(response).await?;
        Ok(WriteAcknowledgment::from_body(body))
    }

    async fn task_status(&self, index: &str, task_id: u64) -> Result<TaskStatus, AlgoliaError> {
        let url = self.index_url(index, &["task", &task_id.to_string()])?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AlgoliaError::NetworkError(e.to_string()))?;

        let body = Self::read_success(response).await?;
        let task: TaskResponse =
            serde_json::from_str(&body).map_err(|e| AlgoliaError::ParseError(e.to_string()))?;

        debug!(index = %index, task_id, status = %task.status, "Algolia task status");

        Ok(match task.status.as_str() {
            "published" => TaskStatus::Published,
            _ => TaskStatus::NotPublished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_reads_task_id() {
        let ack = WriteAcknowledgment::from_body(r#"{"taskID":42,"objectIDs":["a"]}"#.to_string());
        assert_eq!(ack.task_id, Some(42));
    }

    #[test]
    fn test_ack_without_task_id() {
        let ack = WriteAcknowledgment::from_body(r#"{"objectIDs":["a"]}"#.to_string());
        assert_eq!(ack.task_id, None);
        assert_eq!(ack.raw, r#"{"objectIDs":["a"]}"#);

        let ack = WriteAcknowledgment::from_body("not json".to_string());
        assert_eq!(ack.task_id, None);
    }

    #[test]
    fn test_index_url_encodes_name() {
        let client = AlgoliaClient::with_base_url("APP", "key", "http://localhost:1234").unwrap();
        let url = client.index_url("classical music", &["task", "7"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1234/1/indexes/classical%20music/task/7"
        );
    }

    #[test]
    fn test_settings_serialize_camel_case() {
        let settings = IndexSettings::searchable(["title", "composer"]);
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["searchableAttributes"], serde_json::json!(["title", "composer"]));
    }
}
