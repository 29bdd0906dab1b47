//! MusicBrainz API client
//!
//! Produces the raw record batch: finds a composer by exact name, then looks
//! up their works and maps each work to a `RawRecord`.
//!
//! # API Reference
//! - Search: https://musicbrainz.org/ws/2/artist?query={name}&fmt=json
//! - Lookup: https://musicbrainz.org/ws/2/artist/{mbid}?inc=works&fmt=json
//! - Rate Limit: 1 request/second (as per MusicBrainz Terms of Service)

use crate::types::RawRecord;
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// MusicBrainz client errors
#[derive(Debug, Error)]
pub enum MBError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Composer not found: {0}")]
    ComposerNotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Deserialize)]
struct MBArtistSearch {
    #[serde(default)]
    artists: Vec<MBArtist>,
}

/// MusicBrainz artist
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MBArtist {
    /// Artist MBID (MusicBrainz ID)
    pub id: String,
    pub name: String,
    /// "Person", "Group", "Orchestra", ...
    #[serde(rename = "type")]
    pub artist_type: Option<String>,
    /// Present on lookups with `inc=works`
    #[serde(default)]
    pub works: Vec<MBWork>,
}

/// MusicBrainz work (musical composition)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MBWork {
    /// Work MBID (MusicBrainz ID)
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    #[serde(default)]
    pub iswcs: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<MBWorkAttribute>,
    pub language: Option<String>,
}

/// Typed work attribute (e.g. key, catalogue number)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MBWorkAttribute {
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub value: String,
}

impl MBWorkAttribute {
    /// "Key: D major"
    pub fn label(&self) -> String {
        format!("{}: {}", self.attribute_type, self.value)
    }
}

/// Map a work to the record shape the enrichment pipeline reads
pub fn work_to_record(work: &MBWork, composer: &MBArtist) -> RawRecord {
    let mut extra = Map::new();
    extra.insert("mbid".to_string(), json!(work.id));
    extra.insert("iswcs".to_string(), json!(work.iswcs));
    extra.insert("composer_mbid".to_string(), json!(composer.id));
    extra.insert("lyrics".to_string(), Value::Null);
    extra.insert("score_url".to_string(), Value::Null);
    extra.insert("audio_sample_url".to_string(), Value::Null);

    RawRecord {
        object_id: format!("music_{}", work.id),
        title: work.title.clone(),
        composer: composer.name.clone(),
        work_type: work.work_type.clone(),
        language: work.language.clone(),
        attributes: work.attributes.iter().map(MBWorkAttribute::label).collect(),
        extra,
    }
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
    /// Rate limiter: 1 request per second (MusicBrainz policy)
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl MusicBrainzClient {
    /// Create client; `user_agent` must identify the application and a contact
    pub fn new(user_agent: &str) -> Result<Self, MBError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| MBError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: MUSICBRAINZ_BASE_URL.to_string(),
            rate_limiter: RateLimiter::direct(Quota::per_second(NonZeroU32::MIN)),
        })
    }

    /// Point the client at another host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MBError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        debug!(url = %url, "Querying MusicBrainz API");

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .query(&[("fmt", "json")])
            .send()
            .await
            .map_err(|e| MBError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 503 {
            return Err(MBError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MBError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| MBError::ParseError(e.to_string()))
    }

    /// Find a composer by exact name
    ///
    /// Only an artist whose name matches exactly and whose type is `Person`
    /// is accepted.
    pub async fn search_composer(&self, name: &str) -> Result<MBArtist, MBError> {
        let search: MBArtistSearch = self.get_json("artist", &[("query", name)]).await?;

        search
            .artists
            .into_iter()
            .find(|a| a.name == name && a.artist_type.as_deref() == Some("Person"))
            .ok_or_else(|| MBError::ComposerNotFound(name.to_string()))
    }

    /// Look up the works linked to an artist
    pub async fn lookup_works(&self, artist_id: &str) -> Result<Vec<MBWork>, MBError> {
        let artist: MBArtist = self
            .get_json(&format!("artist/{}", artist_id), &[("inc", "works")])
            .await?;
        Ok(artist.works)
    }

    /// Fetch up to `limit` works by a composer as raw records (0 = all)
    ///
    /// Never fails: lookup errors are logged and produce an empty batch.
    pub async fn fetch_composer_works(&self, composer_name: &str, limit: usize) -> Vec<RawRecord> {
        info!(composer = %composer_name, "Fetching works by composer");

        let composer = match self.search_composer(composer_name).await {
            Ok(composer) => composer,
            Err(e) => {
                error!(composer = %composer_name, error = %e, "Composer lookup failed");
                return Vec::new();
            }
        };

        info!(composer = %composer.name, mbid = %composer.id, "Found composer");

        let works = match self.lookup_works(&composer.id).await {
            Ok(works) => works,
            Err(e) => {
                error!(composer = %composer.name, error = %e, "Works lookup failed");
                return Vec::new();
            }
        };

        let take = if limit > 0 { limit } else { works.len() };
        let records: Vec<RawRecord> = works
            .iter()
            .take(take)
            .map(|work| work_to_record(work, &composer))
            .collect();

        if records.is_empty() {
            warn!(composer = %composer.name, "No works found");
        } else {
            info!(
                composer = %composer.name,
                count = records.len(),
                "Fetched works"
            );
        }

        records
    }
}
