//! Shared test doubles for cantus-ai integration tests
//!
//! - `ScriptedModel`: generative model that replays canned responses
//! - `FakeIndex`: in-memory index backend with scripted task statuses
//! - record builders

#![allow(dead_code)]

use async_trait::async_trait;
use cantus_ai::error::EnrichmentError;
use cantus_ai::services::{
    AlgoliaError, GenerativeModel, IndexBackend, IndexSettings, TaskStatus, WriteAcknowledgment,
};
use cantus_ai::{EnrichedRecord, RawRecord};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Well-formed model reply used by the happy-path tests
pub const GOOD_REPLY: &str = r#"{
  "description": "A Baroque sacred cantata for chorus and orchestra.",
  "mood": "Joyful, Solemn",
  "keywords": ["Cantata", "Choral", "Baroque"],
  "semantic_tags": ["Devotion", "Celebration"],
  "similar_works_description": "Similar to other Lutheran church cantatas."
}"#;

pub fn record(id: &str, title: &str) -> RawRecord {
    RawRecord::new(id, title, "Johann Sebastian Bach")
}

pub fn records(count: usize) -> Vec<RawRecord> {
    (1..=count)
        .map(|i| record(&format!("music_{}", i), &format!("Work {}", i)))
        .collect()
}

// =============================================================================
// Generative model
// =============================================================================

/// Replays one scripted reply per `generate` call
///
/// `Err(message)` entries surface as `EnrichmentError::Network`. Once the
/// script runs out every call fails.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// No replies; every call fails
    pub fn silent() -> Self {
        Self::new(Vec::<Result<String, String>>::new())
    }

    /// Same successful reply for `count` calls
    pub fn repeating(reply: &str, count: usize) -> Self {
        Self::new((0..count).map(|_| Ok(reply.to_string())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, EnrichmentError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(EnrichmentError::Network(message)),
            None => Err(EnrichmentError::Network("script exhausted".to_string())),
        }
    }
}

// =============================================================================
// Index backend
// =============================================================================

/// In-memory index backend
///
/// Every call is recorded so tests can assert on ordering and on calls that
/// must never happen.
pub struct FakeIndex {
    settings_error: Option<String>,
    write_body: String,
    statuses: Mutex<VecDeque<TaskStatus>>,
    pub calls: Mutex<Vec<String>>,
    pub written: Mutex<Vec<EnrichedRecord>>,
    pub applied_settings: Mutex<Option<IndexSettings>>,
}

impl FakeIndex {
    /// Accepts the write as task 7 and reports it published on first check
    pub fn healthy() -> Self {
        Self::with_statuses(r#"{"taskID":7,"objectIDs":[]}"#, [TaskStatus::Published])
    }

    pub fn with_statuses<I>(write_body: &str, statuses: I) -> Self
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        Self {
            settings_error: None,
            write_body: write_body.to_string(),
            statuses: Mutex::new(statuses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            written: Mutex::new(Vec::new()),
            applied_settings: Mutex::new(None),
        }
    }

    pub fn rejecting_settings(message: &str) -> Self {
        Self {
            settings_error: Some(message.to_string()),
            ..Self::healthy()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndexBackend for FakeIndex {
    async fn set_settings(&self, index: &str, settings: &IndexSettings) -> Result<(), AlgoliaError> {
        self.calls.lock().unwrap().push(format!("settings:{}", index));
        if let Some(message) = &self.settings_error {
            return Err(AlgoliaError::ApiError(400, message.clone()));
        }
        *self.applied_settings.lock().unwrap() = Some(settings.clone());
        Ok(())
    }

    async fn save_objects(
        &self,
        index: &str,
        records: &[EnrichedRecord],
    ) -> Result<WriteAcknowledgment, AlgoliaError> {
        self.calls.lock().unwrap().push(format!("save:{}", index));
        self.written.lock().unwrap().extend_from_slice(records);
        Ok(WriteAcknowledgment::from_body(self.write_body.clone()))
    }

    async fn task_status(&self, index: &str, task_id: u64) -> Result<TaskStatus, AlgoliaError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("task:{}:{}", index, task_id));
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TaskStatus::NotPublished))
    }
}
