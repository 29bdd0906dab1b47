//! cantus-ai library interface
//!
//! Enriches musical-work records with metadata from a generative model and
//! publishes them to a search index.
//!
//! - `extraction`: model text → structured metadata
//! - `services`: Gemini, Algolia, and MusicBrainz clients; per-record enrichment
//! - `workflow`: batch orchestration and index publishing
//! - `pacing`: request pacing between records

pub mod config;
pub mod error;
pub mod extraction;
pub mod pacing;
pub mod services;
pub mod types;
pub mod workflow;

pub use crate::error::{BatchLoadError, EnrichmentError, ExtractionError, IndexError};
pub use crate::extraction::extract_metadata;
pub use crate::types::{EnrichedRecord, EnrichmentOutcome, EnrichmentResult, RawRecord};
