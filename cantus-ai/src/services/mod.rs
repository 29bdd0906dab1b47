//! Backend clients and per-record services
//!
//! - `gemini_client`: generative model backend
//! - `enrichment_client`: prompt, model call, extraction, fallback
//! - `algolia_client`: destination search index
//! - `musicbrainz_client`: composer works lookup for the input batch

pub mod algolia_client;
pub mod enrichment_client;
pub mod gemini_client;
pub mod musicbrainz_client;

pub use algolia_client::{
    AlgoliaClient, AlgoliaError, IndexBackend, IndexSettings, TaskStatus, WriteAcknowledgment,
};
pub use enrichment_client::{build_prompt, EnrichmentClient};
pub use gemini_client::{GeminiClient, GenerativeModel, DEFAULT_GEMINI_MODEL};
pub use musicbrainz_client::{MBError, MusicBrainzClient};
