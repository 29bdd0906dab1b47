//! Configuration resolution for cantus-ai
//!
//! Credentials and tunables resolve with ENV → TOML priority (see
//! `cantus_common::config`). Credential resolution runs before any record is
//! touched so a missing key stops the process up front.

use crate::pacing::DEFAULT_ENRICHMENT_DELAY;
use crate::services::DEFAULT_GEMINI_MODEL;
use crate::workflow::DEFAULT_INDEX_NAME;
use cantus_common::config::{require_setting, resolve_setting, SettingSource, TomlConfig};
use cantus_common::{Error, Result};
use std::time::Duration;
use tracing::info;

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "CANTUS_GEMINI_MODEL";
pub const ENV_ALGOLIA_APP_ID: &str = "ALGOLIA_APP_ID";
pub const ENV_ALGOLIA_ADMIN_API_KEY: &str = "ALGOLIA_ADMIN_API_KEY";
pub const ENV_INDEX_NAME: &str = "CANTUS_INDEX_NAME";
pub const ENV_MUSICBRAINZ_USER_AGENT: &str = "MUSICBRAINZ_USER_AGENT";
pub const ENV_ENRICHMENT_DELAY_MS: &str = "CANTUS_ENRICHMENT_DELAY_MS";

/// Template value shipped in example `.env` files; not a usable user agent
pub const PLACEHOLDER_USER_AGENT: &str =
    "ClassicalMusicAIEnrichmentApp/1.0.0 (your-email@example.com)";

/// Gemini connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
}

/// Algolia connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgoliaSettings {
    pub app_id: String,
    pub admin_api_key: String,
    pub index_name: String,
}

fn log_source(setting: &str, source: SettingSource) {
    info!("{} loaded from {}", setting, source);
}

/// Resolve Gemini API key and model
pub fn resolve_gemini_settings(toml_config: &TomlConfig) -> Result<GeminiSettings> {
    let (api_key, source) = require_setting(
        ENV_GEMINI_API_KEY,
        "gemini_api_key",
        toml_config.gemini_api_key.as_deref(),
    )?;
    log_source("Gemini API key", source);

    let model = resolve_setting(ENV_GEMINI_MODEL, toml_config.gemini_model.as_deref())
        .map(|(model, _)| model)
        .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

    Ok(GeminiSettings { api_key, model })
}

/// Resolve Algolia application id, admin key, and index name
pub fn resolve_algolia_settings(toml_config: &TomlConfig) -> Result<AlgoliaSettings> {
    let (app_id, app_source) = require_setting(
        ENV_ALGOLIA_APP_ID,
        "algolia_app_id",
        toml_config.algolia_app_id.as_deref(),
    )?;
    let (admin_api_key, key_source) = require_setting(
        ENV_ALGOLIA_ADMIN_API_KEY,
        "algolia_admin_api_key",
        toml_config.algolia_admin_api_key.as_deref(),
    )?;
    log_source("Algolia application id", app_source);
    log_source("Algolia admin API key", key_source);

    let index_name = resolve_setting(ENV_INDEX_NAME, toml_config.index_name.as_deref())
        .map(|(name, _)| name)
        .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string());

    Ok(AlgoliaSettings {
        app_id,
        admin_api_key,
        index_name,
    })
}

/// Resolve the MusicBrainz user agent
///
/// MusicBrainz requires "AppName/Version (contact)"; the template
/// placeholder and values without an application/version part are rejected.
pub fn resolve_musicbrainz_user_agent(toml_config: &TomlConfig) -> Result<String> {
    let (user_agent, source) = require_setting(
        ENV_MUSICBRAINZ_USER_AGENT,
        "musicbrainz_user_agent",
        toml_config.musicbrainz_user_agent.as_deref(),
    )?;

    if user_agent == PLACEHOLDER_USER_AGENT {
        return Err(Error::Config(format!(
            "{} still holds the template value; set your application name and contact email",
            ENV_MUSICBRAINZ_USER_AGENT
        )));
    }

    let app_part = user_agent.split_whitespace().next().unwrap_or_default();
    match app_part.split_once('/') {
        Some((name, version)) if !name.is_empty() && !version.is_empty() => {}
        _ => {
            return Err(Error::Config(format!(
                "{} must look like \"AppName/Version (contact)\", got \"{}\"",
                ENV_MUSICBRAINZ_USER_AGENT, user_agent
            )))
        }
    }

    log_source("MusicBrainz user agent", source);
    Ok(user_agent)
}

/// Pause between enrichment requests (default 500 ms)
pub fn resolve_enrichment_delay(toml_config: &TomlConfig) -> Result<Duration> {
    let env_value = std::env::var(ENV_ENRICHMENT_DELAY_MS).ok();
    match env_value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| {
                Error::Config(format!(
                    "{} must be a whole number of milliseconds: {}",
                    ENV_ENRICHMENT_DELAY_MS, e
                ))
            }),
        None => Ok(toml_config
            .enrichment_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_ENRICHMENT_DELAY)),
    }
}
