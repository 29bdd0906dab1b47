//! Configuration loading and setting resolution
//!
//! Every setting resolves with the same priority order:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default, where one exists
//!
//! A missing TOML file is not an error; the compiled defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bootstrap configuration loaded from `~/.config/cantus/<module>.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Google Gemini API key
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name (default: gemini-1.5-flash)
    #[serde(default)]
    pub gemini_model: Option<String>,

    /// Algolia application id
    #[serde(default)]
    pub algolia_app_id: Option<String>,

    /// Algolia admin API key (write access required)
    #[serde(default)]
    pub algolia_admin_api_key: Option<String>,

    /// Destination index name
    #[serde(default)]
    pub index_name: Option<String>,

    /// MusicBrainz user agent, "AppName/Version (contact)"
    #[serde(default)]
    pub musicbrainz_user_agent: Option<String>,

    /// Pause between enrichment requests in milliseconds
    #[serde(default)]
    pub enrichment_delay_ms: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    Environment,
    Toml,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingSource::Environment => write!(f, "environment variable"),
            SettingSource::Toml => write!(f, "TOML config"),
        }
    }
}

/// Default TOML path for a module: `<config dir>/cantus/<module_name>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cantus").join(format!("{}.toml", module_name)))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// TOML file the module configuration is read from
///
/// An explicit path is returned as given. Otherwise the default path is
/// returned only when the file exists.
pub fn config_path(explicit: Option<&Path>, module_name: &str) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(module_name).filter(|path| path.exists()),
    }
}

/// Load the module configuration
///
/// An explicit path must exist and parse. Without one, a missing default
/// file falls back to `TomlConfig::default()`. Callers log the outcome via
/// `config_path` once tracing is up.
pub fn load_module_config(explicit: Option<&Path>, module_name: &str) -> Result<TomlConfig> {
    match config_path(explicit, module_name) {
        Some(path) => load_toml_config(&path),
        None => Ok(TomlConfig::default()),
    }
}

/// Validate a setting value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Resolve a setting from ENV, then TOML
///
/// Blank values in either tier are skipped.
pub fn resolve_setting(env_var: &str, toml_value: Option<&str>) -> Option<(String, SettingSource)> {
    if let Ok(value) = std::env::var(env_var) {
        if is_valid_value(&value) {
            return Some((value.trim().to_string(), SettingSource::Environment));
        }
    }

    toml_value
        .filter(|v| is_valid_value(v))
        .map(|v| (v.trim().to_string(), SettingSource::Toml))
}

/// Resolve a setting that has no compiled default
pub fn require_setting(
    env_var: &str,
    toml_key: &str,
    toml_value: Option<&str>,
) -> Result<(String, SettingSource)> {
    resolve_setting(env_var, toml_value).ok_or_else(|| {
        Error::Config(format!(
            "{} is not set. Configure it using one of:\n\
             1. Environment: {}=... (a .env file in the working directory is read)\n\
             2. TOML config: {} = \"...\"",
            env_var, env_var, toml_key
        ))
    })
}

/// Standard user agent for outbound HTTP clients
pub fn get_user_agent() -> String {
    format!(
        "Cantus/{} (https://github.com/cantus/cantus)",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_value() {
        assert!(is_valid_value("key"));
        assert!(!is_valid_value(""));
        assert!(!is_valid_value("   \t"));
    }

    #[test]
    fn test_default_logging_level() {
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn test_user_agent_format() {
        let ua = get_user_agent();
        assert!(ua.starts_with("Cantus/"));
        assert!(ua.contains("https://"));
    }
}
