//! # Cantus Common Library
//!
//! Shared code for the Cantus tools:
//! - Error type used across configuration loading
//! - TOML configuration and ENV → TOML setting resolution
//! - HTTP user-agent string

pub mod config;
pub mod error;

pub use error::{Error, Result};
