#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Lookup tables and static configuration for the cleaning pipeline.
//!
//! The default configuration (`config/pipeline.toml`) is baked into the
//! binary at compile time via [`include_str!`] and parsed once into
//! process-wide read-only state. Callers may load an alternative file with
//! [`load_config`].

pub mod config;

use std::path::Path;
use std::sync::LazyLock;

pub use config::PipelineConfig;

/// Default configuration embedded at compile time.
const DEFAULT_CONFIG_TOML: &str = include_str!("../config/pipeline.toml");

/// Parsed default configuration, shared for the lifetime of the process.
static DEFAULT_CONFIG: LazyLock<PipelineConfig> = LazyLock::new(|| {
    parse_config(DEFAULT_CONFIG_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded pipeline.toml: {e}"))
});

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`PipelineConfig`].
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The config parsed but its values are inconsistent.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Returns the embedded default configuration.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the file is embedded and covered by tests).
#[must_use]
pub fn default_config() -> &'static PipelineConfig {
    &DEFAULT_CONFIG
}

/// Parses and validates a configuration from a TOML string.
///
/// # Errors
///
/// Returns [`ConfigError`] if the TOML is malformed or fails validation.
pub fn parse_config(toml_str: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = toml::de::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// Loads and validates a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed, or validated.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    log::info!("Loading pipeline config from {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}
