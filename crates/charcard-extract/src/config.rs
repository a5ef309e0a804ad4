//! Extraction limits and switches.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExtractError, ExtractResult};

/// Cap on base64 characters collected after a PNG marker (5 MiB).
pub const DEFAULT_MAX_PAYLOAD_CHARS: usize = 5 * 1024 * 1024;

/// Configuration for card extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Maximum base64 characters collected after a marker.
    pub max_payload_chars: usize,
    /// Maximum bytes drained from a byte source. Larger inputs yield no
    /// card; raise this for unusually large containers.
    pub max_input_bytes: u64,
    /// Maximum decompressed bytes read from a single archive entry.
    pub max_entry_bytes: u64,
    /// Maximum number of entries an archive may list.
    pub max_archive_entries: usize,
    /// Whether to materialize the avatar data URL.
    pub include_avatar: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_payload_chars: DEFAULT_MAX_PAYLOAD_CHARS,
            max_input_bytes: 256 * 1024 * 1024,
            max_entry_bytes: 64 * 1024 * 1024,
            max_archive_entries: 4096,
            include_avatar: true,
        }
    }
}

impl ExtractConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> ExtractResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => toml::from_str(&content).map_err(config_error),
            Some("json") => serde_json::from_str(&content).map_err(config_error),
            Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(config_error),
            _ => Err(ExtractError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse("CHARCARD_MAX_PAYLOAD_CHARS") {
            config.max_payload_chars = v;
        }
        if let Some(v) = env_parse("CHARCARD_MAX_INPUT_BYTES") {
            config.max_input_bytes = v;
        }
        if let Some(v) = env_parse("CHARCARD_MAX_ENTRY_BYTES") {
            config.max_entry_bytes = v;
        }
        if let Some(v) = env_parse("CHARCARD_MAX_ARCHIVE_ENTRIES") {
            config.max_archive_entries = v;
        }
        if let Ok(v) = std::env::var("CHARCARD_INCLUDE_AVATAR") {
            config.include_avatar = !matches!(v.to_lowercase().as_str(), "0" | "false" | "no");
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder::default()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn config_error(err: impl std::fmt::Display) -> ExtractError {
    ExtractError::Configuration(err.to_string())
}

/// Builder for ExtractConfig.
#[derive(Default)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    /// Set the base64 payload cap.
    pub fn max_payload_chars(mut self, max: usize) -> Self {
        self.config.max_payload_chars = max;
        self
    }

    /// Set the byte source drain limit.
    pub fn max_input_bytes(mut self, max: u64) -> Self {
        self.config.max_input_bytes = max;
        self
    }

    /// Set the per-entry decompression limit.
    pub fn max_entry_bytes(mut self, max: u64) -> Self {
        self.config.max_entry_bytes = max;
        self
    }

    /// Set the archive entry count limit.
    pub fn max_archive_entries(mut self, max: usize) -> Self {
        self.config.max_archive_entries = max;
        self
    }

    /// Enable or disable avatar materialization.
    pub fn include_avatar(mut self, include: bool) -> Self {
        self.config.include_avatar = include;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ExtractConfig {
        self.config
    }
}
