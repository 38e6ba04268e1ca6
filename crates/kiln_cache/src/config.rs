//! Cache configuration loaded from TOML.

use std::path::{Path, PathBuf};

use kiln_codec::DecodeLimits;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default cache root, relative to the working directory.
pub const DEFAULT_ROOT: &str = ".kiln-cache";

/// Settings for one cache root.
///
/// Every field except `root` has a default, so a minimal configuration is
/// just a directory:
///
/// ```toml
/// root = "build/.kiln-cache"
/// schema = "ir-v3"
///
/// [limits]
/// max_collection_len = 1000000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding all cache files.
    pub root: PathBuf,
    /// Tag identifying the record layout. Files written under another tag
    /// are treated as misses.
    pub schema: String,
    /// File extension for cache files, without the dot.
    pub extension: String,
    /// Number of leading fingerprint hex characters used as a subdirectory.
    /// `0` stores every file directly under the root.
    pub shard_width: usize,
    /// Files larger than this are never read.
    pub max_file_bytes: u64,
    /// Limits applied while decoding payloads.
    pub limits: DecodeLimits,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            schema: "1".to_string(),
            extension: "bin".to_string(),
            shard_width: 2,
            max_file_bytes: 256 * 1024 * 1024,
            limits: DecodeLimits::default(),
        }
    }
}

impl CacheConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Sets the schema tag.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }
}

/// Loads and validates a cache configuration file.
pub fn load_config(path: &Path) -> Result<CacheConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a cache configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<CacheConfig, ConfigError> {
    let config: CacheConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "root must not be empty".to_string(),
        ));
    }
    if config.schema.is_empty() {
        return Err(ConfigError::ValidationError(
            "schema must not be empty".to_string(),
        ));
    }
    if config.extension.is_empty() || config.extension.contains(['.', '/', '\\']) {
        return Err(ConfigError::ValidationError(format!(
            "invalid extension '{}'",
            config.extension
        )));
    }
    if config.shard_width > 32 {
        return Err(ConfigError::ValidationError(format!(
            "shard_width {} exceeds fingerprint length 32",
            config.shard_width
        )));
    }
    Ok(())
}
