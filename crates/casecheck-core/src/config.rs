//! Pipeline configuration.
//!
//! The chunking thresholds, vocabulary cap and retrieval depth are tunable
//! parameters rather than fixed constants. Configuration is plain serde data
//! that can be loaded from YAML or JSON, with every field defaulted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default minimum chunk length in characters.
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 80;

/// Default length of the single fallback chunk.
pub const DEFAULT_FALLBACK_CHARS: usize = 5000;

/// Default vocabulary cap for the search index.
pub const DEFAULT_MAX_FEATURES: usize = 40_000;

/// Default number of evidence items per retrieval.
pub const DEFAULT_TOP_K: usize = 6;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Chunker settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Segments must be longer than this many characters to become chunks
    pub min_chars: usize,

    /// Length of the fallback chunk taken from the raw text
    pub fallback_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHUNK_CHARS,
            fallback_chars: DEFAULT_FALLBACK_CHARS,
        }
    }
}

/// Search index settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Maximum number of vocabulary terms kept
    pub max_features: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
        }
    }
}

/// Retriever settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of evidence items returned per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Configuration for the whole retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
}

impl PipelineConfig {
    /// Parse a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Apply `CASECHECK_TOP_K` from the environment, if set.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(value) = std::env::var("CASECHECK_TOP_K") {
            self.retrieval.top_k = value.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("CASECHECK_TOP_K must be a positive integer, got '{}'", value))
            })?;
            self.validate()?;
        }
        Ok(self)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.fallback_chars == 0 {
            return Err(ConfigError::Invalid(
                "chunking.fallback_chars must be at least 1".to_string(),
            ));
        }
        if self.index.max_features == 0 {
            return Err(ConfigError::Invalid(
                "index.max_features must be at least 1".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.chunking.min_chars, 80);
        assert_eq!(config.chunking.fallback_chars, 5000);
        assert_eq!(config.index.max_features, 40_000);
        assert_eq!(config.retrieval.top_k, 6);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml(
            r#"
chunking:
  min_chars: 50
retrieval:
  top_k: 5
"#,
        )
        .unwrap();

        assert_eq!(config.chunking.min_chars, 50);
        assert_eq!(config.chunking.fallback_chars, 5000);
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let result = PipelineConfig::from_json(r#"{"retrieval": {"top_k": 0}}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_fallback_rejected() {
        let result = PipelineConfig::from_yaml("chunking:\n  fallback_chars: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
