//! Runtime configuration.
//!
//! ```yaml
//! provider: openai
//! provider_options:
//!   base_url: https://api.openai.com/v1
//! model: gpt-4o-mini
//! timeout: 30s
//! max_retries: 2
//! cache:
//!   max_entries: 256
//!   ttl: 1h
//! pipeline:
//!   retrieval:
//!     top_k: 6
//! ```

use casecheck_core::{ConfigError, PipelineConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::providers::CompletionConfig;
use crate::resilience::CircuitBreakerConfig;

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached responses; 0 disables caching
    pub max_entries: u64,

    /// How long a cached response stays valid
    #[serde(with = "humantime_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Configuration for the case checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider type registered in the `ProviderRegistry`
    pub provider: String,

    /// Provider-specific options passed to its factory
    pub provider_options: JsonValue,

    pub model: String,

    pub max_tokens: u32,

    pub temperature: f32,

    /// Deadline for one provider call, retries included
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,

    /// Retries after a transient provider failure
    pub max_retries: usize,

    pub cache: CacheConfig,

    pub circuit_breaker: CircuitBreakerConfig,

    pub pipeline: PipelineConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            provider_options: JsonValue::Object(Default::default()),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 800,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
            max_retries: 2,
            cache: CacheConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Apply `CASECHECK_MODEL`, `CASECHECK_TIMEOUT` and `CASECHECK_TOP_K`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(model) = std::env::var("CASECHECK_MODEL") {
            if !model.trim().is_empty() {
                self.model = model.trim().to_string();
            }
        }
        if let Ok(value) = std::env::var("CASECHECK_TIMEOUT") {
            self.timeout = humantime::parse_duration(value.trim()).map_err(|e| {
                ConfigError::Invalid(format!("CASECHECK_TIMEOUT '{}': {}", value, e))
            })?;
        }
        self.pipeline = self.pipeline.with_env_overrides()?;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::Invalid("provider must be set".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must be set".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        self.pipeline.validate()
    }

    /// Completion settings for one provider call.
    pub fn completion(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            json_response: true,
        }
    }
}

/// Serde adapter for durations written as "30s", "1h 30m".
pub(crate) mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        humantime::parse_duration(&value).map_err(serde::de::Error::custom)
    }
}
