//! Decision providers by name.
//!
//! `RuntimeConfig::provider` names the collaborator and
//! `RuntimeConfig::provider_options` is handed to its factory unchanged:
//!
//! ```yaml
//! provider: static
//! provider_options:
//!   response: '{"approval": "ManualReview"}'
//!   delay: 2s
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{LlmProvider, ProviderError};

/// Builds one kind of decision provider from its `provider_options`.
pub trait ProviderFactory: Send + Sync {
    /// Name used in `RuntimeConfig::provider`, e.g. `"openai"`.
    fn provider_type(&self) -> &'static str;

    fn create(&self, options: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Reject unknown or ill-typed options before any check runs.
    fn validate_config(&self, options: &JsonValue) -> Result<(), ProviderError>;

    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }

    /// One line shown when a configured provider name is not known.
    fn description(&self) -> &'static str {
        "Decision provider"
    }
}

/// Known decision providers, keyed by `provider_type`.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `static`, plus `openai` when that feature is enabled.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::StaticProviderFactory));
        #[cfg(feature = "openai")]
        registry.register(Arc::new(super::OpenAiProviderFactory));
        registry
    }

    /// Later registrations replace earlier ones of the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    pub fn create(
        &self,
        provider_type: &str,
        options: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.factory(provider_type)?.create(options)
    }

    pub fn validate(&self, provider_type: &str, options: &JsonValue) -> Result<(), ProviderError> {
        self.factory(provider_type)?.validate_config(options)
    }

    fn factory(&self, provider_type: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(provider_type).ok_or_else(|| {
            let known: Vec<String> = self
                .factories
                .values()
                .map(|f| format!("{} ({})", f.provider_type(), f.description()))
                .collect();
            ProviderError::NotConfigured(format!(
                "Unknown decision provider '{}'. Available: {}",
                provider_type,
                if known.is_empty() { "none".to_string() } else { known.join(", ") }
            ))
        })
    }

    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    pub fn default_config(&self, provider_type: &str) -> Option<JsonValue> {
        self.factories
            .get(provider_type)
            .map(|f| f.default_config())
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_include_static() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.has_provider("static"));
        assert!(!registry.has_provider("unknown"));
        assert_eq!(registry.default_config("static"), Some(serde_json::json!({})));
    }

    #[test]
    fn test_create_by_name() {
        let registry = ProviderRegistry::with_defaults();
        let provider = registry
            .create("static", &serde_json::json!({ "response": "{}" }))
            .unwrap();
        assert_eq!(provider.name(), "static");
    }

    #[test]
    fn test_unknown_provider_lists_known_ones() {
        let registry = ProviderRegistry::with_defaults();
        let err = registry.create("carrier-pigeon", &serde_json::json!({})).err().unwrap();
        assert!(err.to_string().contains("static ("));
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::new();
        assert!(registry.available_types().is_empty());

        match registry.create("unknown", &serde_json::json!({})) {
            Err(ProviderError::NotConfigured(msg)) => {
                assert!(msg.contains("Unknown decision provider 'unknown'"));
                assert!(msg.ends_with("none"));
            }
            _ => panic!("Expected NotConfigured error"),
        }
        assert!(registry.validate("unknown", &serde_json::json!({})).is_err());
    }
}
