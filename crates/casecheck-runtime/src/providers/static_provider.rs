//! Provider that replays a fixed response.
//!
//! Used to run the pipeline against a recorded collaborator answer and to
//! exercise the checker without network access.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{
    factory::ProviderFactory, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider,
    ProviderError, TokenUsage,
};

#[derive(Debug, Clone)]
enum Reply {
    Content(String),
    Silent,
    Fail(ProviderError),
}

/// A provider with a canned reply.
#[derive(Debug)]
pub struct StaticProvider {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl StaticProvider {
    /// Always answer with `content`.
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_reply(Reply::Content(content.into()))
    }

    /// Answer without any content.
    pub fn silent() -> Self {
        Self::with_reply(Reply::Silent)
    }

    /// Always fail with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::with_reply(Reply::Fail(error))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Wait `delay` before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for StaticProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            Reply::Content(content) => {
                let prompt: String = messages.iter().map(|m| m.content.as_str()).collect();
                Ok(CompletionResponse {
                    content: content.clone(),
                    usage: TokenUsage {
                        prompt_tokens: self.estimate_tokens(&prompt),
                        completion_tokens: self.estimate_tokens(content),
                    },
                    model: config.model.clone(),
                    stop_reason: Some("stop".to_string()),
                })
            }
            Reply::Silent => Err(ProviderError::EmptyResponse),
            Reply::Fail(error) => Err(error.clone()),
        }
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Factory for static providers.
///
/// ## Configuration Format
/// ```json
/// {
///   "response": "{\"approval\": \"No\"}",   // Optional; omitted means no content
///   "delay": "2s"                            // Optional, humantime duration
/// }
/// ```
pub struct StaticProviderFactory;

impl ProviderFactory for StaticProviderFactory {
    fn provider_type(&self) -> &'static str {
        "static"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.validate_config(config)?;

        let mut provider = match config["response"].as_str() {
            Some(content) => StaticProvider::new(content),
            None => StaticProvider::silent(),
        };
        if let Some(delay) = config["delay"].as_str() {
            provider = provider.with_delay(parse_delay(delay)?);
        }

        Ok(Arc::new(provider))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !config["response"].is_null() && !config["response"].is_string() {
            return Err(ProviderError::NotConfigured(
                "static provider 'response' must be a string".to_string(),
            ));
        }
        if let Some(delay) = config["delay"].as_str() {
            parse_delay(delay)?;
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Replays a fixed response"
    }
}

fn parse_delay(value: &str) -> Result<Duration, ProviderError> {
    humantime::parse_duration(value)
        .map_err(|e| ProviderError::NotConfigured(format!("invalid delay '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_content() {
        let provider = StaticProvider::new(r#"{"approval":"Yes"}"#);
        let response = provider
            .complete(vec![ChatMessage::user("case")], &CompletionConfig::default())
            .await
            .unwrap();

        assert_eq!(response.content, r#"{"approval":"Yes"}"#);
        assert_eq!(response.model, "gpt-4o-mini");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_silent_provider() {
        let provider = StaticProvider::silent();
        let result = provider.complete(vec![], &CompletionConfig::default()).await;
        assert_eq!(result.unwrap_err(), ProviderError::EmptyResponse);
    }

    #[test]
    fn test_factory_config() {
        let factory = StaticProviderFactory;
        assert_eq!(factory.provider_type(), "static");

        let provider = factory
            .create(&serde_json::json!({ "response": "x", "delay": "10ms" }))
            .unwrap();
        assert_eq!(provider.name(), "static");

        assert!(factory.validate_config(&serde_json::json!({ "response": 5 })).is_err());
        assert!(factory.validate_config(&serde_json::json!({ "delay": "soon" })).is_err());
        assert!(factory.validate_config(&serde_json::json!({})).is_ok());
    }
}
