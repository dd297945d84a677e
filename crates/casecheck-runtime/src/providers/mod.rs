//! Decision collaborators.
//!
//! A provider receives the decision prompt (fixed contract plus case inputs
//! and evidence) and answers with free text that the core normalizer turns
//! into a decision. Two providers ship: the OpenAI chat endpoint behind the
//! `openai` feature, and [`StaticProvider`] for replaying a recorded answer.
//! The OpenAI key is held as an [`ApiCredential`] and never logged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;
mod static_provider;

#[cfg(feature = "openai")]
mod openai;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};
pub use static_provider::{StaticProvider, StaticProviderFactory};

#[cfg(feature = "openai")]
pub use openai::{OpenAiProvider, OpenAiProviderFactory};

/// Why a provider produced no answer. The checker absorbs all of these into
/// a manual review; they only decide whether to retry and how to log.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider returned no content")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::RateLimited { .. } | Self::Timeout(_) => true,
            Self::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Per-request settings, derived from `RuntimeConfig::completion`.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub model: String,

    /// Upper bound on answer length; a decision JSON needs a few hundred
    pub max_tokens: u32,

    /// 0.0 so the same case and evidence give the same decision
    pub temperature: f32,

    /// Per attempt; the checker applies its own overall timeout
    pub timeout: Duration,

    /// Request a bare JSON object instead of prose
    pub json_response: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 800,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
            json_response: true,
        }
    }
}

/// One prompt message. The decision prompt is a system message holding the
/// contract and a user message holding inputs and evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A raw answer, before normalization.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Untrusted decision text; may be fenced, German, or not JSON at all
    pub content: String,

    pub usage: TokenUsage,

    /// Model that answered, as reported by the provider
    pub model: String,

    /// `"length"` here usually means a truncated, unparseable decision
    pub stop_reason: Option<String>,
}

/// Token counts reported for one decision request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// The external decision collaborator.
///
/// Implementations return whatever the backend said. Validation is not
/// their job; `CaseChecker` passes the content to the normalizer.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the decision prompt and return the raw answer.
    ///
    /// `Err(ProviderError::EmptyResponse)` means the backend answered without
    /// content; it counts as "no output" but not as a provider failure.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    async fn health_check(&self) -> bool;

    /// Recorded in `CaseCheckResult::provider` and used as the circuit key.
    fn name(&self) -> &str;

    /// Rough token count for providers that report no usage.
    fn estimate_tokens(&self, text: &str) -> u32 {
        (text.chars().count() / 4) as u32
    }
}
