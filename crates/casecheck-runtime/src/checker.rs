//! The case checker: retrieval, decision request and normalization.
//!
//! A check never fails because of the collaborator. Provider errors,
//! timeouts, an open circuit or an empty answer all reach the normalizer as
//! "no output" and end in a manual review. Only missing documents, invalid
//! inputs and retrieval errors are reported as `RuntimeError`.

use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use casecheck_core::{
    gather_evidence, normalize_with_report, CaseCheckResult, CaseInputs, CaseSession,
};

use crate::cache::{CacheKey, DecisionCache};
use crate::config::RuntimeConfig;
use crate::prompts::build_decision_messages;
use crate::providers::{
    ChatMessage, CompletionResponse, LlmProvider, ProviderError, ProviderRegistry, TokenUsage,
};
use crate::resilience::CircuitBreaker;
use crate::RuntimeError;

/// Minimum delay before the first retry.
const RETRY_MIN_DELAY: Duration = Duration::from_millis(250);

/// Result of one check, with the provider's token usage.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub result: CaseCheckResult,

    /// `None` when the answer came from the cache or no answer was received
    pub usage: Option<TokenUsage>,
}

/// Runs case checks against a decision provider.
pub struct CaseChecker {
    provider: Arc<dyn LlmProvider>,
    config: RuntimeConfig,
    cache: DecisionCache,
    circuit_breaker: CircuitBreaker,
}

impl CaseChecker {
    pub fn new(provider: Arc<dyn LlmProvider>, config: RuntimeConfig) -> Self {
        let cache = DecisionCache::from_config(&config.cache);
        let circuit_breaker = CircuitBreaker::new(config.circuit_breaker.clone());

        Self {
            provider,
            config,
            cache,
            circuit_breaker,
        }
    }

    /// Create the configured provider from `registry` and wrap it.
    pub fn from_config(config: RuntimeConfig, registry: &ProviderRegistry) -> Result<Self, RuntimeError> {
        config.validate()?;
        let provider = registry.create(&config.provider, &config.provider_options)?;
        tracing::debug!(provider = provider.name(), model = %config.model, "Created decision provider");
        Ok(Self::new(provider, config))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Check a case against the session's current document.
    ///
    /// The result is recorded on the session unless the document was
    /// replaced while the check was running.
    pub async fn check(
        &self,
        session: &CaseSession,
        inputs: &CaseInputs,
    ) -> Result<CheckOutcome, RuntimeError> {
        let document = session.current()?;
        let (query, evidence) = gather_evidence(&document, inputs, session.config().retrieval.top_k)?;

        let messages = build_decision_messages(inputs, &evidence);
        let key = CacheKey::new(document.document().fingerprint, &messages, &self.config.model);
        let cached = self.cache.get(&key).await;
        let was_cached = cached.is_some();

        let (raw, usage) = match cached {
            Some(raw) => {
                tracing::debug!(generation = document.generation(), "Using cached decision response");
                (Some(raw), None)
            }
            None => match self.request_decision(messages).await {
                Some(response) => (Some(response.content), Some(response.usage)),
                None => (None, None),
            },
        };

        let normalization = normalize_with_report(raw.as_deref());

        if !was_cached && !normalization.disposition.is_fallback() {
            if let Some(raw) = raw {
                self.cache.insert(key, raw).await;
            }
        }

        tracing::info!(
            approval = %normalization.decision.approval(),
            disposition = ?normalization.disposition,
            evidence = evidence.len(),
            cached = was_cached,
            "Case checked"
        );

        let result = CaseCheckResult {
            decision: normalization.decision,
            disposition: normalization.disposition,
            evidence,
            inputs: inputs.clone(),
            query,
            document: document.document().source.clone(),
            generation: document.generation(),
            provider: Some(self.provider.name().to_string()),
            cached: was_cached,
            checked_at: Utc::now(),
        };
        session.record_result(result.clone());

        Ok(CheckOutcome { result, usage })
    }

    /// Ask the provider for a decision; `None` on any failure.
    async fn request_decision(&self, messages: Vec<ChatMessage>) -> Option<CompletionResponse> {
        let name = self.provider.name();
        if !self.circuit_breaker.allows(name) {
            tracing::warn!(provider = name, "Circuit open, skipping decision request");
            return None;
        }

        let completion = self.config.completion();
        let provider = &self.provider;
        let (messages, completion) = (&messages, &completion);

        let backoff = ExponentialBuilder::default()
            .with_min_delay(RETRY_MIN_DELAY)
            .with_max_times(self.config.max_retries);

        let call = (move || async move { provider.complete(messages.clone(), completion).await })
            .retry(backoff)
            .when(ProviderError::is_transient)
            .notify(|err: &ProviderError, delay: Duration| {
                tracing::warn!(provider = name, error = %err, delay = ?delay, "Retrying decision request");
            });

        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(response)) => {
                self.circuit_breaker.record_success(name);
                tracing::debug!(
                    provider = name,
                    model = %response.model,
                    tokens = response.usage.total(),
                    "Received decision response"
                );
                Some(response)
            }
            Ok(Err(ProviderError::EmptyResponse)) => {
                self.circuit_breaker.record_success(name);
                tracing::warn!(provider = name, "Provider returned no content");
                None
            }
            Ok(Err(err)) => {
                self.circuit_breaker.record_failure(name);
                tracing::warn!(provider = name, error = %err, "Decision request failed");
                None
            }
            Err(_) => {
                self.circuit_breaker.record_failure(name);
                tracing::warn!(provider = name, timeout = ?self.config.timeout, "Decision request timed out");
                None
            }
        }
    }
}

impl std::fmt::Debug for CaseChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseChecker")
            .field("provider", &self.provider.name())
            .field("model", &self.config.model)
            .field("cache", &self.cache)
            .finish()
    }
}
