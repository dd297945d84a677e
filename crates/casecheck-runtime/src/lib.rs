//! # casecheck-runtime
//!
//! Decision collaborator plumbing for casecheck.
//!
//! `casecheck-core` retrieves evidence and validates decisions without any
//! network access. This crate adds the part in between: it sends the
//! evidence and case inputs to a decision provider, with timeout, retry,
//! circuit breaking and response caching, and hands whatever comes back to
//! the core normalizer.
//!
//! ## Example
//!
//! ```rust,ignore
//! use casecheck_runtime::{CaseChecker, ProviderRegistry, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_file("casecheck.yaml")?.with_env_overrides()?;
//! let session = CaseSession::new(config.pipeline.clone());
//! session.load_document(Document::from_file("process.pdf")?)?;
//!
//! let checker = CaseChecker::from_config(config, &ProviderRegistry::with_defaults())?;
//! let outcome = checker.check(&session, &inputs).await?;
//! println!("{}", outcome.result.to_json_pretty());
//! ```

pub mod cache;
pub mod checker;
pub mod config;
pub mod prompts;
pub mod providers;
pub mod resilience;

pub use cache::{CacheKey, DecisionCache};
pub use checker::{CaseChecker, CheckOutcome};
pub use config::{CacheConfig, RuntimeConfig};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderFactory, ProviderRegistry, StaticProvider, TokenUsage,
};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

use casecheck_core::{ConfigError, PipelineError, SessionError};
use thiserror::Error;

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<SessionError> for RuntimeError {
    fn from(err: SessionError) -> Self {
        Self::Pipeline(PipelineError::Session(err))
    }
}
