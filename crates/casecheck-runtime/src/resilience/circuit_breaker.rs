//! Per-provider circuit breaker.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::humantime_duration;

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed checks before the circuit opens
    pub failure_threshold: u32,

    /// Time before a trial call is let through
    #[serde(with = "humantime_duration")]
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// State of one provider's circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls go through
    Closed { failures: u32 },

    /// Calls are skipped
    Open { opened_at: Instant },

    /// One trial call is allowed
    HalfOpen,
}

/// Tracks provider health across checks.
#[derive(Debug)]
pub struct CircuitBreaker {
    states: RwLock<HashMap<String, CircuitState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Whether a call to `provider` may proceed.
    ///
    /// An open circuit whose recovery timeout has elapsed moves to half-open
    /// and lets exactly one caller through. Further callers are refused until
    /// that trial call is recorded as a success or a failure.
    pub fn allows(&self, provider: &str) -> bool {
        let mut states = self.states.write();
        match states.get(provider).copied() {
            Some(CircuitState::Open { opened_at }) => {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    states.insert(provider.to_string(), CircuitState::HalfOpen);
                    tracing::info!(provider, "Circuit half-open, allowing trial call");
                    true
                } else {
                    false
                }
            }
            Some(CircuitState::HalfOpen) => false,
            _ => true,
        }
    }

    pub fn record_success(&self, provider: &str) {
        let mut states = self.states.write();
        if matches!(states.get(provider), Some(CircuitState::HalfOpen)) {
            tracing::info!(provider, "Circuit closed after successful trial call");
        }
        states.insert(provider.to_string(), CircuitState::Closed { failures: 0 });
    }

    pub fn record_failure(&self, provider: &str) {
        let mut states = self.states.write();
        let next = match states.get(provider).copied() {
            Some(CircuitState::Closed { failures }) if failures + 1 < self.config.failure_threshold => {
                CircuitState::Closed {
                    failures: failures + 1,
                }
            }
            None if self.config.failure_threshold > 1 => CircuitState::Closed { failures: 1 },
            Some(CircuitState::Open { opened_at }) => CircuitState::Open { opened_at },
            _ => {
                tracing::warn!(provider, "Circuit opened after repeated provider failures");
                CircuitState::Open {
                    opened_at: Instant::now(),
                }
            }
        };
        states.insert(provider.to_string(), next);
    }

    /// Current state of a provider's circuit.
    pub fn state(&self, provider: &str) -> CircuitState {
        self.states
            .read()
            .get(provider)
            .copied()
            .unwrap_or(CircuitState::Closed { failures: 0 })
    }

    /// Close every circuit.
    pub fn reset(&self) {
        self.states.write().clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, recovery_timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            recovery_timeout,
        })
    }

    #[test]
    fn test_starts_closed() {
        let cb = CircuitBreaker::default();
        assert!(cb.allows("openai"));
        assert_eq!(cb.state("openai"), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = breaker(2, Duration::from_secs(60));

        cb.record_failure("openai");
        assert!(cb.allows("openai"));

        cb.record_failure("openai");
        assert!(!cb.allows("openai"));
        assert!(matches!(cb.state("openai"), CircuitState::Open { .. }));
    }

    #[test]
    fn test_success_resets_failures() {
        let cb = breaker(3, Duration::from_secs(60));
        cb.record_failure("openai");
        cb.record_failure("openai");
        cb.record_success("openai");
        cb.record_failure("openai");
        cb.record_failure("openai");
        assert!(cb.allows("openai"));
    }

    #[test]
    fn test_half_open_after_recovery_timeout() {
        let cb = breaker(1, Duration::ZERO);
        cb.record_failure("openai");
        assert!(matches!(cb.state("openai"), CircuitState::Open { .. }));

        assert!(cb.allows("openai"));
        assert_eq!(cb.state("openai"), CircuitState::HalfOpen);

        cb.record_failure("openai");
        assert!(matches!(cb.state("openai"), CircuitState::Open { .. }));

        assert!(cb.allows("openai"));
        cb.record_success("openai");
        assert_eq!(cb.state("openai"), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_half_open_allows_single_trial() {
        let cb = breaker(1, Duration::ZERO);
        cb.record_failure("openai");

        assert!(cb.allows("openai"));
        assert!(!cb.allows("openai"));
        assert!(!cb.allows("openai"));

        cb.record_success("openai");
        assert!(cb.allows("openai"));
        assert!(cb.allows("openai"));
    }

    #[test]
    fn test_providers_are_independent() {
        let cb = breaker(1, Duration::from_secs(60));
        cb.record_failure("openai");
        assert!(!cb.allows("openai"));
        assert!(cb.allows("static"));

        cb.reset();
        assert!(cb.allows("openai"));
    }
}
