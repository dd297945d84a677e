//! Resilience for decision provider calls.
//!
//! Transient failures are retried with exponential backoff inside the
//! checker; repeated failures open a per-provider circuit so that later
//! checks fall back to manual review without waiting on a broken provider.

mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
