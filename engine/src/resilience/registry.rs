//! Policy registry
//!
//! Holds the named retry and circuit breaker configurations and owns the
//! breaker instances. One registry is shared (behind an `Arc`) by every
//! client in the process, so all callers of a breaker name see the same
//! breaker state. Unknown names fall back to the default configuration.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use super::circuit_breaker::CircuitBreaker;
use super::retry::RetryPolicy;
use crate::config::{CircuitBreakerConfig, Config, RetryConfig};

/// Process-wide registry of resilience policies keyed by name
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    retry_configs: BTreeMap<String, RetryConfig>,
    breaker_configs: BTreeMap<String, CircuitBreakerConfig>,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl PolicyRegistry {
    pub fn new(
        retry_configs: BTreeMap<String, RetryConfig>,
        breaker_configs: BTreeMap<String, CircuitBreakerConfig>,
    ) -> Self {
        Self {
            retry_configs,
            breaker_configs,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Registry seeded from the `[retry.*]` and `[circuit_breaker.*]` sections
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry.clone(), config.circuit_breaker.clone())
    }

    /// Retry policy for `name`
    pub fn retry(&self, name: &str) -> RetryPolicy {
        match self.retry_configs.get(name) {
            Some(config) => RetryPolicy::new(name, config),
            None => RetryPolicy::new(name, &RetryConfig::default()),
        }
    }

    /// Shared breaker for `name`, created on first use
    pub fn circuit_breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(breaker) = breakers.get(name) {
            return Arc::clone(breaker);
        }

        let breaker = match self.breaker_configs.get(name) {
            Some(config) => CircuitBreaker::new(name, config),
            None => {
                debug!(breaker = name, "No configuration for breaker, using defaults");
                CircuitBreaker::new(name, &CircuitBreakerConfig::default())
            }
        };
        let breaker = Arc::new(breaker);
        breakers.insert(name.to_string(), Arc::clone(&breaker));
        breaker
    }
}
