//! Resilience policies for upstream calls
//!
//! A guarded call is any `FnMut() -> Future<Output = Result<T, UpstreamFailure>>`.
//! [`Resilience::execute`] decorates it in two layers:
//!
//! 1. the named [`retry::RetryPolicy`] re-runs transient failures;
//! 2. the named [`circuit_breaker::CircuitBreaker`] supervises the whole
//!    retried invocation as one unit of work, recording a single outcome.
//!
//! When the breaker is open the call fails fast with `RemoteUnavailable` and
//! the network is never touched. If the returned future is dropped before the
//! call finishes, nothing is recorded and any half-open trial slot it held is
//! released. A failure that survives the retry loop is
//! translated into `RemoteCallFailed`, carrying the upstream status (if any)
//! and a rendered cause, so transport error types never reach callers.

use directory_sdk::errors::DirectoryError;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, warn};

pub mod circuit_breaker;
pub mod registry;
pub mod retry;

pub use circuit_breaker::{
    CallNotPermitted, CallPermit, CircuitBreaker, CircuitBreakerMetrics, CircuitState,
};
pub use registry::PolicyRegistry;
pub use retry::RetryPolicy;

/// Longest slice of an upstream error body kept in a failure message
const MAX_BODY_CHARS: usize = 256;

/// Why a single upstream attempt failed
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamFailure {
    /// No HTTP answer: connect failure, reset, transport timeout
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status
    #[error("upstream answered {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },

    /// Upstream answered successfully but the body could not be decoded
    #[error("could not decode upstream response: {0}")]
    Decode(String),
}

fn body_suffix(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", body.chars().take(MAX_BODY_CHARS).collect::<String>())
    }
}

impl UpstreamFailure {
    /// Wrap a reqwest error that happened before a status was available
    ///
    /// The URL is stripped so ids never end up in failure messages.
    pub fn from_transport(err: reqwest::Error) -> Self {
        UpstreamFailure::Transport(err.without_url().to_string())
    }

    /// Status code carried by the failure, if upstream answered
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying could help: transport errors, timeouts, rate limiting
    /// and gateway/server-side unavailability
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamFailure::Transport(_) => true,
            UpstreamFailure::Status { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            UpstreamFailure::Decode(_) => false,
        }
    }

    /// Terminal translation into the directory error taxonomy
    pub fn into_directory_error(self) -> DirectoryError {
        DirectoryError::RemoteCallFailed {
            status: self.status(),
            cause: self.to_string(),
        }
    }
}

/// Decorator applying a named retry policy inside a named circuit breaker
#[derive(Debug, Clone)]
pub struct Resilience {
    registry: Arc<PolicyRegistry>,
}

impl Resilience {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<PolicyRegistry> {
        &self.registry
    }

    /// Run `call` as one guarded unit of work
    ///
    /// # Errors
    ///
    /// - `RemoteUnavailable` when the breaker refuses the call
    /// - `RemoteCallFailed` when the call fails terminally
    pub async fn execute<T, F, Fut>(
        &self,
        retry_name: &str,
        breaker_name: &str,
        call: F,
    ) -> Result<T, DirectoryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamFailure>>,
    {
        let breaker = self.registry.circuit_breaker(breaker_name);
        let retry = self.registry.retry(retry_name);

        let permit = match breaker.try_acquire() {
            Ok(permit) => permit,
            Err(refused) => {
                warn!(
                    breaker = breaker_name,
                    retry_after_ms = refused.retry_after.as_millis() as u64,
                    "Call not permitted by circuit breaker"
                );
                return Err(DirectoryError::RemoteUnavailable(refused.to_string()));
            }
        };

        match retry.run(call).await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(failure) => {
                // Permanent upstream answers mean upstream is reachable and healthy
                if failure.is_transient() {
                    permit.record_failure();
                } else {
                    permit.record_success();
                }
                error!(
                    retry = retry_name,
                    breaker = breaker_name,
                    status = ?failure.status(),
                    error = %failure,
                    "Guarded upstream call failed"
                );
                Err(failure.into_directory_error())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CircuitBreakerConfig, RetryConfig};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn resilience(max_attempts: u32) -> Resilience {
        resilience_with_open_wait(max_attempts, 60_000)
    }

    fn resilience_with_open_wait(max_attempts: u32, wait_ms: u64) -> Resilience {
        let retry = BTreeMap::from([(
            "r".to_string(),
            RetryConfig {
                max_attempts,
                wait_duration_ms: 1,
                backoff_multiplier: 1.0,
                max_wait_duration_ms: 5,
            },
        )]);
        let breakers = BTreeMap::from([(
            "cb".to_string(),
            CircuitBreakerConfig {
                failure_rate_threshold: 50.0,
                sliding_window_size: 2,
                minimum_number_of_calls: 2,
                wait_duration_in_open_state_ms: wait_ms,
                permitted_calls_in_half_open_state: 1,
            },
        )]);
        Resilience::new(Arc::new(PolicyRegistry::new(retry, breakers)))
    }

    #[test]
    fn test_transient_classification() {
        assert!(UpstreamFailure::Transport("reset".into()).is_transient());
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(UpstreamFailure::Status {
                status,
                body: String::new()
            }
            .is_transient());
        }
        for status in [400, 401, 403, 404, 409, 422, 501] {
            assert!(!UpstreamFailure::Status {
                status,
                body: String::new()
            }
            .is_transient());
        }
        assert!(!UpstreamFailure::Decode("eof".into()).is_transient());
    }

    #[test]
    fn test_failure_message_truncates_body() {
        let failure = UpstreamFailure::Status {
            status: 500,
            body: "x".repeat(1_000),
        };
        let message = failure.to_string();
        assert!(message.starts_with("upstream answered 500: "));
        assert!(message.len() < 300);
    }

    #[tokio::test]
    async fn test_retried_call_counts_once_for_breaker() {
        let resilience = resilience(3);
        let calls = AtomicU32::new(0);

        let value = resilience
            .execute("r", "cb", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(UpstreamFailure::Status {
                        status: 429,
                        body: String::new(),
                    })
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let metrics = resilience.registry().circuit_breaker("cb").metrics();
        assert_eq!(metrics.buffered_calls, 1);
        assert_eq!(metrics.failed_calls, 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_become_remote_call_failed() {
        let resilience = resilience(2);

        let result: Result<(), _> = resilience
            .execute("r", "cb", || async {
                Err(UpstreamFailure::Status {
                    status: 503,
                    body: "busy".to_string(),
                })
            })
            .await;

        match result {
            Err(DirectoryError::RemoteCallFailed { status, cause }) => {
                assert_eq!(status, Some(503));
                assert!(cause.contains("busy"));
            }
            other => panic!("Expected RemoteCallFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_breaker_fails_fast_without_calling() {
        let resilience = resilience(1);
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let _ = resilience
                .execute("r", "cb", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(UpstreamFailure::Transport("refused".into()))
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let result = resilience
            .execute("r", "cb", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DirectoryError::RemoteUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failures_do_not_trip_breaker() {
        let resilience = resilience(3);

        for _ in 0..4 {
            let result: Result<(), _> = resilience
                .execute("r", "cb", || async {
                    Err(UpstreamFailure::Status {
                        status: 400,
                        body: String::new(),
                    })
                })
                .await;
            assert_eq!(result.unwrap_err().upstream_status(), Some(400));
        }

        assert_eq!(
            resilience.registry().circuit_breaker("cb").state(),
            CircuitState::Closed
        );
    }

    #[tokio::test]
    async fn test_cancelled_trial_call_does_not_wedge_half_open() {
        let resilience = resilience_with_open_wait(1, 20);
        let breaker = resilience.registry().circuit_breaker("cb");

        for _ in 0..2 {
            let _ = resilience
                .execute("r", "cb", || async {
                    Err::<(), _>(UpstreamFailure::Transport("refused".into()))
                })
                .await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(40)).await;

        // The caller's deadline fires while the only trial call is in flight
        let slow = resilience.execute("r", "cb", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, UpstreamFailure>(())
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), slow)
            .await
            .is_err());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let result = resilience
            .execute("r", "cb", || async { Ok::<_, UpstreamFailure>(7) })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
