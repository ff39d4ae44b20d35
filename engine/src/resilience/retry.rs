//! Retry policy
//!
//! Re-runs a failed upstream call while the failure is transient and the
//! attempt budget is not exhausted. Waits between attempts grow by
//! `backoff_multiplier` and are capped at `max_wait_duration_ms`. Waiting uses
//! `tokio::time::sleep`, so only the calling task is delayed.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::UpstreamFailure;
use crate::config::RetryConfig;

/// A named, immutable retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    name: String,
    max_attempts: u32,
    wait: Duration,
    multiplier: f64,
    max_wait: Duration,
}

impl RetryPolicy {
    pub fn new(name: impl Into<String>, config: &RetryConfig) -> Self {
        Self {
            name: name.into(),
            max_attempts: config.max_attempts.max(1),
            wait: Duration::from_millis(config.wait_duration_ms),
            multiplier: if config.backoff_multiplier.is_finite() {
                config.backoff_multiplier.max(1.0)
            } else {
                1.0
            },
            max_wait: Duration::from_millis(config.max_wait_duration_ms),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before the attempt following `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.powi(exponent);
        let nanos = self.wait.as_nanos() as f64 * factor;

        if !nanos.is_finite() || nanos >= self.max_wait.as_nanos() as f64 {
            self.max_wait
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out
    ///
    /// The last failure is returned unchanged when the loop gives up.
    pub async fn run<T, F, Fut>(&self, mut call: F) -> Result<T, UpstreamFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamFailure>>,
    {
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(policy = %self.name, attempt, "Upstream call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(failure) if failure.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        policy = %self.name,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Transient upstream failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => {
                    debug!(
                        policy = %self.name,
                        attempt,
                        transient = failure.is_transient(),
                        "Giving up on upstream call"
                    );
                    return Err(failure);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32, wait_ms: u64, multiplier: f64, max_wait_ms: u64) -> RetryPolicy {
        RetryPolicy::new(
            "test",
            &RetryConfig {
                max_attempts,
                wait_duration_ms: wait_ms,
                backoff_multiplier: multiplier,
                max_wait_duration_ms: max_wait_ms,
            },
        )
    }

    fn rate_limited() -> UpstreamFailure {
        UpstreamFailure::Status {
            status: 429,
            body: String::new(),
        }
    }

    #[test]
    fn test_fixed_backoff() {
        let policy = policy(5, 100, 1.0, 10_000);
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = policy(10, 100, 2.0, 500);
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(u32::MAX), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let policy = policy(3, 1, 1.0, 10);
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(rate_limited())
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let policy = policy(3, 1, 1.0, 10);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(rate_limited())
            })
            .await;

        assert_eq!(result.unwrap_err().status(), Some(429));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let policy = policy(5, 1, 1.0, 10);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(UpstreamFailure::Status {
                    status: 400,
                    body: "bad".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let policy = policy(1, 1, 1.0, 10);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(UpstreamFailure::Transport("connection refused".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
