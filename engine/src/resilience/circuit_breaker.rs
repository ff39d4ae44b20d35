//! Circuit breaker
//!
//! A count-based breaker over the most recent call outcomes. It has three
//! states:
//!
//! - **Closed**: calls pass through; outcomes fill a sliding window. Once the
//!   window holds at least `minimum_number_of_calls` outcomes and the failure
//!   rate reaches `failure_rate_threshold`, the breaker trips.
//! - **Open**: calls are rejected without touching the network until
//!   `wait_duration_in_open_state` has elapsed.
//! - **HalfOpen**: up to `permitted_calls_in_half_open_state` trial calls are
//!   admitted. When all of their outcomes are in, the breaker closes if the
//!   trial failure rate is below the threshold and re-opens otherwise.
//!
//! Every transition happens under one mutex, so concurrent callers always
//! observe the same state: nobody is admitted through a stale "closed" view
//! after another caller's failure tripped the breaker.
//!
//! Admission hands out a [`CallPermit`]. The outcome is recorded through the
//! permit; a permit dropped without an outcome (the caller's future was
//! cancelled) gives its half-open trial slot back instead of holding it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::CircuitBreakerConfig;

/// Current state of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Returned when the breaker refuses a call
#[derive(Debug, Clone, thiserror::Error)]
#[error("circuit breaker '{name}' is {state}, retry after {retry_after:?}")]
pub struct CallNotPermitted {
    pub name: String,
    pub state: CircuitState,
    pub retry_after: Duration,
}

/// Admission granted by [`CircuitBreaker::try_acquire`]
///
/// Consume it with `record_success` or `record_failure`. Dropping it without
/// an outcome releases its half-open trial slot, if it held one.
#[must_use = "dropping a permit without an outcome records nothing"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    recorded: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, generation: u64) -> Self {
        Self {
            breaker,
            generation,
            recorded: false,
        }
    }

    pub fn record_success(mut self) {
        self.recorded = true;
        self.breaker.record(false);
    }

    pub fn record_failure(mut self) {
        self.recorded = true;
        self.breaker.record(true);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.breaker.release(self.generation);
        }
    }
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    /// Outcomes currently held in the window (or trial outcomes when half-open)
    pub buffered_calls: u32,
    /// Failures among `buffered_calls`
    pub failed_calls: u32,
    /// Calls rejected since the breaker was created
    pub not_permitted_calls: u64,
    /// Times the breaker has tripped
    pub open_count: u64,
}

impl CircuitBreakerMetrics {
    /// Failure rate in percent, `None` while nothing is buffered
    pub fn failure_rate(&self) -> Option<f64> {
        failure_rate(self.failed_calls, self.buffered_calls)
    }
}

/// Settings with durations resolved
#[derive(Debug, Clone)]
struct Settings {
    failure_rate_threshold: f64,
    sliding_window_size: usize,
    minimum_number_of_calls: usize,
    wait_in_open: Duration,
    half_open_permits: u32,
}

impl From<&CircuitBreakerConfig> for Settings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        let sliding_window_size = config.sliding_window_size.max(1) as usize;
        Self {
            failure_rate_threshold: config.failure_rate_threshold,
            sliding_window_size,
            // A minimum above the window size could never be reached
            minimum_number_of_calls: (config.minimum_number_of_calls.max(1) as usize)
                .min(sliding_window_size),
            wait_in_open: Duration::from_millis(config.wait_duration_in_open_state_ms),
            half_open_permits: config.permitted_calls_in_half_open_state.max(1),
        }
    }
}

struct Inner {
    state: CircuitState,
    /// Closed-state outcomes, `true` = failure
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_admitted: u32,
    half_open_calls: u32,
    half_open_failures: u32,
    /// Bumped on every state change so stale permits can be told apart
    generation: u64,
    not_permitted: u64,
    open_count: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            opened_at: None,
            half_open_admitted: 0,
            half_open_calls: 0,
            half_open_failures: 0,
            generation: 0,
            not_permitted: 0,
            open_count: 0,
        }
    }

    fn reset_half_open(&mut self) {
        self.half_open_admitted = 0;
        self.half_open_calls = 0;
        self.half_open_failures = 0;
    }
}

fn failure_rate(failures: u32, calls: u32) -> Option<f64> {
    if calls == 0 {
        None
    } else {
        Some(f64::from(failures) * 100.0 / f64::from(calls))
    }
}

/// Thread-safe circuit breaker
pub struct CircuitBreaker {
    name: String,
    settings: Settings,
    inner: Mutex<Inner>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a closed breaker
    pub fn new(name: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            settings: Settings::from(config),
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // A panic while holding the lock leaves the counters consistent, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move Open -> HalfOpen once the open period has elapsed
    fn refresh(&self, inner: &mut Inner) {
        if inner.state != CircuitState::Open {
            return;
        }
        let elapsed = inner
            .opened_at
            .map(|at| at.elapsed() >= self.settings.wait_in_open)
            .unwrap_or(true);
        if elapsed {
            self.transition(inner, CircuitState::HalfOpen);
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        inner.generation += 1;
        match to {
            CircuitState::Closed => {
                inner.window.clear();
                inner.opened_at = None;
                inner.reset_half_open();
            }
            CircuitState::Open => {
                inner.window.clear();
                inner.opened_at = Some(Instant::now());
                inner.reset_half_open();
                inner.open_count += 1;
            }
            CircuitState::HalfOpen => {
                inner.opened_at = None;
                inner.reset_half_open();
            }
        }
        info!(
            breaker = %self.name,
            from = %from,
            to = %to,
            "Circuit breaker state transition"
        );
    }

    /// Current state, applying a pending Open -> HalfOpen transition
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        inner.state
    }

    /// Ask permission to make a call
    ///
    /// The outcome is reported through the returned permit.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, CallNotPermitted> {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        let generation = inner.generation;

        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, generation)),
            CircuitState::Open => {
                inner.not_permitted += 1;
                let retry_after = inner
                    .opened_at
                    .map(|at| self.settings.wait_in_open.saturating_sub(at.elapsed()))
                    .unwrap_or(self.settings.wait_in_open);
                Err(CallNotPermitted {
                    name: self.name.clone(),
                    state: CircuitState::Open,
                    retry_after,
                })
            }
            CircuitState::HalfOpen => {
                if inner.half_open_admitted < self.settings.half_open_permits {
                    inner.half_open_admitted += 1;
                    debug!(
                        breaker = %self.name,
                        admitted = inner.half_open_admitted,
                        permitted = self.settings.half_open_permits,
                        "Admitting trial call"
                    );
                    Ok(CallPermit::new(self, generation))
                } else {
                    inner.not_permitted += 1;
                    Err(CallNotPermitted {
                        name: self.name.clone(),
                        state: CircuitState::HalfOpen,
                        retry_after: Duration::ZERO,
                    })
                }
            }
        }
    }

    /// Give back a half-open trial slot whose call never reported an outcome
    ///
    /// Only applies while the breaker is still in the half-open period that
    /// admitted the call.
    fn release(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen
            && inner.generation == generation
            && inner.half_open_admitted > 0
        {
            inner.half_open_admitted -= 1;
            debug!(
                breaker = %self.name,
                admitted = inner.half_open_admitted,
                "Trial call abandoned, slot released"
            );
        }
    }

    fn record(&self, failed: bool) {
        let mut inner = self.lock();
        self.refresh(&mut inner);

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(failed);
                while inner.window.len() > self.settings.sliding_window_size {
                    inner.window.pop_front();
                }

                let calls = inner.window.len();
                if calls < self.settings.minimum_number_of_calls {
                    return;
                }
                let failures = inner.window.iter().filter(|f| **f).count();
                let rate = failures as f64 * 100.0 / calls as f64;
                if rate >= self.settings.failure_rate_threshold {
                    warn!(
                        breaker = %self.name,
                        failure_rate = rate,
                        threshold = self.settings.failure_rate_threshold,
                        calls,
                        "Circuit breaker tripped"
                    );
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.half_open_calls += 1;
                if failed {
                    inner.half_open_failures += 1;
                }
                if inner.half_open_calls < self.settings.half_open_permits {
                    return;
                }
                let rate = failure_rate(inner.half_open_failures, inner.half_open_calls)
                    .unwrap_or(0.0);
                if rate >= self.settings.failure_rate_threshold {
                    warn!(
                        breaker = %self.name,
                        failure_rate = rate,
                        "Trial calls failed, re-opening circuit breaker"
                    );
                    self.transition(&mut inner, CircuitState::Open);
                } else {
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            // Outcome of a call admitted before another caller tripped the breaker
            CircuitState::Open => {}
        }
    }

    /// Snapshot of the breaker's counters
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let mut inner = self.lock();
        self.refresh(&mut inner);

        let (buffered_calls, failed_calls) = match inner.state {
            CircuitState::HalfOpen => (inner.half_open_calls, inner.half_open_failures),
            _ => (
                inner.window.len() as u32,
                inner.window.iter().filter(|f| **f).count() as u32,
            ),
        };

        CircuitBreakerMetrics {
            state: inner.state,
            buffered_calls,
            failed_calls,
            not_permitted_calls: inner.not_permitted,
            open_count: inner.open_count,
        }
    }

    /// Force the breaker open (operator action)
    pub fn transition_to_open(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Open);
    }

    /// Force the breaker half-open (operator action)
    pub fn transition_to_half_open(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::HalfOpen);
    }

    /// Force the breaker closed, discarding recorded outcomes
    pub fn reset(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Closed);
        inner.window.clear();
    }
}
