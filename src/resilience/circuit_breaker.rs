//! Per-upstream circuit breaker (§4.3).
//!
//! One instance per upstream service name. State is held in-process and
//! guarded by a single mutex; breakers are not shared across workers and
//! correctness does not depend on global agreement.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(60),
        }
    }
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

/// A single named circuit breaker. Construct one per upstream service and
/// share it (e.g. behind an `Arc`) across requests on the same worker.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            }),
        }
    }

    /// Transitions `OPEN -> HALF_OPEN` if the timeout has elapsed. Called
    /// before every permit check so the breaker self-heals without an
    /// external timer.
    fn refresh_state(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open
            && let Some(opened_at) = inner.opened_at
                && opened_at.elapsed() >= self.config.timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    info!(service = %self.name, "circuit transitioned OPEN -> HALF_OPEN after timeout");
                }
    }

    /// Returns `true` if a call should be attempted; `false` if the breaker
    /// is open and the call should short-circuit.
    pub fn permit(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        self.refresh_state(&mut inner);
        inner.state != CircuitState::Open
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        self.refresh_state(&mut inner);
        inner.state
    }

    /// Records the outcome of a permitted call. A successful retry counts as
    /// one success; an exhausted retry counts as one failure (§4.3).
    pub fn record(&self, success: bool) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match (inner.state, success) {
            (CircuitState::Closed, true) => {
                inner.failure_count = 0;
            }
            (CircuitState::Closed, false) => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!(
                        service = %self.name,
                        failures = inner.failure_count,
                        "circuit transitioned CLOSED -> OPEN"
                    );
                }
            }
            (CircuitState::HalfOpen, true) => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.success_count = 0;
                    inner.failure_count = 0;
                    info!(service = %self.name, "circuit transitioned HALF_OPEN -> CLOSED");
                }
            }
            (CircuitState::HalfOpen, false) => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.success_count = 0;
                warn!(service = %self.name, "circuit transitioned HALF_OPEN -> OPEN after probe failure");
            }
            (CircuitState::Open, _) => {
                // A call slipped through a race between `permit` and `record`; ignore.
            }
        }
    }

    /// Manually resets the breaker to `CLOSED` (operational use, not wired
    /// to any HTTP route — see SPEC_FULL.md §C).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.opened_at = None;
        info!(service = %self.name, "circuit manually reset to CLOSED");
    }
}
