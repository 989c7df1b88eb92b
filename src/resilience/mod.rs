//! Resilience facade (C3): retry-with-backoff wrapped by a per-upstream
//! circuit breaker. The breaker gates whether a call is attempted at all;
//! retries happen inside the single permitted call and their exhaustion (or
//! success) is what the breaker records.

pub mod circuit_breaker;
pub mod retry;

use std::fmt;
use std::future::Future;

use tracing::warn;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::RetryConfig;

use crate::error::UpstreamError;

/// Runs `call` through the breaker-then-retry pipeline for upstream
/// `service`. Short-circuits with `UpstreamError::CircuitOpen` if the breaker
/// is open; otherwise retries per `retry_config` and records the aggregate
/// outcome (success, or exhausted retries) against the breaker.
pub async fn call_upstream<T, E, F, Fut>(
    service: &str,
    breaker: &CircuitBreaker,
    retry_config: &RetryConfig,
    call: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    if !breaker.permit() {
        warn!(service, "circuit open, short-circuiting call");
        return Err(UpstreamError::CircuitOpen {
            service: service.to_string(),
        });
    }

    match retry::retry(retry_config, call).await {
        Ok(value) => {
            breaker.record(true);
            Ok(value)
        }
        Err(err) => {
            breaker.record(false);
            Err(UpstreamError::Unavailable {
                service: service.to_string(),
                reason: err.to_string(),
            })
        }
    }
}
