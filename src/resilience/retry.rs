//! Retry with exponential backoff and jitter (§4.3).
//!
//! After attempt `n` (0-indexed, counting from the first retry — see
//! DESIGN.md for the open-question decision on this), wait
//! `min(initial_wait * backoff_factor^n, max_wait) * (1 + U(-jitter, jitter))`,
//! capped at zero.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_wait: Duration,
    pub backoff_factor: f64,
    pub max_wait: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_millis(100),
            backoff_factor: 2.0,
            max_wait: Duration::from_secs(30),
            jitter_fraction: 0.1,
        }
    }
}

impl RetryConfig {
    /// Wait time before the retry following failed attempt `n` (0-indexed).
    pub fn wait_for_attempt(&self, n: u32) -> Duration {
        let base = self.initial_wait.as_secs_f64() * self.backoff_factor.powi(n as i32);
        let capped = base.min(self.max_wait.as_secs_f64());
        let jitter = capped * self.jitter_fraction * rand::rng().random_range(-1.0..=1.0);
        Duration::from_secs_f64((capped + jitter).max(0.0))
    }
}

/// Runs `call` up to `config.max_attempts` times with exponential backoff,
/// returning the first success or the last error after exhaustion.
pub async fn retry<T, E, F, Fut>(config: &RetryConfig, mut call: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt + 1 >= config.max_attempts {
                    warn!(attempt, max_attempts = config.max_attempts, %err, "retry attempts exhausted");
                    return Err(err);
                }
                let wait = config.wait_for_attempt(attempt);
                warn!(attempt, ?wait, %err, "retrying after failure");
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

/// Runs `call` with retry, returning `fallback` instead of the last error
/// once attempts are exhausted (§4.3's "retry with fallback").
pub async fn retry_with_fallback<T, E, F, Fut>(config: &RetryConfig, call: F, fallback: T) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match retry(config, call).await {
        Ok(value) => value,
        Err(_) => fallback,
    }
}
