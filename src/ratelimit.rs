//! Token bucket rate limiter over minute-aligned windows (C7).

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cache::{self, namespace, CacheStore};
use crate::domain::ClientId;
use crate::error::RateLimitError;

pub const LIMIT_STANDARD: u32 = 60;
pub const LIMIT_PREMIUM: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub limit: u32,
    pub remaining: u32,
    pub reset: u64,
}

pub struct RateLimiter {
    cache: Arc<dyn CacheStore>,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    fn now_unix() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after the unix epoch")
            .as_secs()
    }

    /// Admits or rejects a request for `client_id` against `limit`. The
    /// cache store is responsible for failing open on its own unavailability
    /// (§4.7) — `increment` is infallible by contract.
    pub async fn check(
        &self,
        client_id: &ClientId,
        limit: u32,
    ) -> Result<RateLimitOutcome, RateLimitError> {
        let now = Self::now_unix();
        let window = now / 60;
        let retry_after = 60 - (now % 60);
        let key = cache::key(namespace::RATE_LIMIT, &format!("{client_id}:{window}"));

        let count = self.cache.increment(&key, Duration::from_secs(60)).await;
        if count > limit as u64 {
            return Err(RateLimitError::Exceeded {
                client_id: client_id.to_string(),
                retry_after,
                limit,
            });
        }

        Ok(RateLimitOutcome {
            limit,
            remaining: limit - count as u32,
            reset: retry_after,
        })
    }
}
