//! Cache fabric (C2): keyed get/put with TTL, namespaced by data kind.
//!
//! The store degrades open: a cache error is logged and treated as a miss
//! (for `get`) or a no-op (for `set`). The cache must never be the reason a
//! calculation fails (§4.2).

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

/// Per-namespace TTLs from §4.2.
pub mod namespace {
    use std::time::Duration;

    pub const BORROW_RATE: &str = "borrow_rate";
    pub const VOLATILITY: &str = "volatility";
    pub const EVENT_RISK: &str = "event_risk";
    pub const BROKER_CONFIG: &str = "broker_config";
    pub const CALCULATION: &str = "calculation";
    pub const MIN_RATE: &str = "min_rate";
    pub const RATE_LIMIT: &str = "rate_limit";

    pub const MARKET_VOLATILITY_KEY: &str = "__market__";

    pub fn ttl_for(namespace: &str) -> Duration {
        match namespace {
            BORROW_RATE => Duration::from_secs(300),
            VOLATILITY => Duration::from_secs(900),
            EVENT_RISK => Duration::from_secs(3600),
            BROKER_CONFIG => Duration::from_secs(1800),
            CALCULATION => Duration::from_secs(60),
            MIN_RATE => Duration::from_secs(86400),
            RATE_LIMIT => Duration::from_secs(60),
            other => unreachable!("unknown cache namespace: {other}"),
        }
    }
}

/// Builds a namespaced key: `namespace:identifier`.
pub fn key(namespace: &str, identifier: &str) -> String {
    format!("{namespace}:{identifier}")
}

/// A key-value store with per-entry TTL. Implementations must fail open:
/// errors are swallowed (and should be logged by the implementation) rather
/// than propagated, since a cache failure must never fail a calculation.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);
    async fn delete(&self, key: &str);

    /// Atomically increments a counter, initializing it to 1 with the given
    /// TTL if absent, and returns the post-increment value. Used by the rate
    /// limiter (C7), which requires increment-and-set-TTL-if-new semantics
    /// in a single round trip.
    async fn increment(&self, key: &str, ttl: Duration) -> u64;
}

/// Serializes a value to the cache's opaque binary encoding (JSON, per
/// §4.2's "implementation may use any binary encoding").
pub fn encode<T: serde::Serialize>(value: &T) -> Option<Vec<u8>> {
    serde_json::to_vec(value).ok()
}

pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    serde_json::from_slice(bytes).ok()
}
