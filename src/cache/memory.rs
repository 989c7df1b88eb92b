//! In-process TTL store: the default cache backend, and the one used by
//! tests. A real deployment could swap in a distributed store (e.g. Redis)
//! behind the same `CacheStore` trait without touching call sites.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::warn;

use super::CacheStore;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(key, "cache lock poisoned, treating as miss");
                return None;
            }
        };
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let Ok(mut entries) = self.entries.lock() else {
            warn!(key, "cache lock poisoned, dropping set");
            return;
        };
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn delete(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    async fn increment(&self, key: &str, ttl: Duration) -> u64 {
        let Ok(mut entries) = self.entries.lock() else {
            warn!(key, "cache lock poisoned, treating increment as 1");
            return 1;
        };
        let now = Instant::now();
        let count = match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                let current = super::decode::<u64>(&entry.value).unwrap_or(0);
                current + 1
            }
            _ => 1,
        };
        let encoded = super::encode(&count).unwrap_or_default();
        entries.insert(
            key.to_string(),
            Entry {
                value: encoded,
                expires_at: now + ttl,
            },
        );
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn get_misses_after_ttl_expires() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await;
        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn increment_initializes_and_counts() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.increment("c", Duration::from_secs(60)).await, 1);
        assert_eq!(cache.increment("c", Duration::from_secs(60)).await, 2);
        assert_eq!(cache.increment("c", Duration::from_secs(60)).await, 3);
    }

    #[tokio::test]
    async fn miss_is_returned_for_unknown_key() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("missing").await, None);
    }
}
