//! Broker configuration and client-limit lookup ports (§5: "Configuration
//! (broker configs, thresholds): read-mostly; cached per worker with TTL").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{self, namespace, CacheStore};
use crate::domain::{BrokerConfig, ClientId, FeeType};
use crate::error::BrokerError;
use crate::ratelimit::{LIMIT_PREMIUM, LIMIT_STANDARD};

/// Read-only lookup ports a broker configuration store must provide.
/// Backed by whatever store of record a deployment chooses (a database, a
/// config service); this crate only specifies the read contract.
#[async_trait]
pub trait BrokerStore: Send + Sync {
    async fn lookup_broker_config(&self, client_id: &ClientId) -> Option<BrokerConfig>;
    async fn lookup_client_limit(&self, client_id: &ClientId) -> u32;
}

/// Caches broker-config lookups in front of an inner [`BrokerStore`], per
/// §5's read-mostly/cached-with-TTL guidance for configuration reads.
pub struct CachedBrokerStore<S> {
    inner: S,
    cache: Arc<dyn CacheStore>,
}

impl<S: BrokerStore> CachedBrokerStore<S> {
    pub fn new(inner: S, cache: Arc<dyn CacheStore>) -> Self {
        Self { inner, cache }
    }

    pub async fn resolve(&self, client_id: &ClientId) -> Result<BrokerConfig, BrokerError> {
        let key = cache::key(namespace::BROKER_CONFIG, client_id.as_str());
        if let Some(bytes) = self.cache.get(&key).await
            && let Some(config) = cache::decode::<BrokerConfig>(&bytes) {
                return Ok(config);
            }

        let config = self
            .inner
            .lookup_broker_config(client_id)
            .await
            .ok_or_else(|| BrokerError::NotFound(client_id.to_string()))?;

        if !config.active {
            return Err(BrokerError::Unauthorized(client_id.to_string()));
        }

        if let Some(encoded) = cache::encode(&config) {
            self.cache.set(&key, encoded, Duration::from_secs(1800)).await;
        }
        Ok(config)
    }

    pub async fn limit_for(&self, client_id: &ClientId) -> u32 {
        self.inner.lookup_client_limit(client_id).await
    }
}

/// A static in-memory broker store, suitable for tests and for seeding a
/// small deployment without an external configuration service.
pub struct StaticBrokerStore {
    configs: HashMap<ClientId, BrokerConfig>,
    premium_clients: std::collections::HashSet<ClientId>,
}

impl StaticBrokerStore {
    pub fn new(
        configs: HashMap<ClientId, BrokerConfig>,
        premium_clients: std::collections::HashSet<ClientId>,
    ) -> Self {
        Self {
            configs,
            premium_clients,
        }
    }

    /// Default configuration used when no broker-specific override exists:
    /// `DEFAULT_MARKUP_PCT` / `DEFAULT_FEE_FLAT` from §6's config table.
    pub fn default_config(client_id: &ClientId) -> BrokerConfig {
        use rust_decimal_macros::dec;
        BrokerConfig {
            client_id: client_id.clone(),
            markup_pct: dec!(5.0),
            fee_type: FeeType::Flat,
            fee_amount: dec!(25.0),
            active: true,
        }
    }
}

#[async_trait]
impl BrokerStore for StaticBrokerStore {
    async fn lookup_broker_config(&self, client_id: &ClientId) -> Option<BrokerConfig> {
        Some(
            self.configs
                .get(client_id)
                .cloned()
                .unwrap_or_else(|| Self::default_config(client_id)),
        )
    }

    async fn lookup_client_limit(&self, client_id: &ClientId) -> u32 {
        if self.premium_clients.contains(client_id) {
            LIMIT_PREMIUM
        } else {
            LIMIT_STANDARD
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryCache;

    #[tokio::test]
    async fn unknown_client_gets_default_config() {
        let store = StaticBrokerStore::new(HashMap::new(), Default::default());
        let cached = CachedBrokerStore::new(store, Arc::new(InMemoryCache::new()));
        let client_id = ClientId::parse("unknown-client").unwrap();
        let config = cached.resolve(&client_id).await.unwrap();
        assert_eq!(config.fee_type, FeeType::Flat);
    }

    #[tokio::test]
    async fn inactive_config_is_unauthorized() {
        let client_id = ClientId::parse("inactive-client").unwrap();
        let mut configs = HashMap::new();
        configs.insert(
            client_id.clone(),
            BrokerConfig {
                client_id: client_id.clone(),
                markup_pct: rust_decimal_macros::dec!(5.0),
                fee_type: FeeType::Flat,
                fee_amount: rust_decimal_macros::dec!(25.0),
                active: false,
            },
        );
        let store = StaticBrokerStore::new(configs, Default::default());
        let cached = CachedBrokerStore::new(store, Arc::new(InMemoryCache::new()));
        let err = cached.resolve(&client_id).await.unwrap_err();
        assert!(matches!(err, BrokerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn premium_client_gets_premium_limit() {
        let client_id = ClientId::parse("premium-client").unwrap();
        let mut premium = std::collections::HashSet::new();
        premium.insert(client_id.clone());
        let store = StaticBrokerStore::new(HashMap::new(), premium);
        assert_eq!(store.lookup_client_limit(&client_id).await, LIMIT_PREMIUM);
    }
}
