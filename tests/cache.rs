//! Cache fabric TTL and namespace fingerprint tests.

use std::time::Duration;

use locate_pricing_engine::cache::memory::InMemoryCache;
use locate_pricing_engine::cache::{self, namespace, CacheStore};
use locate_pricing_engine::domain::FeeType;
use locate_pricing_engine::domain::Ticker;
use locate_pricing_engine::orchestrator::fingerprint;
use rust_decimal_macros::dec;

#[tokio::test]
async fn cached_value_round_trips_through_namespaced_key() {
    let cache = InMemoryCache::new();
    let key = cache::key(namespace::BORROW_RATE, "AAPL");
    let encoded = cache::encode(&dec!(0.05)).unwrap();
    cache.set(&key, encoded, Duration::from_secs(60)).await;

    let bytes = cache.get(&key).await.unwrap();
    let decoded: rust_decimal::Decimal = cache::decode(&bytes).unwrap();
    assert_eq!(decoded, dec!(0.05));
}

#[test]
fn namespace_ttls_match_configuration_table() {
    assert_eq!(namespace::ttl_for(namespace::BORROW_RATE), Duration::from_secs(300));
    assert_eq!(namespace::ttl_for(namespace::VOLATILITY), Duration::from_secs(900));
    assert_eq!(namespace::ttl_for(namespace::EVENT_RISK), Duration::from_secs(3600));
    assert_eq!(namespace::ttl_for(namespace::BROKER_CONFIG), Duration::from_secs(1800));
    assert_eq!(namespace::ttl_for(namespace::CALCULATION), Duration::from_secs(60));
    assert_eq!(namespace::ttl_for(namespace::MIN_RATE), Duration::from_secs(86400));
    assert_eq!(namespace::ttl_for(namespace::RATE_LIMIT), Duration::from_secs(60));
}

#[test]
fn fingerprint_is_identical_for_equal_inputs_under_canonicalization() {
    let ticker = Ticker::parse("aapl").unwrap();
    let a = fingerprint(&ticker, dec!(100000.00), 30, dec!(5.00), FeeType::Flat, dec!(25.0));
    let b = fingerprint(&ticker, dec!(100000), 30, dec!(5), FeeType::Flat, dec!(25));
    assert_eq!(a, b);
}

#[test]
fn fingerprint_differs_on_ticker() {
    let a = fingerprint(&Ticker::parse("AAPL").unwrap(), dec!(1000), 10, dec!(5), FeeType::Flat, dec!(25));
    let b = fingerprint(&Ticker::parse("GME").unwrap(), dec!(1000), 10, dec!(5), FeeType::Flat, dec!(25));
    assert_ne!(a, b);
}
