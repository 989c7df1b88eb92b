//! End-to-end fee and rate calculation scenarios against a fake upstream
//! server (S1, S2, S5).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use locate_pricing_engine::audit::VecAuditSink;
use locate_pricing_engine::broker::{CachedBrokerStore, StaticBrokerStore};
use locate_pricing_engine::cache::memory::InMemoryCache;
use locate_pricing_engine::decimal::DAYS_IN_YEAR;
use locate_pricing_engine::domain::{BrokerConfig, ClientId, FeeType, Ticker};
use locate_pricing_engine::engine::rate::RateEngineConfig;
use locate_pricing_engine::orchestrator::Engine;
use locate_pricing_engine::resilience::{CircuitBreaker, CircuitBreakerConfig, RetryConfig};
use locate_pricing_engine::upstream::{BorrowRateClient, EventRiskClient, UpstreamClients, VolatilityClient};
use locate_pricing_engine::validation::RawFeeRequest;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

/// Spins up a fake upstream exposing borrow-rate, volatility, and event-risk
/// endpoints with canned fixtures keyed by ticker.
async fn spawn_fake_upstream(fixtures: HashMap<&'static str, Value>) -> String {
    let fixtures = Arc::new(fixtures);

    let borrow = fixtures.clone();
    let vol = fixtures.clone();
    let events = fixtures.clone();

    let app = Router::new()
        .route(
            "/api/borrows/{ticker}",
            get(move |Path(ticker): Path<String>| {
                let fixtures = borrow.clone();
                async move {
                    let fixture = fixtures.get(ticker.as_str()).cloned().unwrap();
                    Json(fixture["borrow_rate"].clone())
                }
            }),
        )
        .route(
            "/market/volatility/stock/{ticker}",
            get(move |Path(ticker): Path<String>| {
                let fixtures = vol.clone();
                async move {
                    let fixture = fixtures.get(ticker.as_str()).cloned().unwrap();
                    Json(fixture["volatility"].clone())
                }
            }),
        )
        .route(
            "/events",
            get(move |axum::extract::Query(params): axum::extract::Query<HashMap<String, String>>| {
                let fixtures = events.clone();
                async move {
                    let ticker = params.get("ticker").cloned().unwrap_or_default();
                    let fixture = fixtures.get(ticker.as_str()).cloned().unwrap();
                    Json(fixture["events"].clone())
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 1,
        initial_wait: std::time::Duration::from_millis(1),
        ..RetryConfig::default()
    }
}

async fn build_engine(
    base_url: &str,
) -> Engine<StaticBrokerStore> {
    let cache: Arc<dyn locate_pricing_engine::cache::CacheStore> = Arc::new(InMemoryCache::new());
    let http = reqwest::Client::new();

    let borrow_client = BorrowRateClient::new(
        http.clone(),
        base_url,
        cache.clone(),
        CircuitBreaker::new("borrow_rate", CircuitBreakerConfig::default()),
        retry_config(),
        dec!(0.0001),
    );
    let volatility_client = VolatilityClient::new(
        http.clone(),
        base_url,
        cache.clone(),
        CircuitBreaker::new("volatility", CircuitBreakerConfig::default()),
        retry_config(),
    );
    let event_risk_client = EventRiskClient::new(
        http,
        base_url,
        cache.clone(),
        CircuitBreaker::new("event_risk", CircuitBreakerConfig::default()),
        retry_config(),
    );

    let client_a = ClientId::parse("client_A").unwrap();
    let client_b = ClientId::parse("client_B").unwrap();
    let mut configs = HashMap::new();
    configs.insert(
        client_a.clone(),
        BrokerConfig {
            client_id: client_a.clone(),
            markup_pct: dec!(5),
            fee_type: FeeType::Flat,
            fee_amount: dec!(25),
            active: true,
        },
    );
    configs.insert(
        client_b.clone(),
        BrokerConfig {
            client_id: client_b.clone(),
            markup_pct: dec!(10),
            fee_type: FeeType::Percentage,
            fee_amount: dec!(0.5),
            active: true,
        },
    );
    let broker = CachedBrokerStore::new(
        StaticBrokerStore::new(configs, HashSet::new()),
        cache.clone(),
    );

    let upstream = UpstreamClients {
        borrow: borrow_client,
        volatility: volatility_client,
        event_risk: event_risk_client,
    };

    Engine::new(
        cache,
        broker,
        upstream,
        RateEngineConfig::default(),
        Arc::new(VecAuditSink::new()),
        DAYS_IN_YEAR,
    )
}

#[tokio::test]
async fn scenario_s1_aapl_flat_fee() {
    let mut fixtures = HashMap::new();
    fixtures.insert(
        "AAPL",
        json!({
            "borrow_rate": {"rate": "0.05", "status": "EASY"},
            "volatility": {"ticker": "AAPL", "volatility": "20"},
            "events": {"events": [{"event_id": "e1", "event_type": "earnings", "risk_factor": 2}]},
        }),
    );
    let base_url = spawn_fake_upstream(fixtures).await;
    let engine = build_engine(&base_url).await;

    let raw = RawFeeRequest {
        ticker: "AAPL".to_string(),
        position_value: dec!(100000),
        loan_days: 30,
        client_id: "client_A".to_string(),
    };
    let (result, _outcome) = engine.calculate_fee(raw).await.unwrap();

    assert_eq!(result.borrow_rate_used, dec!(0.0606));
    assert_eq!(result.breakdown.borrow_cost, dec!(498.0822));
    assert_eq!(result.breakdown.markup, dec!(24.9041));
    assert_eq!(result.breakdown.transaction_fees, dec!(25.0000));
    assert_eq!(result.total_fee, dec!(547.9863));
}

#[tokio::test]
async fn scenario_s2_gme_percentage_fee() {
    let mut fixtures = HashMap::new();
    fixtures.insert(
        "GME",
        json!({
            "borrow_rate": {"rate": "0.25", "status": "HARD"},
            "volatility": {"ticker": "GME", "volatility": "35"},
            "events": {"events": [{"event_id": "e1", "event_type": "earnings", "risk_factor": 8}]},
        }),
    );
    let base_url = spawn_fake_upstream(fixtures).await;
    let engine = build_engine(&base_url).await;

    let raw = RawFeeRequest {
        ticker: "GME".to_string(),
        position_value: dec!(50000),
        loan_days: 60,
        client_id: "client_B".to_string(),
    };
    let (result, _outcome) = engine.calculate_fee(raw).await.unwrap();

    assert_eq!(result.borrow_rate_used, dec!(0.3673));
    assert_eq!(result.breakdown.transaction_fees, dec!(250.0000));
    assert_eq!(
        result.total_fee,
        result.breakdown.borrow_cost + result.breakdown.markup + result.breakdown.transaction_fees
    );
}

#[tokio::test]
async fn scenario_s5_second_identical_request_is_a_cache_hit() {
    let mut fixtures = HashMap::new();
    fixtures.insert(
        "AAPL",
        json!({
            "borrow_rate": {"rate": "0.05", "status": "EASY"},
            "volatility": {"ticker": "AAPL", "volatility": "20"},
            "events": {"events": [{"event_id": "e1", "event_type": "earnings", "risk_factor": 2}]},
        }),
    );
    let base_url = spawn_fake_upstream(fixtures).await;
    let engine = build_engine(&base_url).await;

    let raw = || RawFeeRequest {
        ticker: "AAPL".to_string(),
        position_value: dec!(100000),
        loan_days: 30,
        client_id: "client_A".to_string(),
    };

    let (first, _) = engine.calculate_fee(raw()).await.unwrap();
    let (second, _) = engine.calculate_fee(raw()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn get_rate_returns_adjusted_rate() {
    let mut fixtures = HashMap::new();
    fixtures.insert(
        "AAPL",
        json!({
            "borrow_rate": {"rate": "0.05", "status": "EASY"},
            "volatility": {"ticker": "AAPL", "volatility": "20"},
            "events": {"events": [{"event_id": "e1", "event_type": "earnings", "risk_factor": 2}]},
        }),
    );
    let base_url = spawn_fake_upstream(fixtures).await;
    let engine = build_engine(&base_url).await;

    let ticker = Ticker::parse("AAPL").unwrap();
    let snapshot = engine.get_rate(&ticker).await.unwrap();
    assert_eq!(snapshot.base_rate, dec!(0.0606));
}
