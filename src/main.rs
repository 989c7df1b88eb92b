use std::sync::Arc;

use locate_pricing_engine::audit::TracingAuditSink;
use locate_pricing_engine::broker::{CachedBrokerStore, StaticBrokerStore};
use locate_pricing_engine::cache::memory::InMemoryCache;
use locate_pricing_engine::config::Settings;
use locate_pricing_engine::orchestrator::Engine;
use locate_pricing_engine::resilience::CircuitBreaker;
use locate_pricing_engine::upstream::{
    build_client, BorrowRateClient, EventRiskClient, UpstreamClients, VolatilityClient,
};

#[tokio::main]
async fn main() {
    let settings = Settings::from_env();
    init_tracing(settings.log_json);

    let cache: Arc<dyn locate_pricing_engine::cache::CacheStore> = Arc::new(InMemoryCache::new());
    let http = build_client(settings.upstream_timeout);

    let cb_config = settings.circuit_breaker_config();
    let retry_config = settings.retry_config();

    let borrow_client = BorrowRateClient::new(
        http.clone(),
        settings.borrow_rate_base_url.clone(),
        cache.clone(),
        CircuitBreaker::new("borrow_rate", cb_config),
        retry_config,
        settings.min_borrow_rate,
    );
    let volatility_client = VolatilityClient::new(
        http.clone(),
        settings.volatility_base_url.clone(),
        cache.clone(),
        CircuitBreaker::new("volatility", cb_config),
        retry_config,
    );
    let event_risk_client = EventRiskClient::new(
        http,
        settings.event_risk_base_url.clone(),
        cache.clone(),
        CircuitBreaker::new("event_risk", cb_config),
        retry_config,
    );

    let broker_store = CachedBrokerStore::new(
        StaticBrokerStore::new(Default::default(), Default::default()),
        cache.clone(),
    );

    let upstream = UpstreamClients {
        borrow: borrow_client,
        volatility: volatility_client,
        event_risk: event_risk_client,
    };

    let engine = Arc::new(Engine::new(
        cache,
        broker_store,
        upstream,
        settings.rate_engine_config(),
        Arc::new(TracingAuditSink),
        settings.days_in_year,
    ));

    let app = locate_pricing_engine::api::router(engine);

    let listener = tokio::net::TcpListener::bind(&settings.listen_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", settings.listen_addr));
    tracing::info!(addr = %settings.listen_addr, "locate pricing engine listening");
    axum::serve(listener, app)
        .await
        .expect("server exited unexpectedly");
}

fn init_tracing(log_json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
