//! Upstream clients (C4): borrow-rate, volatility, and event-risk feeds.
//!
//! All three share the same shape: consult the cache first, then fall
//! through C3 (retry + circuit breaker) to the live feed, writing a
//! successful live result back to the cache. Each wraps its own
//! [`CircuitBreaker`](crate::resilience::CircuitBreaker) by service name.

pub mod borrow_rate;
pub mod event_risk;
pub mod http;
pub mod volatility;

pub use borrow_rate::BorrowRateClient;
pub use event_risk::EventRiskClient;
pub use http::build_client;
pub use volatility::VolatilityClient;

/// The three feed clients an [`Engine`](crate::orchestrator::Engine) fans
/// out to, bundled so callers wire them up once rather than threading three
/// separate constructor arguments.
pub struct UpstreamClients {
    pub borrow: BorrowRateClient,
    pub volatility: VolatilityClient,
    pub event_risk: EventRiskClient,
}
