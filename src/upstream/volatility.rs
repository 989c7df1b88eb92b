//! Volatility feed client (§4.4): market-wide index and per-ticker.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::warn;

use crate::cache::{self, namespace, CacheStore};
use crate::domain::{Ticker, VolatilitySnapshot};
use crate::error::UpstreamError;
use crate::resilience::{CircuitBreaker, RetryConfig};

const SERVICE: &str = "volatility";
const DEFAULT_VOL_INDEX: Decimal = dec!(20.0);

#[derive(Debug, Deserialize)]
struct MarketVolatilityResponse {
    value: Decimal,
}

#[derive(Debug, Deserialize)]
struct TickerVolatilityResponse {
    volatility: Decimal,
}

pub struct VolatilityClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<dyn CacheStore>,
    breaker: CircuitBreaker,
    retry_config: RetryConfig,
}

impl VolatilityClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        cache: Arc<dyn CacheStore>,
        breaker: CircuitBreaker,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            cache,
            breaker,
            retry_config,
        }
    }

    fn snapshot(
        &self,
        ticker: Option<Ticker>,
        vol_index: Decimal,
        source: &str,
        is_fallback: bool,
        sanitized: bool,
    ) -> VolatilitySnapshot {
        VolatilitySnapshot {
            ticker,
            vol_index,
            timestamp: Utc::now(),
            source: source.to_string(),
            is_fallback,
            sanitized,
        }
    }

    async fn fetch_market_live(&self) -> Result<Decimal, UpstreamError> {
        let url = format!("{}/market/volatility/index", self.base_url);
        let resp = crate::resilience::call_upstream(SERVICE, &self.breaker, &self.retry_config, || {
            let http = self.http.clone();
            let url = url.clone();
            async move {
                let resp = http.get(&url).send().await.map_err(|e| e.to_string())?;
                let body: MarketVolatilityResponse = resp
                    .error_for_status()
                    .map_err(|e| e.to_string())?
                    .json()
                    .await
                    .map_err(|e| e.to_string())?;
                Ok::<_, String>(body)
            }
        })
        .await?;
        Ok(resp.value)
    }

    /// Returns the market-wide volatility snapshot, falling back to the
    /// configured default (20.0) when the upstream is exhausted.
    pub async fn fetch_market(&self) -> VolatilitySnapshot {
        let key = cache::key(namespace::VOLATILITY, namespace::MARKET_VOLATILITY_KEY);
        if let Some(bytes) = self.cache.get(&key).await
            && let Some(snapshot) = cache::decode::<VolatilitySnapshot>(&bytes) {
                return snapshot;
            }

        match self.fetch_market_live().await {
            Ok(value) if value.is_sign_negative() => {
                warn!(vol_index = %value, "market volatility upstream returned negative index, rejecting");
                self.snapshot(None, DEFAULT_VOL_INDEX, "fallback", true, true)
            }
            Ok(value) => {
                let snapshot = self.snapshot(None, value, SERVICE, false, false);
                if let Some(encoded) = cache::encode(&snapshot) {
                    self.cache.set(&key, encoded, Duration::from_secs(900)).await;
                }
                snapshot
            }
            Err(err) => {
                warn!(%err, "market volatility upstream exhausted, using default");
                self.snapshot(None, DEFAULT_VOL_INDEX, "fallback", true, false)
            }
        }
    }

    async fn fetch_ticker_live(&self, ticker: &Ticker) -> Result<Decimal, UpstreamError> {
        let url = format!("{}/market/volatility/stock/{}", self.base_url, ticker.as_str());
        let resp = crate::resilience::call_upstream(SERVICE, &self.breaker, &self.retry_config, || {
            let http = self.http.clone();
            let url = url.clone();
            async move {
                let resp = http.get(&url).send().await.map_err(|e| e.to_string())?;
                let body: TickerVolatilityResponse = resp
                    .error_for_status()
                    .map_err(|e| e.to_string())?
                    .json()
                    .await
                    .map_err(|e| e.to_string())?;
                Ok::<_, String>(body)
            }
        })
        .await?;
        Ok(resp.volatility)
    }

    /// Returns the per-ticker volatility snapshot. On upstream failure,
    /// falls back to the market-wide snapshot (which has its own fallback).
    pub async fn fetch_ticker(&self, ticker: &Ticker) -> VolatilitySnapshot {
        let key = cache::key(namespace::VOLATILITY, ticker.as_str());
        if let Some(bytes) = self.cache.get(&key).await
            && let Some(snapshot) = cache::decode::<VolatilitySnapshot>(&bytes) {
                return snapshot;
            }

        match self.fetch_ticker_live(ticker).await {
            Ok(value) if value.is_sign_negative() => {
                warn!(ticker = %ticker, vol_index = %value, "per-ticker volatility upstream returned negative index, rejecting");
                self.snapshot(Some(ticker.clone()), DEFAULT_VOL_INDEX, "fallback", true, true)
            }
            Ok(value) => {
                let snapshot = self.snapshot(Some(ticker.clone()), value, SERVICE, false, false);
                if let Some(encoded) = cache::encode(&snapshot) {
                    self.cache.set(&key, encoded, Duration::from_secs(900)).await;
                }
                snapshot
            }
            Err(err) => {
                warn!(ticker = %ticker, %err, "per-ticker volatility upstream exhausted, falling back to market index");
                self.fetch_market().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryCache;
    use crate::resilience::CircuitBreakerConfig;

    fn client(base_url: String) -> VolatilityClient {
        VolatilityClient::new(
            reqwest::Client::new(),
            base_url,
            Arc::new(InMemoryCache::new()),
            CircuitBreaker::new(SERVICE, CircuitBreakerConfig::default()),
            RetryConfig {
                max_attempts: 1,
                initial_wait: Duration::from_millis(1),
                ..RetryConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn market_falls_back_to_default_when_unreachable() {
        let c = client("http://127.0.0.1:1".to_string());
        let snapshot = c.fetch_market().await;
        assert!(snapshot.is_fallback);
        assert_eq!(snapshot.vol_index, DEFAULT_VOL_INDEX);
    }

    #[tokio::test]
    async fn ticker_falls_back_to_market_when_unreachable() {
        let c = client("http://127.0.0.1:1".to_string());
        let ticker = Ticker::parse("TSLA").unwrap();
        let snapshot = c.fetch_ticker(&ticker).await;
        assert!(snapshot.is_fallback);
        assert_eq!(snapshot.vol_index, DEFAULT_VOL_INDEX);
        assert!(snapshot.ticker.is_none());
    }

    async fn spawn_negative_index_server() -> String {
        use axum::routing::get;
        use axum::Router;

        let app = Router::new()
            .route("/market/volatility/index", get(|| async { "{\"value\": \"-5\"}" }))
            .route(
                "/market/volatility/stock/{ticker}",
                get(|| async { "{\"volatility\": \"-5\"}" }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn negative_market_index_is_rejected_and_sanitized() {
        let base_url = spawn_negative_index_server().await;
        let c = client(base_url);
        let snapshot = c.fetch_market().await;
        assert!(snapshot.is_fallback);
        assert!(snapshot.sanitized);
        assert_eq!(snapshot.vol_index, DEFAULT_VOL_INDEX);
    }

    #[tokio::test]
    async fn negative_ticker_index_is_rejected_and_sanitized() {
        let base_url = spawn_negative_index_server().await;
        let c = client(base_url);
        let ticker = Ticker::parse("TSLA").unwrap();
        let snapshot = c.fetch_ticker(&ticker).await;
        assert!(snapshot.is_fallback);
        assert!(snapshot.sanitized);
        assert_eq!(snapshot.vol_index, DEFAULT_VOL_INDEX);
    }
}
