//! Borrow-rate feed client (§4.4).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::cache::{self, namespace, CacheStore};
use crate::domain::{BorrowStatus, RateSnapshot, Ticker};
use crate::error::UpstreamError;
use crate::resilience::{CircuitBreaker, RetryConfig};

const SERVICE: &str = "borrow_rate";

#[derive(Debug, Deserialize)]
struct BorrowRateResponse {
    rate: Decimal,
    status: String,
}

pub struct BorrowRateClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<dyn CacheStore>,
    breaker: CircuitBreaker,
    retry_config: RetryConfig,
    min_borrow_rate: Decimal,
}

impl BorrowRateClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        cache: Arc<dyn CacheStore>,
        breaker: CircuitBreaker,
        retry_config: RetryConfig,
        min_borrow_rate: Decimal,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            cache,
            breaker,
            retry_config,
            min_borrow_rate,
        }
    }

    fn last_known_status_key(ticker: &Ticker) -> String {
        cache::key(namespace::MIN_RATE, ticker.as_str())
    }

    /// Falls back to the status-keyed default rate (§C's borrow-status
    /// default-rate table) when a prior live observation left a known
    /// status on record; otherwise falls back to the flat floor with status
    /// `Hard`. Either way, `min_borrow_rate` remains the absolute floor.
    async fn fallback(&self, ticker: &Ticker) -> RateSnapshot {
        let known_status = self
            .cache
            .get(&Self::last_known_status_key(ticker))
            .await
            .and_then(|bytes| cache::decode::<BorrowStatus>(&bytes));

        let (status, rate) = match known_status {
            Some(status) => (status, status.default_rate().max(self.min_borrow_rate)),
            None => (BorrowStatus::Hard, self.min_borrow_rate),
        };

        RateSnapshot {
            ticker: ticker.clone(),
            base_rate: rate,
            status,
            source: "fallback".to_string(),
            timestamp: Utc::now(),
            is_fallback: true,
        }
    }

    async fn fetch_live(&self, ticker: &Ticker) -> Result<RateSnapshot, UpstreamError> {
        let url = format!("{}/api/borrows/{}", self.base_url, ticker.as_str());
        let ticker = ticker.clone();
        let result = crate::resilience::call_upstream(
            SERVICE,
            &self.breaker,
            &self.retry_config,
            || {
                let http = self.http.clone();
                let url = url.clone();
                async move {
                    let resp = http.get(&url).send().await.map_err(|e| e.to_string())?;
                    let body: BorrowRateResponse =
                        resp.error_for_status()
                            .map_err(|e| e.to_string())?
                            .json()
                            .await
                            .map_err(|e| e.to_string())?;
                    Ok::<_, String>(body)
                }
            },
        )
        .await?;

        Ok(RateSnapshot {
            ticker,
            base_rate: result.rate,
            status: BorrowStatus::from_upstream(&result.status),
            source: SERVICE.to_string(),
            timestamp: Utc::now(),
            is_fallback: false,
        })
    }

    /// Returns the current snapshot for `ticker`, consulting the cache
    /// before the live feed and falling back on upstream exhaustion.
    pub async fn fetch(&self, ticker: &Ticker) -> RateSnapshot {
        let key = cache::key(namespace::BORROW_RATE, ticker.as_str());
        if let Some(bytes) = self.cache.get(&key).await
            && let Some(snapshot) = cache::decode::<RateSnapshot>(&bytes) {
                return snapshot;
            }

        match self.fetch_live(ticker).await {
            Ok(snapshot) => {
                if let Some(encoded) = cache::encode(&snapshot) {
                    self.cache
                        .set(&key, encoded, Duration::from_secs(300))
                        .await;
                }
                if let Some(encoded) = cache::encode(&snapshot.status) {
                    self.cache
                        .set(&Self::last_known_status_key(ticker), encoded, Duration::from_secs(86400))
                        .await;
                }
                snapshot
            }
            Err(err) => {
                warn!(ticker = %ticker, %err, "borrow rate upstream exhausted, using fallback");
                self.fallback(ticker).await
            }
        }
    }
}
