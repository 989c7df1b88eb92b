//! Event-calendar risk client (§4.4).

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::cache::{self, namespace, CacheStore};
use crate::domain::{EventRisk, Ticker};
use crate::error::UpstreamError;
use crate::resilience::{CircuitBreaker, RetryConfig};

const SERVICE: &str = "event_risk";

#[derive(Debug, Deserialize)]
struct EventEntry {
    event_id: String,
    #[allow(dead_code)]
    event_type: String,
    risk_factor: u8,
}

#[derive(Debug, Deserialize)]
struct EventCalendarResponse {
    events: Vec<EventEntry>,
}

pub struct EventRiskClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<dyn CacheStore>,
    breaker: CircuitBreaker,
    retry_config: RetryConfig,
}

impl EventRiskClient {
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

    fn fallback(&self, ticker: &Ticker) -> EventRisk {
        EventRisk {
            ticker: ticker.clone(),
            risk_factor: 0,
            source_events: Vec::new(),
            is_fallback: true,
        }
    }

    async fn fetch_live(&self, ticker: &Ticker) -> Result<EventCalendarResponse, UpstreamError> {
        let url = format!("{}/events?ticker={}", self.base_url, ticker.as_str());
        crate::resilience::call_upstream(SERVICE, &self.breaker, &self.retry_config, || {
            let http = self.http.clone();
            let url = url.clone();
            async move {
                let resp = http.get(&url).send().await.map_err(|e| e.to_string())?;
                let body: EventCalendarResponse = resp
                    .error_for_status()
                    .map_err(|e| e.to_string())?
                    .json()
                    .await
                    .map_err(|e| e.to_string())?;
                Ok::<_, String>(body)
            }
        })
        .await
    }

    /// Returns the maximum risk factor over upcoming events for `ticker`,
    /// clamped to `[0, 10]`. Falls back to 0 on upstream failure or when no
    /// events are returned.
    pub async fn fetch(&self, ticker: &Ticker) -> EventRisk {
        let key = cache::key(namespace::EVENT_RISK, ticker.as_str());
        if let Some(bytes) = self.cache.get(&key).await
            && let Some(risk) = cache::decode::<EventRisk>(&bytes) {
                return risk;
            }

        match self.fetch_live(ticker).await {
            Ok(response) => {
                let risk_factor = response
                    .events
                    .iter()
                    .map(|e| e.risk_factor.min(10))
                    .max()
                    .unwrap_or(0);
                let source_events = response.events.into_iter().map(|e| e.event_id).collect();
                let risk = EventRisk {
                    ticker: ticker.clone(),
                    risk_factor,
                    source_events,
                    is_fallback: false,
                };
                if let Some(encoded) = cache::encode(&risk) {
                    self.cache.set(&key, encoded, Duration::from_secs(3600)).await;
                }
                risk
            }
            Err(err) => {
                warn!(ticker = %ticker, %err, "event risk upstream exhausted, using zero");
                self.fallback(ticker)
            }
        }
    }
}
