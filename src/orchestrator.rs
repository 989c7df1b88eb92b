//! Request orchestrator (C8): the single place that sequences validation,
//! rate limiting, caching, upstream fan-out, and composition for a
//! `calculate-fee` request (§4.8).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditRecord, AuditSink};
use crate::broker::{BrokerStore, CachedBrokerStore};
use crate::cache::{self, namespace, CacheStore};
use crate::decimal::to_canonical_string;
use crate::domain::{CalculationResult, DataSourceEntry, FeeType, RateSnapshot, Ticker};
use crate::engine::fee::compose_fee;
use crate::engine::rate::{compose_final_rate, RateEngineConfig};
use crate::error::EngineError;
use crate::ratelimit::{RateLimitOutcome, RateLimiter};
use crate::upstream::UpstreamClients;
use crate::validation::{validate_fee_request, RawFeeRequest};

/// Renders a volatility snapshot's audit detail: its tier, plus a
/// sanitization note when a negative upstream value was rejected (§3 S6).
fn volatility_detail(snapshot: &crate::domain::VolatilitySnapshot) -> String {
    if snapshot.sanitized {
        format!(
            "tier={:?}; sanitized: rejected negative upstream volIndex",
            snapshot.tier()
        )
    } else {
        format!("tier={:?}", snapshot.tier())
    }
}

/// Canonical fingerprint for the `calculation` cache namespace (§4.2):
/// `upper(ticker):positionValue:loanDays:markupPct:feeType:feeAmount`, each
/// decimal rendered via its canonical string.
pub fn fingerprint(
    ticker: &Ticker,
    position_value: Decimal,
    loan_days: i64,
    markup_pct: Decimal,
    fee_type: FeeType,
    fee_amount: Decimal,
) -> String {
    let fee_type_str = match fee_type {
        FeeType::Flat => "FLAT",
        FeeType::Percentage => "PERCENTAGE",
    };
    format!(
        "{}:{}:{}:{}:{}:{}",
        ticker.as_str(),
        to_canonical_string(position_value),
        loan_days,
        to_canonical_string(markup_pct),
        fee_type_str,
        to_canonical_string(fee_amount),
    )
}

pub struct Engine<S: BrokerStore> {
    cache: Arc<dyn CacheStore>,
    rate_limiter: RateLimiter,
    broker: CachedBrokerStore<S>,
    upstream: UpstreamClients,
    rate_config: RateEngineConfig,
    audit_sink: Arc<dyn AuditSink>,
    days_in_year: i64,
}

impl<S: BrokerStore> Engine<S> {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        broker: CachedBrokerStore<S>,
        upstream: UpstreamClients,
        rate_config: RateEngineConfig,
        audit_sink: Arc<dyn AuditSink>,
        days_in_year: i64,
    ) -> Self {
        Self {
            rate_limiter: RateLimiter::new(cache.clone()),
            cache,
            broker,
            upstream,
            rate_config,
            audit_sink,
            days_in_year,
        }
    }

    /// Executes the full `calculate-fee` pipeline (§4.8, steps 1-8). Returns
    /// the result alongside the rate-limit outcome so the API layer can set
    /// `X-RateLimit-*` headers on the successful response.
    pub async fn calculate_fee(
        &self,
        raw: RawFeeRequest,
    ) -> Result<(CalculationResult, RateLimitOutcome), EngineError> {
        let request = validate_fee_request(raw)?;

        let limit = self.broker.limit_for(&request.client_id).await;
        let rate_limit = self.rate_limiter.check(&request.client_id, limit).await?;

        let broker_config = self.broker.resolve(&request.client_id).await?;

        let fp = fingerprint(
            &request.ticker,
            request.position_value,
            request.loan_days,
            broker_config.markup_pct,
            broker_config.fee_type,
            broker_config.fee_amount,
        );
        let cache_key = cache::key(namespace::CALCULATION, &fp);
        if let Some(bytes) = self.cache.get(&cache_key).await
            && let Some(result) = cache::decode::<CalculationResult>(&bytes) {
                return Ok((result, rate_limit));
            }

        let (rate_snapshot, volatility_snapshot, event_risk) = tokio::join!(
            self.upstream.borrow.fetch(&request.ticker),
            self.upstream.volatility.fetch_ticker(&request.ticker),
            self.upstream.event_risk.fetch(&request.ticker),
        );

        let final_rate = compose_final_rate(
            rate_snapshot.base_rate,
            volatility_snapshot.vol_index,
            event_risk.risk_factor.min(10),
            None,
            &self.rate_config,
        );

        let (breakdown, total_fee) = compose_fee(
            request.position_value,
            request.loan_days,
            final_rate,
            broker_config.markup_pct,
            broker_config.fee_type,
            broker_config.fee_amount,
            self.days_in_year,
        )?;

        let mut data_sources = std::collections::BTreeMap::new();
        data_sources.insert(
            "borrow_rate".to_string(),
            DataSourceEntry {
                source: rate_snapshot.source.clone(),
                is_fallback: rate_snapshot.is_fallback,
                detail: None,
            },
        );
        data_sources.insert(
            "volatility".to_string(),
            DataSourceEntry {
                source: volatility_snapshot.source.clone(),
                is_fallback: volatility_snapshot.is_fallback,
                detail: Some(volatility_detail(&volatility_snapshot)),
            },
        );
        data_sources.insert(
            "event_risk".to_string(),
            DataSourceEntry {
                source: if event_risk.is_fallback {
                    "fallback".to_string()
                } else {
                    "event_risk".to_string()
                },
                is_fallback: event_risk.is_fallback,
                detail: Some(format!("{:?}", event_risk.level())),
            },
        );

        let result = CalculationResult {
            total_fee,
            breakdown,
            borrow_rate_used: final_rate,
            data_sources: data_sources.clone(),
            fingerprint: fp.clone(),
        };

        if let Some(encoded) = cache::encode(&result) {
            self.cache.set(&cache_key, encoded, Duration::from_secs(60)).await;
        }

        let audit_id = Uuid::new_v4();
        let record = AuditRecord {
            audit_id,
            timestamp: Utc::now(),
            client_id: request.client_id.clone(),
            ticker: request.ticker.clone(),
            position_value: request.position_value,
            loan_days: request.loan_days,
            data_sources,
            breakdown,
            final_rate,
            total_fee,
        };
        self.audit_sink.emit(record).await;
        info!(audit_id = %audit_id, client_id = %request.client_id, ticker = %request.ticker, "calculation complete");

        Ok((result, rate_limit))
    }

    /// Executes the `get-rate` operation (§6): the adjusted borrow rate for
    /// a ticker without a position or fee context.
    pub async fn get_rate(&self, ticker: &Ticker) -> Result<RateSnapshot, EngineError> {
        let (rate_snapshot, volatility_snapshot, event_risk) = tokio::join!(
            self.upstream.borrow.fetch(ticker),
            self.upstream.volatility.fetch_ticker(ticker),
            self.upstream.event_risk.fetch(ticker),
        );

        let final_rate = compose_final_rate(
            rate_snapshot.base_rate,
            volatility_snapshot.vol_index,
            event_risk.risk_factor.min(10),
            None,
            &self.rate_config,
        );

        Ok(RateSnapshot {
            ticker: ticker.clone(),
            base_rate: final_rate,
            status: rate_snapshot.status,
            source: rate_snapshot.source,
            timestamp: rate_snapshot.timestamp,
            is_fallback: rate_snapshot.is_fallback,
        })
    }
}
