//! Audit record emitter (C9).
//!
//! Emission is fire-and-forget from the orchestrator's perspective: a sink
//! failure is logged but never fails the response (§4.9). Durable storage is
//! an external concern; see DESIGN.md for the at-least-once decision.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{ClientId, DataSourceEntry, FeeBreakdown, Ticker};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub client_id: ClientId,
    pub ticker: Ticker,
    pub position_value: Decimal,
    pub loan_days: i64,
    pub data_sources: std::collections::BTreeMap<String, DataSourceEntry>,
    pub breakdown: FeeBreakdown,
    pub final_rate: Decimal,
    pub total_fee: Decimal,
}

/// A pluggable destination for audit records. Implementations must not
/// block the caller on durability; at-least-once delivery is the only
/// guarantee the orchestrator relies on.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn emit(&self, record: AuditRecord);
}

/// Default sink: logs the record as a structured `tracing` event. Suitable
/// for deployments that ship logs to a durable store downstream.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn emit(&self, record: AuditRecord) {
        info!(
            audit_id = %record.audit_id,
            client_id = %record.client_id,
            ticker = %record.ticker,
            total_fee = %record.total_fee,
            final_rate = %record.final_rate,
            "audit record emitted"
        );
    }
}

/// In-memory sink for tests: records are retained in arrival order.
#[derive(Default)]
pub struct VecAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl VecAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .expect("audit sink mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl AuditSink for VecAuditSink {
    async fn emit(&self, record: AuditRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(_) => error!("audit sink mutex poisoned, dropping record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> AuditRecord {
        use rust_decimal_macros::dec;
        AuditRecord {
            audit_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            client_id: ClientId::parse("client-1").unwrap(),
            ticker: Ticker::parse("AAPL").unwrap(),
            position_value: dec!(100000),
            loan_days: 10,
            data_sources: Default::default(),
            breakdown: FeeBreakdown {
                borrow_cost: dec!(1),
                markup: dec!(0.05),
                transaction_fees: dec!(25),
            },
            final_rate: dec!(0.05),
            total_fee: dec!(26.05),
        }
    }

    #[tokio::test]
    async fn vec_sink_retains_emitted_records() {
        let sink = VecAuditSink::new();
        sink.emit(sample_record()).await;
        sink.emit(sample_record()).await;
        assert_eq!(sink.records().len(), 2);
    }

    #[tokio::test]
    async fn tracing_sink_does_not_panic() {
        let sink = TracingAuditSink;
        sink.emit(sample_record()).await;
    }
}
