//! Wire types for the HTTP surface (§6). Kept separate from the domain model
//! so the transport contract can evolve independently of internal types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CalculationResult, RateSnapshot};

#[derive(Debug, Deserialize)]
pub struct CalculateFeeRequest {
    pub ticker: String,
    #[serde(rename = "positionValue")]
    pub position_value: Decimal,
    #[serde(rename = "loanDays")]
    pub loan_days: i64,
    #[serde(rename = "clientId")]
    pub client_id: String,
}

#[derive(Debug, Serialize)]
pub struct FeeBreakdownDto {
    #[serde(rename = "borrowCost")]
    pub borrow_cost: Decimal,
    pub markup: Decimal,
    #[serde(rename = "transactionFees")]
    pub transaction_fees: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CalculateFeeResponse {
    #[serde(rename = "totalFee")]
    pub total_fee: Decimal,
    pub breakdown: FeeBreakdownDto,
    #[serde(rename = "borrowRateUsed")]
    pub borrow_rate_used: Decimal,
}

impl From<CalculationResult> for CalculateFeeResponse {
    fn from(result: CalculationResult) -> Self {
        Self {
            total_fee: result.total_fee,
            breakdown: FeeBreakdownDto {
                borrow_cost: result.breakdown.borrow_cost,
                markup: result.breakdown.markup,
                transaction_fees: result.breakdown.transaction_fees,
            },
            borrow_rate_used: result.borrow_rate_used,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetRateResponse {
    pub ticker: String,
    #[serde(rename = "currentRate")]
    pub current_rate: Decimal,
    pub status: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl From<RateSnapshot> for GetRateResponse {
    fn from(snapshot: RateSnapshot) -> Self {
        Self {
            ticker: snapshot.ticker.to_string(),
            current_rate: snapshot.base_rate,
            status: format!("{:?}", snapshot.status).to_uppercase(),
            last_updated: snapshot.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub components: HealthComponents,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub cache: &'static str,
    pub upstreams: std::collections::BTreeMap<&'static str, &'static str>,
}
