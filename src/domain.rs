//! Core entities of the pricing engine (§3).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::impl_from_primitive;

/// A validated 1-5 uppercase-letter stock symbol. Construction always
/// uppercases the input; `parse` rejects anything outside `[A-Z]{1,5}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticker(String);
impl_from_primitive!(Ticker, String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let upper = raw.to_uppercase();
        let valid = (1..=5).contains(&upper.len()) && upper.chars().all(|c| c.is_ascii_uppercase());
        if !valid {
            return Err(ValidationError::InvalidTicker(raw.to_string()));
        }
        Ok(Ticker(upper))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated client identifier: 3-50 chars of `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(String);
impl_from_primitive!(ClientId, String);

impl ClientId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let valid = (3..=50).contains(&raw.len())
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ValidationError::InvalidClientId(raw.to_string()));
        }
        Ok(ClientId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ease-of-borrow tier reported by the upstream borrow-rate feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorrowStatus {
    Easy,
    Medium,
    Hard,
}

impl BorrowStatus {
    /// Maps the upstream status string, case-insensitively. Accepts both the
    /// short (`EASY`) and long (`EASY_TO_BORROW`) spellings. Any unrecognized
    /// value maps to `Hard`, the conservative choice (§4.4).
    pub fn from_upstream(raw: &str) -> Self {
        match raw.to_uppercase().as_str() {
            "EASY" | "EASY_TO_BORROW" => BorrowStatus::Easy,
            "MEDIUM" | "MEDIUM_TO_BORROW" => BorrowStatus::Medium,
            "HARD" | "HARD_TO_BORROW" => BorrowStatus::Hard,
            _ => BorrowStatus::Hard,
        }
    }

    /// Default rate for this status when a live rate is known to be
    /// unavailable but the status itself is known (supplemented from
    /// `original_source`'s `get_borrow_rate_by_status`).
    pub fn default_rate(self) -> Decimal {
        use rust_decimal_macros::dec;
        match self {
            BorrowStatus::Easy => dec!(0.005),
            BorrowStatus::Medium => dec!(0.02),
            BorrowStatus::Hard => dec!(0.05),
        }
    }
}

/// Fee structure applied to a client's locate fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeType {
    Flat,
    Percentage,
}

/// Broker-specific fee configuration for a client (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub client_id: ClientId,
    pub markup_pct: Decimal,
    pub fee_type: FeeType,
    pub fee_amount: Decimal,
    pub active: bool,
}

/// One observation of the upstream borrow-rate feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub ticker: Ticker,
    pub base_rate: Decimal,
    pub status: BorrowStatus,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub is_fallback: bool,
}

/// Volatility tiers recovered from `original_source`'s
/// `get_volatility_tier`, informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityTier {
    Low,
    Normal,
    High,
    Extreme,
}

/// One observation of the volatility feed, market-wide if `ticker` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySnapshot {
    pub ticker: Option<Ticker>,
    pub vol_index: Decimal,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub is_fallback: bool,
    /// Set when the upstream value was rejected and replaced rather than
    /// merely unavailable, e.g. a negative `volIndex` (§3 S6).
    pub sanitized: bool,
}

impl VolatilitySnapshot {
    pub fn tier(&self) -> VolatilityTier {
        use rust_decimal_macros::dec;
        if self.vol_index < dec!(20) {
            VolatilityTier::Low
        } else if self.vol_index < dec!(30) {
            VolatilityTier::Normal
        } else if self.vol_index < dec!(40) {
            VolatilityTier::High
        } else {
            VolatilityTier::Extreme
        }
    }
}

/// Event-risk level classification recovered from
/// `original_source`'s `format_event_risk_adjustment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventRiskLevel {
    Low,
    Medium,
    High,
}

/// Maximum risk over all upcoming events inside the look-ahead window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRisk {
    pub ticker: Ticker,
    pub risk_factor: u8,
    pub source_events: Vec<String>,
    pub is_fallback: bool,
}

impl EventRisk {
    pub fn level(&self) -> EventRiskLevel {
        match self.risk_factor {
            0..=3 => EventRiskLevel::Low,
            4..=6 => EventRiskLevel::Medium,
            _ => EventRiskLevel::High,
        }
    }
}

/// `(borrowCost, markup, transactionFees)` with the invariant that the three
/// sum to the calculation's total fee within one rounding ulp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub borrow_cost: Decimal,
    pub markup: Decimal,
    pub transaction_fees: Decimal,
}

/// Which upstream provided a piece of data, and whether it was a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceEntry {
    pub source: String,
    pub is_fallback: bool,
    /// Supplementary classification for the audit trail: the volatility
    /// tier, the event-risk level, or a sanitization note, depending on
    /// which feed this entry describes. `None` where no such detail applies.
    pub detail: Option<String>,
}

/// The output of a `calculate-fee` request (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub total_fee: Decimal,
    pub breakdown: FeeBreakdown,
    pub borrow_rate_used: Decimal,
    pub data_sources: std::collections::BTreeMap<String, DataSourceEntry>,
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_uppercases_and_validates() {
        assert_eq!(Ticker::parse("aapl").unwrap().as_str(), "AAPL");
        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("TOOLONG").is_err());
        assert!(Ticker::parse("AA1").is_err());
    }

    #[test]
    fn client_id_validates_length_and_charset() {
        assert!(ClientId::parse("ab").is_err());
        assert!(ClientId::parse("client_A-1").is_ok());
        assert!(ClientId::parse("bad id!").is_err());
    }

    #[test]
    fn borrow_status_maps_unknown_to_hard() {
        assert_eq!(BorrowStatus::from_upstream("easy_to_borrow"), BorrowStatus::Easy);
        assert_eq!(BorrowStatus::from_upstream("weird"), BorrowStatus::Hard);
    }

    #[test]
    fn event_risk_level_buckets() {
        let risk = |f| EventRisk {
            ticker: Ticker::parse("AAPL").unwrap(),
            risk_factor: f,
            source_events: vec![],
            is_fallback: false,
        };
        assert_eq!(risk(2).level(), EventRiskLevel::Low);
        assert_eq!(risk(5).level(), EventRiskLevel::Medium);
        assert_eq!(risk(9).level(), EventRiskLevel::High);
    }
}
