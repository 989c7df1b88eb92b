//! Schema / validation (C10).
//!
//! Validates raw request fields into domain types, collecting every failing
//! field rather than failing fast on the first one (§4.10).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{ClientId, Ticker};
use crate::error::{FieldFailure, ValidationError};

pub const MIN_POSITION_VALUE: Decimal = dec!(0.01);
pub const MAX_POSITION_VALUE: Decimal = dec!(1000000000);
pub const MIN_LOAN_DAYS: i64 = 1;
pub const MAX_LOAN_DAYS: i64 = 365;

/// Raw, unvalidated inputs for a `calculate-fee` request.
#[derive(Debug, Clone)]
pub struct RawFeeRequest {
    pub ticker: String,
    pub position_value: Decimal,
    pub loan_days: i64,
    pub client_id: String,
}

/// Validated inputs, ready for the orchestrator.
#[derive(Debug, Clone)]
pub struct ValidFeeRequest {
    pub ticker: Ticker,
    pub position_value: Decimal,
    pub loan_days: i64,
    pub client_id: ClientId,
}

/// Validates all fields of a `calculate-fee` request, returning every
/// failing field rather than stopping at the first one.
pub fn validate_fee_request(raw: RawFeeRequest) -> Result<ValidFeeRequest, ValidationError> {
    let mut failures = Vec::new();

    let ticker = Ticker::parse(&raw.ticker)
        .inspect_err(|e| failures.push(FieldFailure {
            field: "ticker".to_string(),
            location: "body",
            message: e.to_string(),
        }))
        .ok();

    if raw.position_value < MIN_POSITION_VALUE || raw.position_value > MAX_POSITION_VALUE {
        failures.push(FieldFailure {
            field: "positionValue".to_string(),
            location: "body",
            message: format!(
                "must be in [{MIN_POSITION_VALUE}, {MAX_POSITION_VALUE}], got {}",
                raw.position_value
            ),
        });
    }

    if raw.loan_days < MIN_LOAN_DAYS || raw.loan_days > MAX_LOAN_DAYS {
        failures.push(FieldFailure {
            field: "loanDays".to_string(),
            location: "body",
            message: format!(
                "must be in [{MIN_LOAN_DAYS}, {MAX_LOAN_DAYS}], got {}",
                raw.loan_days
            ),
        });
    }

    let client_id = ClientId::parse(&raw.client_id)
        .inspect_err(|e| failures.push(FieldFailure {
            field: "clientId".to_string(),
            location: "body",
            message: e.to_string(),
        }))
        .ok();

    if !failures.is_empty() {
        return Err(ValidationError::MultipleFailures(failures));
    }

    Ok(ValidFeeRequest {
        ticker: ticker.expect("validated above"),
        position_value: raw.position_value,
        loan_days: raw.loan_days,
        client_id: client_id.expect("validated above"),
    })
}
