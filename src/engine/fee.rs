//! Fee engine (C6): base borrow cost, broker markup, transaction fee, total.

use rust_decimal::Decimal;

use crate::decimal::round_half_up;
use crate::domain::{FeeBreakdown, FeeType};
use crate::error::CalculationError;

/// Computes the locate fee breakdown for a loan period (§4.6).
///
/// `position_value = 0` or `loan_days = 0` yields a zero `borrow_cost` and
/// `markup`, but a `FLAT` transaction fee still applies; a `PERCENTAGE` fee
/// on a zero position is zero. Negative inputs are rejected upstream in C10
/// and never reach this function. `days_in_year` annualizes `annual_rate`
/// (§6's `DAYS_IN_YEAR`, configurable rather than hardcoded).
pub fn compose_fee(
    position_value: Decimal,
    loan_days: i64,
    annual_rate: Decimal,
    markup_pct: Decimal,
    fee_type: FeeType,
    fee_amount: Decimal,
    days_in_year: i64,
) -> Result<(FeeBreakdown, Decimal), CalculationError> {
    let daily_rate = annual_rate / Decimal::from(days_in_year);
    let borrow_cost = round_half_up(position_value * daily_rate * Decimal::from(loan_days), 4);
    let markup = round_half_up(borrow_cost * markup_pct / Decimal::ONE_HUNDRED, 4);
    let transaction_fee = match fee_type {
        FeeType::Flat => round_half_up(fee_amount, 4),
        FeeType::Percentage => round_half_up(position_value * fee_amount / Decimal::ONE_HUNDRED, 4),
    };
    let total_fee = round_half_up(borrow_cost + markup + transaction_fee, 4);

    if borrow_cost.is_sign_negative() || markup.is_sign_negative() || transaction_fee.is_sign_negative() {
        return Err(CalculationError::Negative(format!(
            "borrow_cost={borrow_cost}, markup={markup}, transaction_fee={transaction_fee}"
        )));
    }

    Ok((
        FeeBreakdown {
            borrow_cost,
            markup,
            transaction_fees: transaction_fee,
        },
        total_fee,
    ))
}
