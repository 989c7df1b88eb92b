//! Rate adjustment engine (C5): composes base rate → volatility adjustment →
//! event-risk adjustment → minimum-rate floor.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::decimal::round_half_up;

/// Tunables from §6's configuration table, defaulted per-field.
#[derive(Debug, Clone, Copy)]
pub struct RateEngineConfig {
    pub vol_factor: Decimal,
    pub event_factor: Decimal,
    pub min_borrow_rate: Decimal,
}

impl Default for RateEngineConfig {
    fn default() -> Self {
        Self {
            vol_factor: dec!(0.01),
            event_factor: dec!(0.05),
            min_borrow_rate: dec!(0.0001),
        }
    }
}

/// Computes the adjusted rate per §4.5, steps 1-5.
///
/// `vol_index < 0` is treated as 0; `risk_factor` is clamped to `[0, 10]`.
/// The minimum-rate floor is applied last so no intermediate adjustment can
/// mask a sub-minimum rate.
pub fn compose_final_rate(
    base_rate: Decimal,
    vol_index: Decimal,
    risk_factor: u8,
    min_rate: Option<Decimal>,
    config: &RateEngineConfig,
) -> Decimal {
    let vol_index = vol_index.max(Decimal::ZERO);
    let risk_factor = risk_factor.min(10);

    let vol_adj = volatility_adjustment(vol_index, config.vol_factor);
    let r_after_vol = base_rate * (Decimal::ONE + vol_adj);

    let event_adj = (Decimal::from(risk_factor) / dec!(10)) * config.event_factor;
    let r_after_event = r_after_vol * (Decimal::ONE + event_adj);

    let floor = min_rate.unwrap_or(config.min_borrow_rate);
    round_half_up(r_after_event.max(floor), 4)
}

/// Volatility adjustment factor, never negative. Progressive scaling applies
/// above 20 and 30 (§4.5 step 1).
fn volatility_adjustment(vol_index: Decimal, vol_factor: Decimal) -> Decimal {
    let mut adj = vol_index * vol_factor;
    if vol_index >= dec!(20) {
        adj += (vol_index - dec!(20)) * vol_factor * dec!(0.25);
    }
    if vol_index >= dec!(30) {
        adj += (vol_index - dec!(30)) * vol_factor * dec!(0.5);
    }
    adj.max(Decimal::ZERO)
}
