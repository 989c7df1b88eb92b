//! Fixed-precision decimal math kernel (C1).
//!
//! All rate and fee calculations round at precision 4, half-up (0.5 always
//! rounds away from zero, never to even). Division never panics: callers
//! supply a default for the zero-divisor case.

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use tracing::warn;

/// Number of days used for annualization (§4.1). Not calendar-aware.
pub const DAYS_IN_YEAR: i64 = 365;

pub fn add(a: Decimal, b: Decimal) -> Decimal {
    a + b
}

pub fn sub(a: Decimal, b: Decimal) -> Decimal {
    a - b
}

pub fn mul(a: Decimal, b: Decimal) -> Decimal {
    a * b
}

/// Divides `a` by `b`, returning `default` and logging instead of panicking
/// when `b` is zero.
pub fn div(a: Decimal, b: Decimal, default: Decimal) -> Decimal {
    if b.is_zero() {
        warn!(%a, %b, "division by zero, returning caller-supplied default");
        return default;
    }
    a / b
}

/// Rounds `v` to `precision` fractional digits, half-up (away from zero on a
/// tie). `rust_decimal`'s `MidpointAwayFromZero` strategy matches this
/// exactly regardless of sign.
pub fn round_half_up(v: Decimal, precision: u32) -> Decimal {
    v.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns `pct`% of `base`, e.g. `percent_of(100, dec!(5)) == 5`.
pub fn percent_of(base: Decimal, pct: Decimal) -> Decimal {
    base * pct / Decimal::ONE_HUNDRED
}

pub fn clamp(v: Decimal, lo: Decimal, hi: Decimal) -> Decimal {
    v.max(lo).min(hi)
}

pub fn max(a: Decimal, b: Decimal) -> Decimal {
    a.max(b)
}

pub fn min(a: Decimal, b: Decimal) -> Decimal {
    a.min(b)
}

/// Canonical decimal string for fingerprinting (§4.2): strips trailing
/// fractional zeros, `.` separator, no grouping.
pub fn to_canonical_string(v: Decimal) -> String {
    let normalized = v.normalize();
    normalized.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn half_up_rounds_away_from_zero() {
        assert_eq!(round_half_up(dec!(1.00005), 4), dec!(1.0001));
        assert_eq!(round_half_up(dec!(-1.00005), 4), dec!(-1.0001));
        assert_eq!(round_half_up(dec!(1.00004), 4), dec!(1.0000));
    }

    #[test]
    fn div_by_zero_returns_default() {
        assert_eq!(div(dec!(10), dec!(0), dec!(-1)), dec!(-1));
        assert_eq!(div(dec!(10), dec!(2), dec!(-1)), dec!(5));
    }

    #[test]
    fn canonical_string_strips_trailing_zeros() {
        assert_eq!(to_canonical_string(dec!(100.50000)), "100.5");
        assert_eq!(to_canonical_string(dec!(100.00)), "100");
    }

    #[test]
    fn clamp_bounds_value() {
        assert_eq!(clamp(dec!(11), dec!(0), dec!(10)), dec!(10));
        assert_eq!(clamp(dec!(-1), dec!(0), dec!(10)), dec!(0));
        assert_eq!(clamp(dec!(5), dec!(0), dec!(10)), dec!(5));
    }
}
