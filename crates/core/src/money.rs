//! Money helpers.
//!
//! Amounts are exact decimals. Every division in the workspace goes through
//! [`ratio`] so that a zero denominator yields zero instead of panicking.

use rust_decimal::{Decimal, RoundingStrategy};

/// Monetary amount (signed, currency-less).
pub type Amount = Decimal;

/// Round to two decimal places, midpoint away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator`, or zero when the denominator is zero.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// `part / whole * 100`, rounded to two places; zero when `whole` is zero.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    round2(ratio(part, whole) * Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn ratio_by_zero_is_zero() {
        assert_eq!(ratio(d("10"), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn percent_rounds_to_two_places() {
        assert_eq!(percent_of(d("1"), d("3")), d("33.33"));
        assert_eq!(percent_of(d("2"), d("3")), d("66.67"));
        assert_eq!(percent_of(d("150"), d("100")), d("150"));
    }

    #[test]
    fn round2_midpoint_goes_away_from_zero() {
        assert_eq!(round2(d("1.005")), d("1.01"));
        assert_eq!(round2(d("-1.005")), d("-1.01"));
    }

    #[test]
    fn decimal_sums_are_exact() {
        assert_eq!(d("25.50") + d("89.45"), d("114.95"));
    }
}
