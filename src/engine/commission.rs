//! Commission arithmetic.

use crate::domain::Money;

/// Compute the commission for an order total at a percent rate.
///
/// Pure function: `orderTotal × (rate / 100)`, rounded to cents with
/// midpoint away from zero. Rates are supplied by the caller; nothing is
/// looked up here.
pub fn commission(order_total: Money, rate_percent: Money) -> Money {
    (order_total * rate_percent / Money::hundred()).round_cents()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn test_commission_rounds_to_cents() {
        // 133.33 at 10% = 13.333 -> 13.33
        assert_eq!(commission(money("133.33"), money("10")), money("13.33"));
    }

    #[test]
    fn test_commission_midpoint_rounds_up() {
        // 133.35 at 10% = 13.335 -> 13.34
        assert_eq!(commission(money("133.35"), money("10")), money("13.34"));
    }

    #[test]
    fn test_zero_total_zero_commission() {
        assert_eq!(commission(money("0"), money("10")), Money::zero());
    }

    #[test]
    fn test_zero_rate() {
        assert_eq!(commission(money("250"), money("0")), Money::zero());
    }

    #[test]
    fn test_fractional_rate() {
        // 200 at 12.5% = 25
        assert_eq!(commission(money("200"), money("12.5")), money("25"));
    }
}
