//! Pricing utilities
//!
//! Money is carried as unsigned minor units. Fractional minor units produced by
//! percentages and ratios are rounded half away from zero.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

/// Errors raised by minor-unit arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PricingError {
    /// An amount left the representable range.
    #[error("amount overflowed")]
    Overflow,

    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,
}

/// `price * quantity` in minor units.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] when the product does not fit in a `u64`.
pub fn line_total(price: u64, quantity: u64) -> Result<u64, PricingError> {
    price.checked_mul(quantity).ok_or(PricingError::Overflow)
}

/// Calculate the amount in minor units for a [`Percentage`] of `minor`.
///
/// # Errors
///
/// Returns [`PricingError::PercentConversion`] if the calculation overflows or
/// produces a negative amount.
pub fn percent_of_minor(percent: &Percentage, minor: u64) -> Result<u64, PricingError> {
    let minor = Decimal::from_u64(minor).ok_or(PricingError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage does not expose the inner Decimal
        .checked_mul(minor)
        .ok_or(PricingError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(PricingError::PercentConversion)
}

/// Calculate `percentage`% (a whole number, e.g. `10` for ten percent) of `minor`.
///
/// # Errors
///
/// Returns [`PricingError::PercentConversion`] if the calculation overflows.
pub fn whole_percent_of_minor(percentage: u16, minor: u64) -> Result<u64, PricingError> {
    rate_of_minor(Decimal::from(percentage) / Decimal::ONE_HUNDRED, minor)
}

/// Calculate `rate * minor` where `rate` is a fraction (`0.1` is ten percent).
///
/// # Errors
///
/// Returns [`PricingError::PercentConversion`] if the calculation overflows or
/// the rate is negative.
pub fn rate_of_minor(rate: Decimal, minor: u64) -> Result<u64, PricingError> {
    Decimal::from(minor)
        .checked_mul(rate)
        .ok_or(PricingError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(PricingError::PercentConversion)
}

/// Scale `amount` by `part / whole`, rounding to the nearest minor unit.
///
/// Used to pro-rate a line's subtotal when only some of its units are returned.
///
/// # Errors
///
/// Returns [`PricingError::PercentConversion`] if `whole` is zero or the result
/// does not fit.
pub fn pro_rata(amount: u64, part: u64, whole: u64) -> Result<u64, PricingError> {
    Decimal::from(amount)
        .checked_mul(Decimal::from(part))
        .and_then(|scaled| scaled.checked_div(Decimal::from(whole)))
        .ok_or(PricingError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(PricingError::PercentConversion)
}

/// Split `amount` across `weights` proportionally using the largest remainder
/// method, so the shares always sum to exactly `amount`.
///
/// When `amount` does not exceed the sum of weights no share exceeds its own
/// weight. Ties on the remainder go to the earlier position.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if a share does not fit in a `u64`.
pub fn allocate(amount: u64, weights: &[u64]) -> Result<Vec<u64>, PricingError> {
    let total: u128 = weights.iter().copied().map(u128::from).sum();

    if total == 0 || amount == 0 {
        return Ok(vec![0; weights.len()]);
    }

    let amount = u128::from(amount);

    let mut shares: Vec<u128> = Vec::with_capacity(weights.len());
    let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(weights.len());

    for (index, weight) in weights.iter().copied().enumerate() {
        let exact = amount * u128::from(weight);

        shares.push(exact / total);
        remainders.push((index, exact % total));
    }

    let allocated: u128 = shares.iter().sum();
    let mut leftover = amount.saturating_sub(allocated);

    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    for (index, _) in remainders {
        if leftover == 0 {
            break;
        }

        if let Some(share) = shares.get_mut(index) {
            *share += 1;
            leftover -= 1;
        }
    }

    shares
        .into_iter()
        .map(|share| u64::try_from(share).map_err(|_overflow| PricingError::Overflow))
        .collect()
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn percent_of_minor_calculates_correctly() -> TestResult {
        let percent = Percentage::from(0.25);

        assert_eq!(percent_of_minor(&percent, 200)?, 50);

        Ok(())
    }

    #[test]
    fn percent_of_minor_rounds_half_away_from_zero() -> TestResult {
        let percent = Percentage::from(0.05);

        // 5% of 10 = 0.5
        assert_eq!(percent_of_minor(&percent, 10)?, 1);

        Ok(())
    }

    #[test]
    fn percent_of_minor_overflow_returns_error() {
        let percent = Percentage::from(2.0);

        assert_eq!(
            percent_of_minor(&percent, u64::MAX),
            Err(PricingError::PercentConversion)
        );
    }

    #[test]
    fn whole_percent_of_minor_matches_decimal_math() -> TestResult {
        assert_eq!(whole_percent_of_minor(10, 20_000)?, 2_000);
        assert_eq!(whole_percent_of_minor(15, 999)?, 150);
        assert_eq!(whole_percent_of_minor(0, 999)?, 0);
        assert_eq!(whole_percent_of_minor(100, 999)?, 999);

        Ok(())
    }

    #[test]
    fn rate_of_minor_rejects_negative_rates() {
        assert_eq!(
            rate_of_minor(Decimal::NEGATIVE_ONE, 10),
            Err(PricingError::PercentConversion)
        );
    }

    #[test]
    fn pro_rata_splits_a_subtotal() -> TestResult {
        assert_eq!(pro_rata(300, 1, 3)?, 100);
        assert_eq!(pro_rata(100, 1, 3)?, 33);
        assert_eq!(pro_rata(100, 2, 3)?, 67);

        Ok(())
    }

    #[test]
    fn pro_rata_by_zero_is_an_error() {
        assert_eq!(pro_rata(100, 1, 0), Err(PricingError::PercentConversion));
    }

    #[test]
    fn line_total_detects_overflow() {
        assert_eq!(line_total(u64::MAX, 2), Err(PricingError::Overflow));
    }

    #[test]
    fn allocate_distributes_remainders_to_largest_fractions() -> TestResult {
        let shares = allocate(100, &[1, 1, 1])?;

        assert_eq!(shares, vec![34, 33, 33]);

        Ok(())
    }

    #[test]
    fn allocate_is_proportional() -> TestResult {
        let shares = allocate(30, &[100, 200])?;

        assert_eq!(shares, vec![10, 20]);

        Ok(())
    }

    #[test]
    fn allocate_never_exceeds_weights() -> TestResult {
        let weights = [7, 1, 2];
        let shares = allocate(10, &weights)?;

        assert_eq!(shares.iter().sum::<u64>(), 10);

        for (share, weight) in shares.iter().zip(weights) {
            assert!(*share <= weight, "share {share} exceeds weight {weight}");
        }

        Ok(())
    }

    #[test]
    fn allocate_with_no_weight_yields_zeroes() -> TestResult {
        assert_eq!(allocate(50, &[0, 0])?, vec![0, 0]);
        assert_eq!(allocate(50, &[])?, Vec::<u64>::new());

        Ok(())
    }
}
