//! Coupon stacking rules

use rustc_hash::FxHashSet;

use crate::coupons::{Coupon, CouponError};

/// Normalise requested codes, rejecting empty requests and duplicates.
///
/// # Errors
///
/// Returns [`CouponError::NoCodes`] or [`CouponError::DuplicateCode`].
pub fn normalize_codes<S: AsRef<str>>(codes: &[S]) -> Result<Vec<String>, CouponError> {
    let normalized: Vec<String> = codes
        .iter()
        .map(|code| Coupon::normalize_code(code.as_ref()))
        .filter(|code| !code.is_empty())
        .collect();

    if normalized.is_empty() {
        return Err(CouponError::NoCodes);
    }

    let mut seen = FxHashSet::default();

    for code in &normalized {
        if !seen.insert(code.as_str()) {
            return Err(CouponError::DuplicateCode(code.clone()));
        }
    }

    Ok(normalized)
}

/// Check that `coupons` may be combined in a single order.
///
/// At most one coupon may be non-stackable, and the number of coupons may not
/// exceed the smallest `max_stack_per_order` among them.
///
/// # Errors
///
/// Returns [`CouponError::MultipleNonStackable`] or
/// [`CouponError::StackLimitExceeded`].
pub fn check_stacking(coupons: &[Coupon]) -> Result<(), CouponError> {
    let non_stackable = coupons.iter().filter(|coupon| !coupon.stackable).count();

    if non_stackable > 1 {
        return Err(CouponError::MultipleNonStackable);
    }

    let Some(limit) = coupons.iter().map(|coupon| coupon.max_stack_per_order).min() else {
        return Ok(());
    };

    let limit_allows = usize::try_from(limit).map_or(true, |limit| coupons.len() <= limit);

    if !limit_allows {
        return Err(CouponError::StackLimitExceeded {
            requested: coupons.len(),
            limit,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;
    use crate::{coupons::CouponDiscount, fixtures::coupon};

    fn stackable(code: &str, max_stack: u32) -> Coupon {
        let mut coupon = coupon(code, CouponDiscount::FixedAmountOff { amount: 10 });
        coupon.stackable = true;
        coupon.max_stack_per_order = max_stack;
        coupon
    }

    #[test]
    fn single_coupon_always_stacks() {
        let single = coupon("ONE", CouponDiscount::FixedAmountOff { amount: 10 });

        assert_eq!(check_stacking(&[single]), Ok(()));
    }

    #[test]
    fn two_non_stackable_coupons_are_rejected() {
        let first = coupon("A", CouponDiscount::FixedAmountOff { amount: 10 });
        let second = coupon("B", CouponDiscount::FixedAmountOff { amount: 10 });

        assert_eq!(
            check_stacking(&[first, second]),
            Err(CouponError::MultipleNonStackable)
        );
    }

    #[test]
    fn strictest_stack_limit_wins() {
        let non_stackable = coupon("SOLO", CouponDiscount::FixedAmountOff { amount: 10 });
        let limited = stackable("PAIR", 1);

        assert_eq!(
            check_stacking(&[non_stackable, limited]),
            Err(CouponError::StackLimitExceeded {
                requested: 2,
                limit: 1,
            })
        );
    }

    #[test]
    fn stackable_coupons_within_limit_are_allowed() {
        let coupons = [stackable("A", 3), stackable("B", 2)];

        assert_eq!(check_stacking(&coupons), Ok(()));
    }

    #[test]
    fn codes_are_normalized() -> TestResult {
        assert_eq!(normalize_codes(&[" save10", "Extra"])?, vec!["SAVE10", "EXTRA"]);

        Ok(())
    }

    #[test]
    fn duplicate_codes_are_rejected_after_normalizing() {
        assert_eq!(
            normalize_codes(&["save10", "SAVE10 "]),
            Err(CouponError::DuplicateCode("SAVE10".to_string()))
        );
    }

    #[test]
    fn empty_requests_are_rejected() {
        assert_eq!(normalize_codes::<&str>(&[]), Err(CouponError::NoCodes));
        assert_eq!(normalize_codes(&["  "]), Err(CouponError::NoCodes));
    }
}
