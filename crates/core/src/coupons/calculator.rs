//! Coupon discount calculator
//!
//! Computes discounts from coupons and priced lines without touching any state,
//! so the same inputs always produce the same outcome.

use jiff::Timestamp;
use smallvec::SmallVec;

use crate::{
    catalog::{PricedLine, ProductUuid},
    coupons::{
        Coupon, CouponDiscount, CouponError, CouponScope, CouponUuid,
        eligibility::check_eligibility, stacking::check_stacking,
    },
    ids::UserUuid,
    pricing::{PricingError, allocate, whole_percent_of_minor},
};

/// Discount granted to one line by one coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemDiscount {
    /// Position of the line in the request.
    pub line: usize,

    /// Product on that line.
    pub product: ProductUuid,

    /// Discount in minor units.
    pub discount: u64,
}

/// The result of applying one coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponApplication {
    /// Coupon applied.
    pub coupon: CouponUuid,

    /// Coupon code.
    pub code: String,

    /// Total discount from this coupon.
    pub discount: u64,

    /// Sum of the qualifying lines' values.
    pub applicable_value: u64,

    /// Per-line discounts, qualifying lines only.
    pub breakdown: SmallVec<[ItemDiscount; 4]>,
}

impl CouponApplication {
    /// Products that actually received a discount.
    pub fn applicable_items(&self) -> impl Iterator<Item = ProductUuid> + '_ {
        self.breakdown
            .iter()
            .filter(|item| item.discount > 0)
            .map(|item| item.product)
    }

    /// Qualifying value after this coupon's discount.
    pub fn final_total(&self) -> u64 {
        self.applicable_value.saturating_sub(self.discount)
    }
}

/// Combined effect of every coupon on a set of lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscountOutcome {
    /// One entry per applied coupon, in request order.
    pub applications: Vec<CouponApplication>,

    /// Combined discount per line, capped at each line's own value.
    pub line_discounts: Vec<u64>,

    /// Sum of `line_discounts`.
    pub total_discount: u64,
}

impl DiscountOutcome {
    /// An outcome with no discount for `lines` lines.
    pub fn none(lines: usize) -> Self {
        Self {
            applications: Vec::new(),
            line_discounts: vec![0; lines],
            total_discount: 0,
        }
    }

    /// Combined discount for the line at `index`.
    pub fn line_discount(&self, index: usize) -> u64 {
        self.line_discounts.get(index).copied().unwrap_or_default()
    }

    /// Codes of the coupons that discounted the line at `index`.
    pub fn codes_for_line(&self, index: usize) -> Vec<String> {
        self.applications
            .iter()
            .filter(|application| {
                application
                    .breakdown
                    .iter()
                    .any(|item| item.line == index && item.discount > 0)
            })
            .map(|application| application.code.clone())
            .collect()
    }
}

/// Evaluate a single coupon against `lines`, ignoring usage limits.
///
/// # Errors
///
/// Returns [`CouponError::NotApplicable`] when nothing qualifies or the
/// discount is zero, and [`CouponError::MinimumNotMet`] when the qualifying
/// value is below the coupon minimum.
pub fn evaluate(coupon: &Coupon, lines: &[PricedLine]) -> Result<CouponApplication, CouponError> {
    let mut qualifying: SmallVec<[(usize, ProductUuid, u64); 4]> = SmallVec::new();

    for (index, line) in lines.iter().enumerate() {
        if coupon.qualifies(line) {
            qualifying.push((index, line.product, line.line_total()?));
        }
    }

    let applicable_value = qualifying
        .iter()
        .try_fold(0_u64, |sum, (_, _, value)| sum.checked_add(*value))
        .ok_or(PricingError::Overflow)?;

    if qualifying.is_empty() {
        return Err(CouponError::NotApplicable(coupon.code.clone()));
    }

    if applicable_value < coupon.min_cart_value {
        return Err(CouponError::MinimumNotMet {
            code: coupon.code.clone(),
            required: coupon.min_cart_value,
            actual: applicable_value,
        });
    }

    let values: SmallVec<[u64; 4]> = qualifying.iter().map(|(_, _, value)| *value).collect();

    let discounts = match coupon.scope {
        CouponScope::Order => {
            let amount = discount_for(coupon, applicable_value)?;

            allocate(amount, &values)?
        }
        CouponScope::Items => {
            let mut remaining_cap = coupon.max_discount;

            values
                .iter()
                .map(|value| -> Result<u64, PricingError> {
                    let mut amount = match coupon.discount {
                        CouponDiscount::PercentageOff { percentage } => {
                            whole_percent_of_minor(percentage, *value)?
                        }
                        CouponDiscount::FixedAmountOff { amount } => amount.min(*value),
                    };

                    if let Some(cap) = remaining_cap.as_mut() {
                        amount = amount.min(*cap);
                        *cap -= amount;
                    }

                    Ok(amount)
                })
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let breakdown: SmallVec<[ItemDiscount; 4]> = qualifying
        .iter()
        .zip(discounts)
        .map(|((line, product, _), discount)| ItemDiscount {
            line: *line,
            product: *product,
            discount,
        })
        .collect();

    let discount: u64 = breakdown.iter().map(|item| item.discount).sum();

    if discount == 0 {
        return Err(CouponError::NotApplicable(coupon.code.clone()));
    }

    Ok(CouponApplication {
        coupon: coupon.uuid,
        code: coupon.code.clone(),
        discount,
        applicable_value,
        breakdown,
    })
}

fn discount_for(coupon: &Coupon, base: u64) -> Result<u64, PricingError> {
    match coupon.discount {
        CouponDiscount::PercentageOff { percentage } => {
            let amount = whole_percent_of_minor(percentage, base)?;

            Ok(coupon
                .max_discount
                .map_or(amount, |cap| amount.min(cap))
                .min(base))
        }
        CouponDiscount::FixedAmountOff { amount } => Ok(amount.min(base)),
    }
}

/// Validate and apply `coupons` to `lines` on behalf of `user`.
///
/// Stacking rules are checked across the set, then each coupon's eligibility and
/// discount. Each line's combined discount is capped at its own value, so
/// `total_discount` can be lower than the sum of the individual applications.
///
/// # Errors
///
/// Returns the first [`CouponError`] encountered.
pub fn calculate(
    coupons: &[Coupon],
    lines: &[PricedLine],
    user: UserUuid,
    now: Timestamp,
) -> Result<DiscountOutcome, CouponError> {
    if coupons.is_empty() {
        return Ok(DiscountOutcome::none(lines.len()));
    }

    check_stacking(coupons)?;

    let mut outcome = DiscountOutcome::none(lines.len());

    for coupon in coupons {
        check_eligibility(coupon, user, now)?;

        let application = evaluate(coupon, lines)?;

        for item in &application.breakdown {
            if let Some(discount) = outcome.line_discounts.get_mut(item.line) {
                *discount = discount.saturating_add(item.discount);
            }
        }

        outcome.applications.push(application);
    }

    for (discount, line) in outcome.line_discounts.iter_mut().zip(lines) {
        *discount = (*discount).min(line.line_total()?);
    }

    outcome.total_discount = outcome
        .line_discounts
        .iter()
        .try_fold(0_u64, |sum, discount| sum.checked_add(*discount))
        .ok_or(PricingError::Overflow)?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use super::*;
    use crate::{
        fixtures::{coupon, line},
        ids::SellerUuid,
    };

    #[test]
    fn order_scope_percentage_discounts_the_whole_cart() -> TestResult {
        let lines = [line(100, 2)];
        let coupon = coupon("TEN", CouponDiscount::PercentageOff { percentage: 10 });

        let outcome = calculate(&[coupon], &lines, UserUuid::new(), Timestamp::now())?;

        assert_eq!(outcome.total_discount, 20);
        assert_eq!(outcome.line_discounts, vec![20]);

        Ok(())
    }

    #[test]
    fn percentage_is_capped_by_max_discount() -> TestResult {
        let lines = [line(10_000, 2)];
        let mut coupon = coupon("TWENTY", CouponDiscount::PercentageOff { percentage: 20 });
        coupon.max_discount = Some(3_000);

        let application = evaluate(&coupon, &lines)?;

        assert_eq!(application.discount, 3_000);
        assert_eq!(application.final_total(), 17_000);

        Ok(())
    }

    #[test]
    fn fixed_order_discount_never_exceeds_qualifying_value() -> TestResult {
        let lines = [line(30, 1)];
        let coupon = coupon("FIFTY", CouponDiscount::FixedAmountOff { amount: 50 });

        let application = evaluate(&coupon, &lines)?;

        assert_eq!(application.discount, 30);

        Ok(())
    }

    #[test]
    fn order_scope_discount_is_spread_over_qualifying_lines() -> TestResult {
        let lines = [line(100, 1), line(200, 1)];
        let coupon = coupon("FLAT", CouponDiscount::FixedAmountOff { amount: 30 });

        let outcome = calculate(&[coupon], &lines, UserUuid::new(), Timestamp::now())?;

        assert_eq!(outcome.line_discounts, vec![10, 20]);
        assert_eq!(outcome.total_discount, 30);

        Ok(())
    }

    #[test]
    fn item_scope_fixed_discount_applies_per_line() -> TestResult {
        let lines = [line(100, 1), line(5, 1)];
        let mut coupon = coupon("EACH", CouponDiscount::FixedAmountOff { amount: 10 });
        coupon.scope = CouponScope::Items;

        let application = evaluate(&coupon, &lines)?;

        assert_eq!(application.discount, 15);
        assert_eq!(
            application
                .breakdown
                .iter()
                .map(|item| item.discount)
                .collect::<Vec<_>>(),
            vec![10, 5]
        );

        Ok(())
    }

    #[test]
    fn item_scope_cap_is_consumed_in_line_order() -> TestResult {
        let lines = [line(1_000, 1), line(1_000, 1)];
        let mut coupon = coupon("HALF", CouponDiscount::PercentageOff { percentage: 50 });
        coupon.scope = CouponScope::Items;
        coupon.max_discount = Some(700);

        let application = evaluate(&coupon, &lines)?;

        assert_eq!(
            application
                .breakdown
                .iter()
                .map(|item| item.discount)
                .collect::<Vec<_>>(),
            vec![500, 200]
        );

        Ok(())
    }

    #[test]
    fn non_qualifying_lines_are_untouched() -> TestResult {
        let seller = SellerUuid::new();
        let mut mine = line(100, 1);
        mine.seller = seller;
        let theirs = line(100, 1);

        let mut coupon = coupon("STORE", CouponDiscount::PercentageOff { percentage: 10 });
        coupon.sellers = vec![seller];

        let outcome = calculate(&[coupon], &[mine, theirs], UserUuid::new(), Timestamp::now())?;

        assert_eq!(outcome.line_discounts, vec![10, 0]);
        assert_eq!(outcome.codes_for_line(0), vec!["STORE".to_string()]);
        assert!(outcome.codes_for_line(1).is_empty());

        Ok(())
    }

    #[test]
    fn minimum_cart_value_is_enforced_on_qualifying_value() {
        let lines = [line(499, 1)];
        let mut coupon = coupon("MIN", CouponDiscount::PercentageOff { percentage: 10 });
        coupon.min_cart_value = 500;

        assert_eq!(
            evaluate(&coupon, &lines),
            Err(CouponError::MinimumNotMet {
                code: "MIN".to_string(),
                required: 500,
                actual: 499,
            })
        );
    }

    #[test]
    fn coupon_without_qualifying_lines_is_not_applicable() {
        let mut coupon = coupon("NONE", CouponDiscount::PercentageOff { percentage: 10 });
        coupon.applicable_products = vec![ProductUuid::new()];

        assert_eq!(
            evaluate(&coupon, &[line(100, 1)]),
            Err(CouponError::NotApplicable("NONE".to_string()))
        );
    }

    #[test]
    fn stacked_discounts_are_capped_per_line() -> TestResult {
        let lines = [line(100, 1)];
        let mut first = coupon("BIG", CouponDiscount::FixedAmountOff { amount: 80 });
        first.stackable = true;
        first.max_stack_per_order = 2;
        let mut second = coupon("BIGGER", CouponDiscount::FixedAmountOff { amount: 80 });
        second.stackable = true;
        second.max_stack_per_order = 2;

        let outcome = calculate(&[first, second], &lines, UserUuid::new(), Timestamp::now())?;

        assert_eq!(outcome.total_discount, 100);
        assert_eq!(outcome.applications.len(), 2);

        Ok(())
    }

    #[test]
    fn calculation_is_idempotent() -> TestResult {
        let lines = [line(333, 3), line(10, 7)];
        let coupon = coupon("TEN", CouponDiscount::PercentageOff { percentage: 10 });
        let user = UserUuid::new();
        let now = Timestamp::now();

        let first = calculate(std::slice::from_ref(&coupon), &lines, user, now)?;
        let second = calculate(std::slice::from_ref(&coupon), &lines, user, now)?;

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn ineligible_coupon_fails_the_whole_calculation() {
        let mut coupon = coupon("OFF", CouponDiscount::PercentageOff { percentage: 10 });
        coupon.is_active = false;

        assert_eq!(
            calculate(&[coupon], &[line(100, 1)], UserUuid::new(), Timestamp::now()),
            Err(CouponError::Inactive("OFF".to_string()))
        );
    }

    #[test]
    fn no_coupons_means_no_discount() -> TestResult {
        let outcome = calculate(&[], &[line(100, 1)], UserUuid::new(), Timestamp::now())?;

        assert_eq!(outcome, DiscountOutcome::none(1));

        Ok(())
    }
}
