//! Coupon eligibility

use jiff::Timestamp;

use crate::{
    coupons::{Coupon, CouponError},
    ids::UserUuid,
};

/// Check that `user` may redeem `coupon` at `now`.
///
/// # Errors
///
/// Returns the first failed check: inactive, expired, globally exhausted, or
/// exhausted for this user.
pub fn check_eligibility(
    coupon: &Coupon,
    user: UserUuid,
    now: Timestamp,
) -> Result<(), CouponError> {
    if !coupon.is_active {
        return Err(CouponError::Inactive(coupon.code.clone()));
    }

    if coupon.expires_at.is_some_and(|expires_at| expires_at < now) {
        return Err(CouponError::Expired(coupon.code.clone()));
    }

    if coupon.used_count >= coupon.max_usage {
        return Err(CouponError::UsageLimitReached(coupon.code.clone()));
    }

    if coupon.uses_by(user) >= coupon.max_usage_per_user {
        return Err(CouponError::PerUserLimitReached(coupon.code.clone()));
    }

    Ok(())
}
