//! Coupon ledger
//!
//! Loading and redeeming coupons inside a caller's transaction, shared by the
//! coupons and orders services so both enforce usage limits the same way.

use bazaar::{
    coupons::{Coupon, CouponApplication, CouponError, CouponUuid},
    ids::UserUuid,
};
use jiff::Timestamp;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use crate::domain::coupons::{
    errors::CouponsServiceError,
    repositories::{PgCouponUsagesRepository, PgCouponsRepository},
};

#[derive(Debug, Clone, Default)]
pub(crate) struct CouponLedger {
    coupons: PgCouponsRepository,
    usages: PgCouponUsagesRepository,
}

impl CouponLedger {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            coupons: PgCouponsRepository::new(),
            usages: PgCouponUsagesRepository::new(),
        }
    }

    /// Read the coupon with normalised `code`.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::NotFound`] when no coupon has the code.
    pub(crate) async fn get(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Coupon, CouponsServiceError> {
        match self.coupons.get_coupon_by_code(tx, code).await {
            Err(sqlx::Error::RowNotFound) => Err(CouponError::NotFound(code.to_string()).into()),
            result => Ok(result?),
        }
    }

    /// Lock the coupons for normalised `codes`, returned in request order.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::NotFound`] naming the first unknown code.
    pub(crate) async fn lock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        codes: &[String],
    ) -> Result<Vec<Coupon>, CouponsServiceError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let mut locked = self.coupons.lock_coupons_by_code(tx, codes).await?;

        codes
            .iter()
            .map(|code| {
                locked
                    .iter()
                    .position(|coupon| &coupon.code == code)
                    .map(|index| locked.swap_remove(index))
                    .ok_or_else(|| CouponError::NotFound(code.clone()).into())
            })
            .collect()
    }

    /// Record one use of every applied coupon for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::UsageLimitReached`] when a concurrent redemption
    /// used up a coupon after it was read. The caller must abort.
    pub(crate) async fn redeem(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        applications: &[CouponApplication],
        user: UserUuid,
        now: Timestamp,
    ) -> Result<(), CouponsServiceError> {
        for application in applications {
            let claimed = self
                .usages
                .record_usage(tx, application.coupon, user, now)
                .await?;

            if !claimed {
                return Err(CouponError::UsageLimitReached(application.code.clone()).into());
            }

            debug!(code = %application.code, user_uuid = %user, "recorded coupon usage");
        }

        Ok(())
    }

    /// Give back one use of `coupon` to `user`. Returns `false` when `user`
    /// holds no use of it or the coupon has since been deleted.
    pub(crate) async fn restore(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        user: UserUuid,
    ) -> Result<bool, CouponsServiceError> {
        Ok(self.usages.restore_usage(tx, coupon, user).await?)
    }
}
