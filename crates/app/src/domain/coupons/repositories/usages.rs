//! Coupon Usages Repository

use bazaar::{coupons::CouponUuid, ids::UserUuid};
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{Postgres, Transaction, query_scalar};
use uuid::Uuid;

const RECORD_USAGE_SQL: &str = include_str!("../sql/record_usage.sql");
const RESTORE_USAGE_SQL: &str = include_str!("../sql/restore_usage.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCouponUsagesRepository;

impl PgCouponUsagesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Claim one use of `coupon` for `user`.
    ///
    /// Returns `false` without writing anything when the coupon's global or
    /// per-user limit is already exhausted.
    pub(crate) async fn record_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        user: UserUuid,
        used_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let claimed: Option<Uuid> = query_scalar(RECORD_USAGE_SQL)
            .bind(coupon.into_uuid())
            .bind(user.into_uuid())
            .bind(Uuid::now_v7())
            .bind(SqlxTimestamp::from(used_at))
            .fetch_optional(&mut **tx)
            .await?;

        Ok(claimed.is_some())
    }

    /// Give back `user`'s most recent use of `coupon`.
    ///
    /// `used_count` only drops when a usage row was removed. Returns `false`
    /// when there was no use to give back or the coupon no longer exists.
    pub(crate) async fn restore_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        user: UserUuid,
    ) -> Result<bool, sqlx::Error> {
        let used_count: Option<i32> = query_scalar(RESTORE_USAGE_SQL)
            .bind(coupon.into_uuid())
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(used_count.is_some())
    }
}
