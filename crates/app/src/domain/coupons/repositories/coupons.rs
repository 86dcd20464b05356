//! Coupons Repository

use bazaar::{
    catalog::ProductUuid,
    coupons::{Coupon, CouponCreator, CouponDiscount, CouponScope, CouponUsage, CouponUuid},
    ids::{CategoryUuid, SellerUuid},
};
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{Postgres, Row, Transaction, postgres::PgRow, query, types::Json};
use tracing::debug;
use uuid::Uuid;

use crate::database::{to_db_amount, to_db_count, try_get_amount, try_get_count};

const CREATE_COUPON_SQL: &str = include_str!("../sql/create_coupon.sql");
const GET_COUPON_BY_CODE_SQL: &str = include_str!("../sql/get_coupon_by_code.sql");
const LOCK_COUPONS_BY_CODE_SQL: &str = include_str!("../sql/lock_coupons_by_code.sql");
const SET_COUPON_ACTIVE_SQL: &str = include_str!("../sql/set_coupon_active.sql");
const DELETE_COUPON_SQL: &str = include_str!("../sql/delete_coupon.sql");
const LIST_AVAILABLE_COUPONS_SQL: &str = include_str!("../sql/list_available_coupons.sql");
const LOCK_COUPON_SQL: &str = include_str!("../sql/lock_coupon.sql");
const UPDATE_COUPON_SQL: &str = include_str!("../sql/update_coupon.sql");
const LIST_ALL_COUPONS_SQL: &str = include_str!("../sql/list_all_coupons.sql");
const LIST_SELLER_COUPONS_SQL: &str = include_str!("../sql/list_seller_coupons.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCouponsRepository;

impl PgCouponsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: &Coupon,
    ) -> Result<Coupon, sqlx::Error> {
        let row = query(CREATE_COUPON_SQL)
            .bind(coupon.uuid.into_uuid())
            .bind(&coupon.code)
            .bind(coupon.description.as_deref())
            .bind(coupon.discount.type_as_str())
            .bind(to_db_amount("discount_value", coupon.discount.value())?)
            .bind(coupon.scope.as_str())
            .bind(uuids(&coupon.sellers, SellerUuid::into_uuid))
            .bind(uuids(&coupon.applicable_products, ProductUuid::into_uuid))
            .bind(uuids(&coupon.applicable_categories, CategoryUuid::into_uuid))
            .bind(to_db_amount("min_cart_value", coupon.min_cart_value)?)
            .bind(
                coupon
                    .max_discount
                    .map(|cap| to_db_amount("max_discount", cap))
                    .transpose()?,
            )
            .bind(to_db_count("max_usage", coupon.max_usage)?)
            .bind(to_db_count("max_usage_per_user", coupon.max_usage_per_user)?)
            .bind(coupon.stackable)
            .bind(to_db_count("max_stack_per_order", coupon.max_stack_per_order)?)
            .bind(coupon.expires_at.map(SqlxTimestamp::from))
            .bind(coupon.is_active)
            .bind(coupon.created_by.kind_as_str())
            .bind(coupon.created_by.uuid())
            .fetch_one(&mut **tx)
            .await?;

        coupon_from_row(&row)
    }

    pub(crate) async fn get_coupon_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Coupon, sqlx::Error> {
        let row = query(GET_COUPON_BY_CODE_SQL)
            .bind(code)
            .fetch_one(&mut **tx)
            .await?;

        coupon_from_row(&row)
    }

    /// Read and row-lock the coupons with `codes`, in code order. Unknown codes
    /// are simply absent.
    pub(crate) async fn lock_coupons_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        codes: &[String],
    ) -> Result<Vec<Coupon>, sqlx::Error> {
        let rows = query(LOCK_COUPONS_BY_CODE_SQL)
            .bind(codes)
            .fetch_all(&mut **tx)
            .await?;

        let coupons = rows
            .iter()
            .map(coupon_from_row)
            .collect::<sqlx::Result<Vec<_>>>()?;

        debug!(
            requested = codes.len(),
            locked = coupons.len(),
            "locked coupons"
        );

        Ok(coupons)
    }

    pub(crate) async fn lock_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
    ) -> Result<Option<Coupon>, sqlx::Error> {
        let row = query(LOCK_COUPON_SQL)
            .bind(coupon.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        row.as_ref().map(coupon_from_row).transpose()
    }

    /// Overwrite the definition of `coupon`. Usage counters and the creator
    /// are never written here.
    pub(crate) async fn update_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: &Coupon,
    ) -> Result<Coupon, sqlx::Error> {
        let row = query(UPDATE_COUPON_SQL)
            .bind(coupon.uuid.into_uuid())
            .bind(&coupon.code)
            .bind(coupon.description.as_deref())
            .bind(coupon.discount.type_as_str())
            .bind(to_db_amount("discount_value", coupon.discount.value())?)
            .bind(coupon.scope.as_str())
            .bind(uuids(&coupon.sellers, SellerUuid::into_uuid))
            .bind(uuids(&coupon.applicable_products, ProductUuid::into_uuid))
            .bind(uuids(&coupon.applicable_categories, CategoryUuid::into_uuid))
            .bind(to_db_amount("min_cart_value", coupon.min_cart_value)?)
            .bind(
                coupon
                    .max_discount
                    .map(|cap| to_db_amount("max_discount", cap))
                    .transpose()?,
            )
            .bind(to_db_count("max_usage", coupon.max_usage)?)
            .bind(to_db_count("max_usage_per_user", coupon.max_usage_per_user)?)
            .bind(coupon.stackable)
            .bind(to_db_count("max_stack_per_order", coupon.max_stack_per_order)?)
            .bind(coupon.expires_at.map(SqlxTimestamp::from))
            .bind(coupon.is_active)
            .fetch_one(&mut **tx)
            .await?;

        coupon_from_row(&row)
    }

    pub(crate) async fn set_coupon_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        is_active: bool,
    ) -> Result<Coupon, sqlx::Error> {
        let row = query(SET_COUPON_ACTIVE_SQL)
            .bind(coupon.into_uuid())
            .bind(is_active)
            .fetch_one(&mut **tx)
            .await?;

        coupon_from_row(&row)
    }

    pub(crate) async fn delete_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_COUPON_SQL)
            .bind(coupon.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Active, unexpired coupons with uses left, optionally narrowed to those
    /// that can apply to `seller` or `product`.
    pub(crate) async fn list_available_coupons(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        seller: Option<SellerUuid>,
        product: Option<ProductUuid>,
        now: Timestamp,
    ) -> Result<Vec<Coupon>, sqlx::Error> {
        let rows = query(LIST_AVAILABLE_COUPONS_SQL)
            .bind(seller.map(SellerUuid::into_uuid))
            .bind(product.map(ProductUuid::into_uuid))
            .bind(SqlxTimestamp::from(now))
            .fetch_all(&mut **tx)
            .await?;

        rows.iter().map(coupon_from_row).collect()
    }

    pub(crate) async fn list_all_coupons(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<Coupon>, sqlx::Error> {
        let rows = query(LIST_ALL_COUPONS_SQL).fetch_all(&mut **tx).await?;

        rows.iter().map(coupon_from_row).collect()
    }

    /// Every coupon that names `seller`, whatever its state.
    pub(crate) async fn list_seller_coupons(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        seller: SellerUuid,
    ) -> Result<Vec<Coupon>, sqlx::Error> {
        let rows = query(LIST_SELLER_COUPONS_SQL)
            .bind(seller.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        rows.iter().map(coupon_from_row).collect()
    }
}

fn uuids<T: Copy>(ids: &[T], into_uuid: fn(T) -> Uuid) -> Vec<Uuid> {
    ids.iter().copied().map(into_uuid).collect()
}

fn decode_error(column: &str, error: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(error),
    }
}

fn coupon_from_row(row: &PgRow) -> sqlx::Result<Coupon> {
    let discount_type: String = row.try_get("discount_type")?;
    let discount = CouponDiscount::from_stored(&discount_type, try_get_amount(row, "discount_value")?)
        .map_err(|e| decode_error("discount_type", e))?;

    let scope: String = row.try_get("scope")?;
    let scope = CouponScope::try_from(scope.as_str()).map_err(|e| decode_error("scope", e))?;

    let created_by_kind: String = row.try_get("created_by_kind")?;
    let created_by = CouponCreator::from_stored(&created_by_kind, row.try_get("created_by_uuid")?)
        .map_err(|e| decode_error("created_by_kind", e))?;

    let max_discount = row
        .try_get::<Option<i64>, _>("max_discount")?
        .map(u64::try_from)
        .transpose()
        .map_err(|e| decode_error("max_discount", e))?;

    let Json(user_usage) = row.try_get::<Json<Vec<CouponUsage>>, _>("user_usage")?;

    Ok(Coupon {
        uuid: CouponUuid::from_uuid(row.try_get("uuid")?),
        code: row.try_get("code")?,
        description: row.try_get("description")?,
        discount,
        scope,
        sellers: row
            .try_get::<Vec<Uuid>, _>("seller_uuids")?
            .into_iter()
            .map(SellerUuid::from_uuid)
            .collect(),
        applicable_products: row
            .try_get::<Vec<Uuid>, _>("product_uuids")?
            .into_iter()
            .map(ProductUuid::from_uuid)
            .collect(),
        applicable_categories: row
            .try_get::<Vec<Uuid>, _>("category_uuids")?
            .into_iter()
            .map(CategoryUuid::from_uuid)
            .collect(),
        min_cart_value: try_get_amount(row, "min_cart_value")?,
        max_discount,
        max_usage: try_get_count(row, "max_usage")?,
        used_count: try_get_count(row, "used_count")?,
        max_usage_per_user: try_get_count(row, "max_usage_per_user")?,
        user_usage,
        stackable: row.try_get("stackable")?,
        max_stack_per_order: try_get_count(row, "max_stack_per_order")?,
        expires_at: row
            .try_get::<Option<SqlxTimestamp>, _>("expires_at")?
            .map(SqlxTimestamp::to_jiff),
        is_active: row.try_get("is_active")?,
        created_by,
    })
}
