//! Products Repository

use bazaar::{
    catalog::{ProductSnapshot, ProductStatus, ProductUuid, SellerSnapshot},
    ids::{CategoryUuid, SellerUuid},
};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rustc_hash::FxHashMap;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use tracing::debug;
use uuid::Uuid;

use crate::{
    database::{to_db_amount, try_get_amount},
    domain::products::{data::NewProduct, records::ProductRecord},
};

const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const LOCK_SNAPSHOTS_SQL: &str = include_str!("sql/lock_snapshots.sql");
const DECREMENT_STOCK_SQL: &str = include_str!("sql/decrement_stock.sql");
const RESTOCK_SQL: &str = include_str!("sql/restock.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProductsRepository;

impl PgProductsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: &NewProduct,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(product.seller.into_uuid())
            .bind(product.category.map(CategoryUuid::into_uuid))
            .bind(&product.name)
            .bind(to_db_amount("price", product.price)?)
            .bind(to_db_amount("quantity", product.quantity)?)
            .bind(true)
            .bind(product.status.as_str())
            .bind(product.is_taxable)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Read and row-lock the products in `products` for the rest of the
    /// transaction. Unknown ids are simply absent from the map.
    pub(crate) async fn lock_snapshots(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        products: &[ProductUuid],
    ) -> Result<FxHashMap<ProductUuid, ProductSnapshot>, sqlx::Error> {
        let mut uuids: Vec<Uuid> = products.iter().map(|p| p.into_uuid()).collect();

        uuids.sort_unstable();
        uuids.dedup();

        let rows = query(LOCK_SNAPSHOTS_SQL)
            .bind(uuids)
            .fetch_all(&mut **tx)
            .await?;

        let snapshots = rows
            .iter()
            .map(snapshot_from_row)
            .map(|snapshot| snapshot.map(|s| (s.uuid, s)))
            .collect::<sqlx::Result<FxHashMap<_, _>>>()?;

        debug!(
            requested = products.len(),
            locked = snapshots.len(),
            "locked product snapshots"
        );

        Ok(snapshots)
    }

    /// Take `quantity` units off the shelf if at least that many remain.
    ///
    /// Returns the units left, or `None` when the stock was too low at write
    /// time.
    pub(crate) async fn decrement_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u64,
    ) -> Result<Option<u64>, sqlx::Error> {
        let remaining: Option<i64> = query_scalar(DECREMENT_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(to_db_amount("quantity", quantity)?)
            .fetch_optional(&mut **tx)
            .await?;

        remaining
            .map(|left| {
                u64::try_from(left).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "quantity".to_string(),
                    source: Box::new(e),
                })
            })
            .transpose()
    }

    pub(crate) async fn restock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u64,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(RESTOCK_SQL)
            .bind(product.into_uuid())
            .bind(to_db_amount("quantity", quantity)?)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

fn try_get_status(row: &PgRow) -> sqlx::Result<ProductStatus> {
    let status: String = row.try_get("status")?;

    ProductStatus::try_from(status.as_str()).map_err(|e| sqlx::Error::ColumnDecode {
        index: "status".to_string(),
        source: Box::new(e),
    })
}

fn snapshot_from_row(row: &PgRow) -> sqlx::Result<ProductSnapshot> {
    let seller_uuid: Option<Uuid> = row.try_get("seller_uuid")?;
    let seller_is_verified: Option<bool> = row.try_get("seller_is_verified")?;

    Ok(ProductSnapshot {
        uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
        seller: seller_uuid.map(|uuid| SellerSnapshot {
            uuid: SellerUuid::from_uuid(uuid),
            is_verified: seller_is_verified.unwrap_or(false),
        }),
        category: row
            .try_get::<Option<Uuid>, _>("category_uuid")?
            .map(CategoryUuid::from_uuid),
        price: try_get_amount(row, "price")?,
        quantity: try_get_amount(row, "quantity")?,
        in_stock: row.try_get("in_stock")?,
        status: try_get_status(row)?,
        is_taxable: row.try_get("is_taxable")?,
    })
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            seller: row
                .try_get::<Option<Uuid>, _>("seller_uuid")?
                .map(SellerUuid::from_uuid),
            category: row
                .try_get::<Option<Uuid>, _>("category_uuid")?
                .map(CategoryUuid::from_uuid),
            name: row.try_get("name")?,
            price: try_get_amount(row, "price")?,
            quantity: try_get_amount(row, "quantity")?,
            in_stock: row.try_get("in_stock")?,
            status: try_get_status(row)?,
            is_taxable: row.try_get("is_taxable")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
