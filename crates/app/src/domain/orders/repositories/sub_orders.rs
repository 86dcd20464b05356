//! Sub-Orders Repository

use bazaar::{
    ids::SellerUuid,
    orders::{OrderUuid, SubOrder},
};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{Postgres, Transaction, query, query_scalar, types::Json};

use crate::database::to_db_amount;

const INSERT_SUB_ORDER_SQL: &str = include_str!("../sql/insert_sub_order.sql");
const UPDATE_SUB_ORDER_SQL: &str = include_str!("../sql/update_sub_order.sql");
const LOCK_SUB_ORDERS_SQL: &str = include_str!("../sql/lock_sub_orders.sql");
const LIST_SUB_ORDERS_SQL: &str = include_str!("../sql/list_sub_orders.sql");
const LIST_SELLER_SUB_ORDERS_SQL: &str = include_str!("../sql/list_seller_sub_orders.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgSubOrdersRepository;

impl PgSubOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn insert_sub_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        sub_order: &SubOrder,
    ) -> Result<(), sqlx::Error> {
        query(INSERT_SUB_ORDER_SQL)
            .bind(sub_order.uuid.into_uuid())
            .bind(sub_order.order.into_uuid())
            .bind(sub_order.seller.into_uuid())
            .bind(sub_order.status.as_str())
            .bind(to_db_amount("total_amount", sub_order.totals.total_amount)?)
            .bind(Json(sub_order))
            .bind(SqlxTimestamp::from(sub_order.created_at))
            .bind(SqlxTimestamp::from(sub_order.updated_at))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn update_sub_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        sub_order: &SubOrder,
    ) -> Result<(), sqlx::Error> {
        let rows_affected = query(UPDATE_SUB_ORDER_SQL)
            .bind(sub_order.uuid.into_uuid())
            .bind(sub_order.status.as_str())
            .bind(to_db_amount("total_amount", sub_order.totals.total_amount)?)
            .bind(Json(sub_order))
            .bind(SqlxTimestamp::from(sub_order.updated_at))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    /// Read and row-lock every sub-order of `order`.
    pub(crate) async fn lock_sub_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<SubOrder>, sqlx::Error> {
        fetch_documents(tx, LOCK_SUB_ORDERS_SQL, order.into_uuid()).await
    }

    pub(crate) async fn list_sub_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<SubOrder>, sqlx::Error> {
        fetch_documents(tx, LIST_SUB_ORDERS_SQL, order.into_uuid()).await
    }

    pub(crate) async fn list_seller_sub_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        seller: SellerUuid,
    ) -> Result<Vec<SubOrder>, sqlx::Error> {
        fetch_documents(tx, LIST_SELLER_SUB_ORDERS_SQL, seller.into_uuid()).await
    }
}

async fn fetch_documents(
    tx: &mut Transaction<'_, Postgres>,
    sql: &'static str,
    key: uuid::Uuid,
) -> Result<Vec<SubOrder>, sqlx::Error> {
    let documents = query_scalar::<Postgres, Json<SubOrder>>(sql)
        .bind(key)
        .fetch_all(&mut **tx)
        .await?;

    Ok(documents.into_iter().map(|Json(sub_order)| sub_order).collect())
}
