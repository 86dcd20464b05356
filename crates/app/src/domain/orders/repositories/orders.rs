//! Orders Repository
//!
//! Orders are stored whole as JSONB documents. The scalar columns mirror the
//! fields used for lookups and are rewritten on every save.

use bazaar::{
    ids::UserUuid,
    orders::{Order, OrderUuid},
};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{Postgres, Transaction, query, query_scalar, types::Json};

use crate::database::to_db_amount;

const INSERT_ORDER_SQL: &str = include_str!("../sql/insert_order.sql");
const UPDATE_ORDER_SQL: &str = include_str!("../sql/update_order.sql");
const GET_ORDER_SQL: &str = include_str!("../sql/get_order.sql");
const LOCK_ORDER_SQL: &str = include_str!("../sql/lock_order.sql");
const LIST_USER_ORDERS_SQL: &str = include_str!("../sql/list_user_orders.sql");
const LIST_ALL_ORDERS_SQL: &str = include_str!("../sql/list_all_orders.sql");
const DELETE_ORDER_SQL: &str = include_str!("../sql/delete_order.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn insert_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<(), sqlx::Error> {
        query(INSERT_ORDER_SQL)
            .bind(order.uuid.into_uuid())
            .bind(order.user.into_uuid())
            .bind(order.order_status.as_str())
            .bind(order.payment_status.as_str())
            .bind(order.payment_method.as_str())
            .bind(to_db_amount("total_amount", order.totals.total_amount)?)
            .bind(Json(order))
            .bind(SqlxTimestamp::from(order.created_at))
            .bind(SqlxTimestamp::from(order.updated_at))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Overwrite a stored order. Fails with `RowNotFound` when it is missing.
    pub(crate) async fn update_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<(), sqlx::Error> {
        let rows_affected = query(UPDATE_ORDER_SQL)
            .bind(order.uuid.into_uuid())
            .bind(order.order_status.as_str())
            .bind(order.payment_status.as_str())
            .bind(to_db_amount("total_amount", order.totals.total_amount)?)
            .bind(Json(order))
            .bind(SqlxTimestamp::from(order.updated_at))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    pub(crate) async fn get_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Order, sqlx::Error> {
        let Json(order) = query_scalar::<Postgres, Json<Order>>(GET_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(order)
    }

    /// Read and row-lock an order for the rest of the transaction.
    pub(crate) async fn lock_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Order, sqlx::Error> {
        let Json(order) = query_scalar::<Postgres, Json<Order>>(LOCK_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(order)
    }

    pub(crate) async fn list_user_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let orders = query_scalar::<Postgres, Json<Order>>(LIST_USER_ORDERS_SQL)
            .bind(user.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(orders.into_iter().map(|Json(order)| order).collect())
    }

    pub(crate) async fn list_all_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let orders = query_scalar::<Postgres, Json<Order>>(LIST_ALL_ORDERS_SQL)
            .fetch_all(&mut **tx)
            .await?;

        Ok(orders.into_iter().map(|Json(order)| order).collect())
    }

    pub(crate) async fn delete_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_ORDER_SQL)
            .bind(order.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}
