//! Disputes Repository

use bazaar::{
    disputes::{Dispute, DisputeUuid},
    orders::{OrderItemUuid, OrderUuid},
};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{Postgres, Transaction, query, query_scalar, types::Json};

const INSERT_DISPUTE_SQL: &str = include_str!("sql/insert_dispute.sql");
const UPDATE_DISPUTE_SQL: &str = include_str!("sql/update_dispute.sql");
const GET_DISPUTE_SQL: &str = include_str!("sql/get_dispute.sql");
const LOCK_DISPUTE_SQL: &str = include_str!("sql/lock_dispute.sql");
const LIST_ORDER_DISPUTES_SQL: &str = include_str!("sql/list_order_disputes.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgDisputesRepository;

impl PgDisputesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Store a new dispute. A second dispute by the same buyer on the same
    /// order and item violates a unique constraint.
    pub(crate) async fn insert_dispute(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        dispute: &Dispute,
    ) -> Result<(), sqlx::Error> {
        query(INSERT_DISPUTE_SQL)
            .bind(dispute.uuid.into_uuid())
            .bind(dispute.order.into_uuid())
            .bind(dispute.item.map(OrderItemUuid::into_uuid))
            .bind(dispute.opened_by.into_uuid())
            .bind(dispute.status.as_str())
            .bind(Json(dispute))
            .bind(SqlxTimestamp::from(dispute.created_at))
            .bind(SqlxTimestamp::from(dispute.updated_at))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn update_dispute(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        dispute: &Dispute,
    ) -> Result<(), sqlx::Error> {
        let rows_affected = query(UPDATE_DISPUTE_SQL)
            .bind(dispute.uuid.into_uuid())
            .bind(dispute.status.as_str())
            .bind(Json(dispute))
            .bind(SqlxTimestamp::from(dispute.updated_at))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    pub(crate) async fn get_dispute(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        dispute: DisputeUuid,
    ) -> Result<Dispute, sqlx::Error> {
        let Json(dispute) = query_scalar::<Postgres, Json<Dispute>>(GET_DISPUTE_SQL)
            .bind(dispute.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(dispute)
    }

    pub(crate) async fn lock_dispute(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        dispute: DisputeUuid,
    ) -> Result<Dispute, sqlx::Error> {
        let Json(dispute) = query_scalar::<Postgres, Json<Dispute>>(LOCK_DISPUTE_SQL)
            .bind(dispute.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(dispute)
    }

    pub(crate) async fn list_order_disputes(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<Dispute>, sqlx::Error> {
        let disputes = query_scalar::<Postgres, Json<Dispute>>(LIST_ORDER_DISPUTES_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(disputes.into_iter().map(|Json(dispute)| dispute).collect())
    }
}
