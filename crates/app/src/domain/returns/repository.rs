//! Return Requests Repository

use bazaar::{
    orders::OrderUuid,
    returns::{ReturnRequest, ReturnRequestUuid},
};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{Postgres, Transaction, query, query_scalar, types::Json};

const INSERT_RETURN_REQUEST_SQL: &str = include_str!("sql/insert_return_request.sql");
const UPDATE_RETURN_REQUEST_SQL: &str = include_str!("sql/update_return_request.sql");
const GET_RETURN_REQUEST_SQL: &str = include_str!("sql/get_return_request.sql");
const LOCK_RETURN_REQUEST_SQL: &str = include_str!("sql/lock_return_request.sql");
const LIST_ORDER_RETURN_REQUESTS_SQL: &str = include_str!("sql/list_order_return_requests.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgReturnsRepository;

impl PgReturnsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn insert_return_request(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        request: &ReturnRequest,
    ) -> Result<(), sqlx::Error> {
        query(INSERT_RETURN_REQUEST_SQL)
            .bind(request.uuid.into_uuid())
            .bind(request.order.into_uuid())
            .bind(request.item.into_uuid())
            .bind(request.buyer.into_uuid())
            .bind(request.seller.into_uuid())
            .bind(request.status.as_str())
            .bind(Json(request))
            .bind(SqlxTimestamp::from(request.created_at))
            .bind(SqlxTimestamp::from(request.updated_at))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn update_return_request(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        request: &ReturnRequest,
    ) -> Result<(), sqlx::Error> {
        let rows_affected = query(UPDATE_RETURN_REQUEST_SQL)
            .bind(request.uuid.into_uuid())
            .bind(request.status.as_str())
            .bind(Json(request))
            .bind(SqlxTimestamp::from(request.updated_at))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    pub(crate) async fn get_return_request(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        request: ReturnRequestUuid,
    ) -> Result<ReturnRequest, sqlx::Error> {
        let Json(request) = query_scalar::<Postgres, Json<ReturnRequest>>(GET_RETURN_REQUEST_SQL)
            .bind(request.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(request)
    }

    pub(crate) async fn lock_return_request(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        request: ReturnRequestUuid,
    ) -> Result<ReturnRequest, sqlx::Error> {
        let Json(request) = query_scalar::<Postgres, Json<ReturnRequest>>(LOCK_RETURN_REQUEST_SQL)
            .bind(request.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(request)
    }

    pub(crate) async fn list_order_return_requests(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<ReturnRequest>, sqlx::Error> {
        let requests = query_scalar::<Postgres, Json<ReturnRequest>>(LIST_ORDER_RETURN_REQUESTS_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(requests.into_iter().map(|Json(request)| request).collect())
    }
}
