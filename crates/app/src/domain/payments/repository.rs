//! Payments Repository

use bazaar::{ids::UserUuid, orders::OrderUuid};
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};
use tracing::debug;

use crate::{
    database::{to_db_amount, try_get_amount},
    domain::payments::records::{PaymentRecord, PaymentRecordStatus, PaymentUuid},
};

const INSERT_PAYMENT_SQL: &str = include_str!("sql/insert_payment.sql");
const GET_PAYMENT_BY_PROVIDER_ORDER_SQL: &str = include_str!("sql/get_payment_by_provider_order.sql");
const LOCK_PAYMENT_SQL: &str = include_str!("sql/lock_payment.sql");
const SETTLE_PAYMENT_SQL: &str = include_str!("sql/settle_payment.sql");
const LIST_ORDER_PAYMENTS_SQL: &str = include_str!("sql/list_order_payments.sql");

/// A payment about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewPayment<'a> {
    pub(crate) order: OrderUuid,
    pub(crate) user: UserUuid,
    pub(crate) provider: &'a str,
    pub(crate) provider_order_id: Option<&'a str>,
    pub(crate) amount: u64,
    pub(crate) currency: &'a str,
    pub(crate) status: PaymentRecordStatus,
    pub(crate) failure_reason: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPaymentsRepository;

impl PgPaymentsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn insert_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: &NewPayment<'_>,
        now: Timestamp,
    ) -> Result<PaymentRecord, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(INSERT_PAYMENT_SQL)
            .bind(PaymentUuid::new().into_uuid())
            .bind(payment.order.into_uuid())
            .bind(payment.user.into_uuid())
            .bind(payment.provider)
            .bind(payment.provider_order_id)
            .bind(to_db_amount("amount", payment.amount)?)
            .bind(payment.currency)
            .bind(payment.status.as_str())
            .bind(payment.failure_reason)
            .bind(SqlxTimestamp::from(now))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_payment_by_provider_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider_order_id: &str,
    ) -> Result<PaymentRecord, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(GET_PAYMENT_BY_PROVIDER_ORDER_SQL)
            .bind(provider_order_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn lock_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: PaymentUuid,
    ) -> Result<PaymentRecord, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(LOCK_PAYMENT_SQL)
            .bind(payment.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Move a pending payment to `status`.
    ///
    /// Returns `None` when the payment was no longer pending.
    pub(crate) async fn settle_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: PaymentUuid,
        status: PaymentRecordStatus,
        failure_reason: Option<&str>,
        now: Timestamp,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        let settled = query_as::<Postgres, PaymentRecord>(SETTLE_PAYMENT_SQL)
            .bind(payment.into_uuid())
            .bind(status.as_str())
            .bind(failure_reason)
            .bind(SqlxTimestamp::from(now))
            .fetch_optional(&mut **tx)
            .await?;

        debug!(payment_uuid = %payment, status = %status, settled = settled.is_some(), "settled payment");

        Ok(settled)
    }

    pub(crate) async fn list_order_payments(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<PaymentRecord>, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(LIST_ORDER_PAYMENTS_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for PaymentRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;

        Ok(Self {
            uuid: PaymentUuid::from_uuid(row.try_get("uuid")?),
            order: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            user: UserUuid::from_uuid(row.try_get("user_uuid")?),
            provider: row.try_get("provider")?,
            provider_order_id: row.try_get("provider_order_id")?,
            amount: try_get_amount(row, "amount")?,
            currency: row.try_get("currency")?,
            status: PaymentRecordStatus::try_from(status.as_str()).map_err(|e| {
                sqlx::Error::ColumnDecode {
                    index: "status".to_string(),
                    source: e.into(),
                }
            })?,
            failure_reason: row.try_get("failure_reason")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
