//! Wallets Repository

use bazaar::{ids::UserUuid, orders::OrderUuid};
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};
use tracing::debug;

use crate::{
    database::{to_db_amount, try_get_amount},
    domain::wallets::records::{
        WalletRecord, WalletTransactionKind, WalletTransactionRecord, WalletTransactionUuid,
    },
};

const CREDIT_WALLET_SQL: &str = include_str!("sql/credit_wallet.sql");
const GET_WALLET_SQL: &str = include_str!("sql/get_wallet.sql");
const LIST_WALLET_TRANSACTIONS_SQL: &str = include_str!("sql/list_wallet_transactions.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgWalletsRepository;

impl PgWalletsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Add `amount` to `user`'s balance, opening the wallet if needed, and
    /// record why.
    pub(crate) async fn credit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        kind: WalletTransactionKind,
        amount: u64,
        order: Option<OrderUuid>,
        now: Timestamp,
    ) -> Result<WalletTransactionRecord, sqlx::Error> {
        let record = query_as::<Postgres, WalletTransactionRecord>(CREDIT_WALLET_SQL)
            .bind(WalletTransactionUuid::new().into_uuid())
            .bind(user.into_uuid())
            .bind(kind.as_str())
            .bind(to_db_amount("amount", amount)?)
            .bind(order.map(OrderUuid::into_uuid))
            .bind(SqlxTimestamp::from(now))
            .fetch_one(&mut **tx)
            .await?;

        debug!(user_uuid = %user, amount, kind = %kind, "credited wallet");

        Ok(record)
    }

    pub(crate) async fn get_wallet(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<WalletRecord>, sqlx::Error> {
        query_as::<Postgres, WalletRecord>(GET_WALLET_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_transactions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Vec<WalletTransactionRecord>, sqlx::Error> {
        query_as::<Postgres, WalletTransactionRecord>(LIST_WALLET_TRANSACTIONS_SQL)
            .bind(user.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for WalletRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            user: UserUuid::from_uuid(row.try_get("user_uuid")?),
            balance: try_get_amount(row, "balance")?,
            transactions: Vec::new(),
            created_at: Some(row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff()),
            updated_at: Some(row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff()),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for WalletTransactionRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("kind")?;

        Ok(Self {
            uuid: WalletTransactionUuid::from_uuid(row.try_get("uuid")?),
            user: UserUuid::from_uuid(row.try_get("user_uuid")?),
            kind: WalletTransactionKind::try_from(kind.as_str()).map_err(|e| {
                sqlx::Error::ColumnDecode {
                    index: "kind".to_string(),
                    source: e.into(),
                }
            })?,
            amount: try_get_amount(row, "amount")?,
            order: row
                .try_get::<Option<uuid::Uuid>, _>("order_uuid")?
                .map(OrderUuid::from_uuid),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
