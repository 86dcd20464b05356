//! Sellers Repository

use bazaar::ids::SellerUuid;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::sellers::{data::NewSeller, records::SellerRecord};

const CREATE_SELLER_SQL: &str = include_str!("sql/create_seller.sql");
const GET_SELLER_SQL: &str = include_str!("sql/get_seller.sql");
const SET_SELLER_VERIFIED_SQL: &str = include_str!("sql/set_seller_verified.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgSellersRepository;

impl PgSellersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_seller(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        seller: &NewSeller,
    ) -> Result<SellerRecord, sqlx::Error> {
        query_as::<Postgres, SellerRecord>(CREATE_SELLER_SQL)
            .bind(seller.uuid.into_uuid())
            .bind(&seller.store_name)
            .bind(seller.is_verified)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_seller(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        seller: SellerUuid,
    ) -> Result<SellerRecord, sqlx::Error> {
        query_as::<Postgres, SellerRecord>(GET_SELLER_SQL)
            .bind(seller.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn set_seller_verified(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        seller: SellerUuid,
        is_verified: bool,
    ) -> Result<SellerRecord, sqlx::Error> {
        query_as::<Postgres, SellerRecord>(SET_SELLER_VERIFIED_SQL)
            .bind(seller.into_uuid())
            .bind(is_verified)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for SellerRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: SellerUuid::from_uuid(row.try_get("uuid")?),
            store_name: row.try_get("store_name")?,
            is_verified: row.try_get("is_verified")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
