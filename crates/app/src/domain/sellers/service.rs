//! Sellers service.

use async_trait::async_trait;
use bazaar::ids::SellerUuid;
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::sellers::{
        data::NewSeller, errors::SellersServiceError, records::SellerRecord,
        repository::PgSellersRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgSellersService {
    db: Db,
    repository: PgSellersRepository,
}

impl PgSellersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgSellersRepository::new(),
        }
    }
}

#[async_trait]
impl SellersService for PgSellersService {
    #[tracing::instrument(
        name = "sellers.service.create_seller",
        skip(self, seller),
        fields(seller_uuid = %seller.uuid),
        err
    )]
    async fn create_seller(&self, seller: NewSeller) -> Result<SellerRecord, SellersServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_seller(&mut tx, &seller).await?;

        tx.commit().await?;

        info!(seller_uuid = %created.uuid, "created seller");

        Ok(created)
    }

    async fn get_seller(&self, seller: SellerUuid) -> Result<SellerRecord, SellersServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self.repository.get_seller(&mut tx, seller).await?;

        tx.commit().await?;

        Ok(record)
    }

    #[tracing::instrument(
        name = "sellers.service.set_seller_verified",
        skip(self),
        fields(seller_uuid = %seller),
        err
    )]
    async fn set_seller_verified(
        &self,
        seller: SellerUuid,
        is_verified: bool,
    ) -> Result<SellerRecord, SellersServiceError> {
        let mut tx = self.db.begin().await?;

        let updated = self
            .repository
            .set_seller_verified(&mut tx, seller, is_verified)
            .await?;

        tx.commit().await?;

        info!(seller_uuid = %seller, is_verified, "updated seller verification");

        Ok(updated)
    }
}

#[automock]
#[async_trait]
pub trait SellersService: Send + Sync {
    /// Registers a seller.
    async fn create_seller(&self, seller: NewSeller) -> Result<SellerRecord, SellersServiceError>;

    /// Retrieve a single seller.
    async fn get_seller(&self, seller: SellerUuid) -> Result<SellerRecord, SellersServiceError>;

    /// Marks a seller verified or unverified. Only verified sellers can sell.
    async fn set_seller_verified(
        &self,
        seller: SellerUuid,
        is_verified: bool,
    ) -> Result<SellerRecord, SellersServiceError>;
}
