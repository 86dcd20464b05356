//! Wallets service.

use async_trait::async_trait;
use bazaar::ids::UserUuid;
use mockall::automock;

use crate::{
    database::Db,
    domain::wallets::{
        errors::WalletsServiceError, records::WalletRecord, repository::PgWalletsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgWalletsService {
    db: Db,
    repository: PgWalletsRepository,
}

impl PgWalletsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgWalletsRepository::new(),
        }
    }
}

#[async_trait]
impl WalletsService for PgWalletsService {
    async fn get_wallet(&self, user: UserUuid) -> Result<WalletRecord, WalletsServiceError> {
        let mut tx = self.db.begin().await?;

        let wallet = self.repository.get_wallet(&mut tx, user).await?;

        let wallet = match wallet {
            Some(mut wallet) => {
                wallet.transactions = self.repository.list_transactions(&mut tx, user).await?;
                wallet
            }
            None => WalletRecord::empty(user),
        };

        tx.commit().await?;

        Ok(wallet)
    }
}

#[automock]
#[async_trait]
pub trait WalletsService: Send + Sync {
    /// Retrieve a buyer's balance and its history, newest first. Buyers who
    /// were never credited have an empty wallet.
    async fn get_wallet(&self, user: UserUuid) -> Result<WalletRecord, WalletsServiceError>;
}
