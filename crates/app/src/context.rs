//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    config::{AppConfig, PricingConfigError},
    database::{self, Db},
    domain::{
        carts::{CartsService, PgCartsService},
        coupons::{CouponsService, PgCouponsService},
        disputes::{DisputesService, PgDisputesService},
        orders::{OrdersService, PgOrdersService},
        payments::{PaymentsService, PgPaymentsService},
        products::{PgProductsService, ProductsService},
        returns::{PgReturnsService, ReturnsService},
        sellers::{PgSellersService, SellersService},
        wallets::{PgWalletsService, WalletsService},
    },
    gateway::HttpPaymentGateway,
    notifier::LoggingNotifier,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("invalid pricing settings")]
    Pricing(#[from] PricingConfigError),
}

#[derive(Clone)]
pub struct AppContext {
    pub sellers: Arc<dyn SellersService>,
    pub products: Arc<dyn ProductsService>,
    pub coupons: Arc<dyn CouponsService>,
    pub carts: Arc<dyn CartsService>,
    pub wallets: Arc<dyn WalletsService>,
    pub orders: Arc<dyn OrdersService>,
    pub returns: Arc<dyn ReturnsService>,
    pub disputes: Arc<dyn DisputesService>,
    pub payments: Arc<dyn PaymentsService>,
}

impl AppContext {
    /// Build application context from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the pricing settings are invalid or establishing a
    /// database connection fails.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppInitError> {
        let assembler = config.pricing.assembler()?;
        let currency = config.pricing.currency()?;

        let pool = database::connect(&config.database.database_url)
            .await
            .map_err(AppInitError::Database)?;

        let db = Db::new(pool);

        Ok(Self {
            sellers: Arc::new(PgSellersService::new(db.clone())),
            products: Arc::new(PgProductsService::new(db.clone())),
            coupons: Arc::new(PgCouponsService::new(db.clone())),
            carts: Arc::new(PgCartsService::new(db.clone())),
            wallets: Arc::new(PgWalletsService::new(db.clone())),
            orders: Arc::new(PgOrdersService::new(
                db.clone(),
                assembler,
                Arc::new(LoggingNotifier),
            )),
            returns: Arc::new(PgReturnsService::new(db.clone())),
            disputes: Arc::new(PgDisputesService::new(db.clone())),
            payments: Arc::new(PgPaymentsService::new(
                db,
                Arc::new(HttpPaymentGateway::new(config.gateway.http())),
                currency,
            )),
        })
    }
}
