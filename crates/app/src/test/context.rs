//! Test context for service-level integration tests.

use std::sync::Arc;

use bazaar::orders::{FlatCommission, FreeShipping, NoTax, OrderAssembler};

use crate::{
    database::Db,
    domain::{
        carts::PgCartsService, coupons::PgCouponsService, disputes::PgDisputesService,
        orders::PgOrdersService, products::PgProductsService, returns::PgReturnsService,
        sellers::PgSellersService, wallets::PgWalletsService,
    },
    notifier::LoggingNotifier,
};

use super::db::TestDb;

/// Every service over one fresh database. Orders are assembled with no tax,
/// free shipping and no commission so totals are easy to read.
///
/// Payments need a gateway, so tests build that service themselves.
pub(crate) struct TestContext {
    pub db: Db,
    pub sellers: PgSellersService,
    pub products: PgProductsService,
    pub coupons: PgCouponsService,
    pub carts: PgCartsService,
    pub wallets: PgWalletsService,
    pub orders: PgOrdersService,
    pub returns: PgReturnsService,
    pub disputes: PgDisputesService,
    _test_db: TestDb,
}

impl TestContext {
    pub(crate) async fn new() -> Self {
        let test_db = TestDb::new().await;
        let db = Db::new(test_db.pool.clone());

        Self {
            sellers: PgSellersService::new(db.clone()),
            products: PgProductsService::new(db.clone()),
            coupons: PgCouponsService::new(db.clone()),
            carts: PgCartsService::new(db.clone()),
            wallets: PgWalletsService::new(db.clone()),
            orders: PgOrdersService::new(
                db.clone(),
                OrderAssembler::new(
                    Arc::new(NoTax),
                    Arc::new(FreeShipping),
                    Arc::new(FlatCommission::default()),
                ),
                Arc::new(LoggingNotifier),
            ),
            returns: PgReturnsService::new(db.clone()),
            disputes: PgDisputesService::new(db.clone()),
            db,
            _test_db: test_db,
        }
    }
}
