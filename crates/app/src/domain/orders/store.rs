//! Order store
//!
//! Loading and saving placed orders together with their sub-orders and the
//! side effects of lifecycle transitions. Shared by the orders, returns,
//! disputes and payments services.

use bazaar::{
    ids::{SellerUuid, UserUuid},
    orders::{Order, OrderUuid, StockRestore, SubOrderUuid},
};
use jiff::Timestamp;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use crate::domain::{
    coupons::ledger::CouponLedger,
    orders::{
        errors::OrdersServiceError,
        repositories::{PgOrdersRepository, PgSubOrdersRepository},
    },
    products::repository::PgProductsRepository,
    wallets::{records::WalletTransactionKind, repository::PgWalletsRepository},
};

/// What a lifecycle transition left for the store to write besides the order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Effects {
    /// Stock to put back on sale.
    pub(crate) restocks: Vec<StockRestore>,

    /// Amount to credit to the buyer's wallet.
    pub(crate) refund: u64,

    /// Give back one use of every coupon the order redeemed.
    pub(crate) restore_coupons: bool,
}

impl Effects {
    pub(crate) fn restock(restocks: Vec<StockRestore>) -> Self {
        Self {
            restocks,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct OrderStore {
    pub(crate) orders: PgOrdersRepository,
    pub(crate) sub_orders: PgSubOrdersRepository,
    products: PgProductsRepository,
    wallets: PgWalletsRepository,
    ledger: CouponLedger,
}

impl OrderStore {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            orders: PgOrdersRepository::new(),
            sub_orders: PgSubOrdersRepository::new(),
            products: PgProductsRepository::new(),
            wallets: PgWalletsRepository::new(),
            ledger: CouponLedger::new(),
        }
    }

    /// Read and row-lock `order`.
    pub(crate) async fn lock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        Ok(self.orders.lock_order(tx, order).await?)
    }

    /// Read and row-lock `order` on behalf of its buyer. Someone else's order
    /// is reported as missing.
    pub(crate) async fn lock_owned(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let order = self.lock(tx, order).await?;

        if order.user != user {
            return Err(OrdersServiceError::NotFound);
        }

        Ok(order)
    }

    /// Persist `order` and bring its sub-orders in line with it.
    pub(crate) async fn save(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &mut Order,
    ) -> Result<(), OrdersServiceError> {
        order.recompute_totals()?;

        self.orders.update_order(tx, order).await?;

        for mut sub_order in self.sub_orders.lock_sub_orders(tx, order.uuid).await? {
            sub_order.sync_from(order);
            sub_order.recompute_totals()?;

            self.sub_orders.update_sub_order(tx, &sub_order).await?;
        }

        Ok(())
    }

    /// Persist `order` and write the side effects of the transition that
    /// changed it.
    pub(crate) async fn apply(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &mut Order,
        effects: &Effects,
        now: Timestamp,
    ) -> Result<(), OrdersServiceError> {
        self.save(tx, order).await?;
        self.restock(tx, &effects.restocks).await?;
        self.refund_to_wallet(tx, order.user, effects.refund, order.uuid, now)
            .await?;

        if effects.restore_coupons {
            self.restore_coupons(tx, order).await?;
        }

        Ok(())
    }

    /// Put stock back on sale. Products deleted since the order are skipped.
    pub(crate) async fn restock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        restocks: &[StockRestore],
    ) -> Result<(), OrdersServiceError> {
        for restore in restocks.iter().filter(|restore| restore.quantity > 0) {
            let rows_affected = self
                .products
                .restock(tx, restore.product, restore.quantity)
                .await?;

            debug!(
                product_uuid = %restore.product,
                quantity = restore.quantity,
                restocked = rows_affected > 0,
                "restocked product"
            );
        }

        Ok(())
    }

    /// The sub-order `seller` fulfils within `order`, if any.
    pub(crate) async fn sub_order_for(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        seller: SellerUuid,
    ) -> Result<Option<SubOrderUuid>, OrdersServiceError> {
        let sub_orders = self.sub_orders.list_sub_orders(tx, order).await?;

        Ok(sub_orders
            .into_iter()
            .find(|sub_order| sub_order.seller == seller)
            .map(|sub_order| sub_order.uuid))
    }

    /// Credit `amount` to `user`'s wallet. Nothing is written for zero.
    pub(crate) async fn refund_to_wallet(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        amount: u64,
        order: OrderUuid,
        now: Timestamp,
    ) -> Result<(), OrdersServiceError> {
        if amount == 0 {
            return Ok(());
        }

        self.wallets
            .credit(tx, user, WalletTransactionKind::Refund, amount, Some(order), now)
            .await?;

        Ok(())
    }

    /// Give back one use of each coupon `order` redeemed.
    pub(crate) async fn restore_coupons(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<(), OrdersServiceError> {
        for applied in &order.applied_coupons {
            let restored = self.ledger.restore(tx, applied.coupon, order.user).await?;

            debug!(code = %applied.code, restored, "restored coupon usage");
        }

        Ok(())
    }
}
