//! Orders service.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bazaar::{
    catalog::{CartLine, ProductUuid, price_lines},
    coupons::calculate,
    ids::{SellerUuid, UserUuid},
    orders::{
        ItemAddress, ItemStatus, Order, OrderAssembler, OrderDraft, OrderItemUuid, OrderStatus,
        OrderUuid, PaymentMethod, ShippingAddress, SubOrder, split_by_seller,
    },
};
use jiff::Timestamp;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::{Span, info, warn};

use crate::{
    database::Db,
    domain::{
        carts::repositories::{PgCartItemsRepository, PgCartsRepository},
        coupons::{CouponsServiceError, ledger::CouponLedger},
        orders::{
            data::{BuyNowRequest, CheckoutRequest, checkout_codes},
            errors::OrdersServiceError,
            store::{Effects, OrderStore},
        },
        products::repository::PgProductsRepository,
    },
    notifier::OrderNotifier,
};

/// Everything checkout needs once the lines and codes are known.
struct Placement<'a> {
    user: UserUuid,
    lines: &'a [CartLine],
    codes: &'a [String],
    shipping_address: ShippingAddress,
    item_addresses: Vec<ItemAddress>,
    notes: Option<String>,
    payment_method: PaymentMethod,
}

#[derive(Clone)]
pub struct PgOrdersService {
    db: Db,
    assembler: OrderAssembler,
    notifier: Arc<dyn OrderNotifier>,
    store: OrderStore,
    products_repository: PgProductsRepository,
    carts_repository: PgCartsRepository,
    cart_items_repository: PgCartItemsRepository,
    ledger: CouponLedger,
}

impl fmt::Debug for PgOrdersService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgOrdersService")
            .field("db", &self.db)
            .field("assembler", &self.assembler)
            .finish_non_exhaustive()
    }
}

impl PgOrdersService {
    #[must_use]
    pub fn new(db: Db, assembler: OrderAssembler, notifier: Arc<dyn OrderNotifier>) -> Self {
        Self {
            db,
            assembler,
            notifier,
            store: OrderStore::new(),
            products_repository: PgProductsRepository::new(),
            carts_repository: PgCartsRepository::new(),
            cart_items_repository: PgCartItemsRepository::new(),
            ledger: CouponLedger::new(),
        }
    }

    /// Price, discount, assemble and persist an order inside `tx`, taking its
    /// stock and coupon uses with it.
    ///
    /// Locks are taken products first, then coupons, each in a stable order.
    async fn place(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        placement: Placement<'_>,
        now: Timestamp,
    ) -> Result<(Order, Vec<SubOrder>), OrdersServiceError> {
        let user = placement.user;
        let products: Vec<ProductUuid> = placement.lines.iter().map(|line| line.product).collect();

        let snapshots = self.products_repository.lock_snapshots(tx, &products).await?;

        let priced = price_lines(placement.lines, &snapshots).inspect_err(|error| {
            warn!(user_uuid = %user, %error, "checkout rejected by catalog");
        })?;

        let coupons = self.ledger.lock(tx, placement.codes).await?;

        let discounts = calculate(&coupons, &priced, user, now)
            .inspect_err(|error| {
                warn!(user_uuid = %user, %error, "checkout rejected by coupon");
            })
            .map_err(CouponsServiceError::from)?;

        let order = self.assembler.assemble(
            OrderDraft {
                uuid: OrderUuid::new(),
                user,
                payment_method: placement.payment_method,
                shipping_address: placement.shipping_address,
                item_addresses: placement.item_addresses,
                notes: placement.notes,
                placed_at: now,
            },
            &priced,
            &discounts,
        )?;

        let sub_orders = split_by_seller(&order, self.assembler.commission())?;

        self.store.orders.insert_order(tx, &order).await?;

        for sub_order in &sub_orders {
            self.store.sub_orders.insert_sub_order(tx, sub_order).await?;
        }

        for line in &priced {
            let remaining = self
                .products_repository
                .decrement_stock(tx, line.product, line.quantity)
                .await?;

            if remaining.is_none() {
                warn!(product_uuid = %line.product, "stock exhausted at write time");

                return Err(OrdersServiceError::StockExhausted(line.product));
            }
        }

        self.ledger
            .redeem(tx, &discounts.applications, user, now)
            .await?;

        Ok((order, sub_orders))
    }

    /// Commit `tx`, then announce the order.
    async fn finish_placement(
        &self,
        tx: Transaction<'_, Postgres>,
        order: Order,
        sub_orders: &[SubOrder],
    ) -> Result<Order, OrdersServiceError> {
        tx.commit().await?;

        Span::current().record("order_uuid", order.uuid.to_string().as_str());

        info!(
            order_uuid = %order.uuid,
            sub_orders = sub_orders.len(),
            total_amount = order.totals.total_amount,
            discounts = order.totals.discounts,
            "placed order"
        );

        self.notifier.order_placed(&order).await;

        Ok(order)
    }

    /// Lock `order`, run `transition` on it and persist the result with its
    /// side effects.
    async fn transition<F>(&self, order: OrderUuid, transition: F) -> Result<Order, OrdersServiceError>
    where
        F: FnOnce(&mut Order, Timestamp) -> Result<Effects, OrdersServiceError> + Send,
    {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let mut locked = self.store.lock(&mut tx, order).await?;

        let effects = transition(&mut locked, now)?;

        self.store.apply(&mut tx, &mut locked, &effects, now).await?;

        tx.commit().await?;

        Ok(locked)
    }
}

#[async_trait]
impl OrdersService for PgOrdersService {
    #[tracing::instrument(
        name = "orders.service.create_order_from_cart",
        skip(self, request),
        fields(user_uuid = %user, order_uuid = tracing::field::Empty),
        err
    )]
    async fn create_order_from_cart(
        &self,
        user: UserUuid,
        request: CheckoutRequest,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let cart = self.carts_repository.upsert_cart(&mut tx, user).await?;
        let items = self
            .cart_items_repository
            .get_cart_items(&mut tx, cart.uuid)
            .await?;

        if items.is_empty() {
            return Err(OrdersServiceError::EmptyCart);
        }

        let lines: Vec<CartLine> = items
            .iter()
            .map(|item| CartLine {
                product: item.product,
                quantity: item.quantity,
                price: Some(item.price),
            })
            .collect();

        let codes = checkout_codes(&request.coupon_codes, cart.coupon_code.as_deref())
            .map_err(CouponsServiceError::from)?;

        let (order, sub_orders) = self
            .place(
                &mut tx,
                Placement {
                    user,
                    lines: &lines,
                    codes: &codes,
                    shipping_address: request.shipping_address,
                    item_addresses: request.item_addresses,
                    notes: request.notes,
                    payment_method: request.payment_method,
                },
                now,
            )
            .await?;

        self.cart_items_repository
            .clear_cart_items(&mut tx, cart.uuid)
            .await?;
        self.carts_repository
            .set_cart_coupon(&mut tx, cart.uuid, None)
            .await?;

        self.finish_placement(tx, order, &sub_orders).await
    }

    #[tracing::instrument(
        name = "orders.service.buy_now",
        skip(self, request),
        fields(
            user_uuid = %user,
            product_uuid = %request.product,
            quantity = request.quantity,
            order_uuid = tracing::field::Empty
        ),
        err
    )]
    async fn buy_now(
        &self,
        user: UserUuid,
        request: BuyNowRequest,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let lines = [CartLine {
            product: request.product,
            quantity: request.quantity,
            price: None,
        }];

        let codes = checkout_codes(&request.coupon_codes, None).map_err(CouponsServiceError::from)?;

        let mut tx = self.db.begin().await?;

        let (order, sub_orders) = self
            .place(
                &mut tx,
                Placement {
                    user,
                    lines: &lines,
                    codes: &codes,
                    shipping_address: request.shipping_address,
                    item_addresses: Vec::new(),
                    notes: request.notes,
                    payment_method: request.payment_method,
                },
                now,
            )
            .await?;

        self.finish_placement(tx, order, &sub_orders).await
    }

    async fn get_order(&self, order: OrderUuid) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let found = self.store.orders.get_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(found)
    }

    async fn list_orders(&self, user: UserUuid) -> Result<Vec<Order>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let orders = self.store.orders.list_user_orders(&mut tx, user).await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn list_all_orders(&self) -> Result<Vec<Order>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let orders = self.store.orders.list_all_orders(&mut tx).await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn list_sub_orders(&self, order: OrderUuid) -> Result<Vec<SubOrder>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let sub_orders = self.store.sub_orders.list_sub_orders(&mut tx, order).await?;

        tx.commit().await?;

        Ok(sub_orders)
    }

    async fn list_seller_sub_orders(
        &self,
        seller: SellerUuid,
    ) -> Result<Vec<SubOrder>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let sub_orders = self
            .store
            .sub_orders
            .list_seller_sub_orders(&mut tx, seller)
            .await?;

        tx.commit().await?;

        Ok(sub_orders)
    }

    #[tracing::instrument(
        name = "orders.service.cancel_order",
        skip(self, reason),
        fields(user_uuid = %user, order_uuid = %order),
        err
    )]
    async fn cancel_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
        reason: Option<String>,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let mut locked = self.store.lock_owned(&mut tx, user, order).await?;

        let effects = Effects {
            restocks: locked.cancel(reason, now)?,
            refund: 0,
            restore_coupons: true,
        };

        self.store.apply(&mut tx, &mut locked, &effects, now).await?;

        tx.commit().await?;

        info!(order_uuid = %order, restocked = effects.restocks.len(), "cancelled order");

        Ok(locked)
    }

    #[tracing::instrument(
        name = "orders.service.cancel_item",
        skip(self),
        fields(seller_uuid = %seller, order_uuid = %order, item_uuid = %item),
        err
    )]
    async fn cancel_item(
        &self,
        seller: SellerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<Order, OrdersServiceError> {
        let updated = self
            .transition(order, |locked, now| {
                let restore = locked.cancel_item(item, seller, now)?;

                Ok(Effects::restock(vec![restore]))
            })
            .await?;

        info!(order_uuid = %order, item_uuid = %item, "cancelled order item");

        Ok(updated)
    }

    #[tracing::instrument(
        name = "orders.service.update_item_status",
        skip(self, tracking),
        fields(seller_uuid = %seller, order_uuid = %order, item_uuid = %item, status = %status),
        err
    )]
    async fn update_item_status(
        &self,
        seller: SellerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        status: ItemStatus,
        tracking: Option<String>,
    ) -> Result<Order, OrdersServiceError> {
        let updated = self
            .transition(order, |locked, now| {
                locked.update_item_status(item, seller, status, tracking, now)?;

                Ok(Effects::default())
            })
            .await?;

        info!(order_uuid = %order, item_uuid = %item, status = %status, "updated order item");

        Ok(updated)
    }

    #[tracing::instrument(
        name = "orders.service.add_tracking",
        skip(self, tracking),
        fields(seller_uuid = %seller, order_uuid = %order, shipped = tracing::field::Empty),
        err
    )]
    async fn add_tracking(
        &self,
        seller: SellerUuid,
        order: OrderUuid,
        tracking: String,
    ) -> Result<Order, OrdersServiceError> {
        let updated = self
            .transition(order, |locked, now| {
                let shipped = locked.add_tracking(seller, &tracking, now)?;

                Span::current().record("shipped", shipped);

                Ok(Effects::default())
            })
            .await?;

        info!(order_uuid = %order, "added tracking number");

        Ok(updated)
    }

    #[tracing::instrument(
        name = "orders.service.confirm_payment_collection",
        skip(self),
        fields(seller_uuid = %seller, order_uuid = %order, item_uuid = %item),
        err
    )]
    async fn confirm_payment_collection(
        &self,
        seller: SellerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<Order, OrdersServiceError> {
        let updated = self
            .transition(order, |locked, now| {
                locked.confirm_payment_collection(item, seller, now)?;

                Ok(Effects::default())
            })
            .await?;

        info!(
            order_uuid = %order,
            payment_status = updated.payment_status.as_str(),
            "confirmed payment collection"
        );

        Ok(updated)
    }

    #[tracing::instrument(
        name = "orders.service.confirm_delivery",
        skip(self),
        fields(user_uuid = %user, order_uuid = %order),
        err
    )]
    async fn confirm_delivery(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let mut locked = self.store.lock_owned(&mut tx, user, order).await?;

        locked.confirm_delivery(now)?;

        self.store.save(&mut tx, &mut locked).await?;

        tx.commit().await?;

        info!(order_uuid = %order, "confirmed delivery");

        Ok(locked)
    }

    #[tracing::instrument(
        name = "orders.service.refund_order",
        skip(self, reason),
        fields(order_uuid = %order, refunded_amount = tracing::field::Empty),
        err
    )]
    async fn refund_order(
        &self,
        order: OrderUuid,
        reason: Option<String>,
    ) -> Result<Order, OrdersServiceError> {
        let updated = self
            .transition(order, |locked, now| {
                let outcome = locked.refund(reason, now)?;

                Span::current().record("refunded_amount", outcome.refunded_amount);

                Ok(Effects {
                    restocks: outcome.restocks,
                    refund: outcome.refunded_amount,
                    restore_coupons: true,
                })
            })
            .await?;

        info!(order_uuid = %order, "refunded order");

        Ok(updated)
    }

    #[tracing::instrument(
        name = "orders.service.update_order_status",
        skip(self),
        fields(order_uuid = %order, status = %status),
        err
    )]
    async fn update_order_status(
        &self,
        order: OrderUuid,
        status: OrderStatus,
    ) -> Result<Order, OrdersServiceError> {
        let updated = self
            .transition(order, |locked, now| {
                let restocks = locked.admin_set_status(status, now)?;

                Ok(Effects {
                    restocks,
                    refund: 0,
                    restore_coupons: status == OrderStatus::Cancelled,
                })
            })
            .await?;

        info!(order_uuid = %order, status = %status, "overrode order status");

        Ok(updated)
    }

    #[tracing::instrument(
        name = "orders.service.delete_order",
        skip(self),
        fields(order_uuid = %order, restocked),
        err
    )]
    async fn delete_order(&self, order: OrderUuid) -> Result<(), OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let locked = self.store.orders.lock_order(&mut tx, order).await?;

        let restocks = locked.deletion_restocks();

        self.store.restock(&mut tx, &restocks).await?;

        let rows_affected = self.store.orders.delete_order(&mut tx, order).await?;

        if rows_affected == 0 {
            return Err(OrdersServiceError::NotFound);
        }

        tx.commit().await?;

        Span::current().record("restocked", restocks.len());

        info!(order_uuid = %order, restocked = restocks.len(), "deleted order");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Places an order for everything in the buyer's cart, then empties it.
    ///
    /// The cart's coupon is redeemed along with any codes in the request.
    /// Nothing is written unless every product, coupon and stock update
    /// succeeds.
    async fn create_order_from_cart(
        &self,
        user: UserUuid,
        request: CheckoutRequest,
    ) -> Result<Order, OrdersServiceError>;

    /// Places an order for a single product without touching the cart.
    async fn buy_now(&self, user: UserUuid, request: BuyNowRequest)
    -> Result<Order, OrdersServiceError>;

    /// Retrieve a single order.
    async fn get_order(&self, order: OrderUuid) -> Result<Order, OrdersServiceError>;

    /// Lists a buyer's orders, newest first.
    async fn list_orders(&self, user: UserUuid) -> Result<Vec<Order>, OrdersServiceError>;

    /// Lists every order, newest first.
    async fn list_all_orders(&self) -> Result<Vec<Order>, OrdersServiceError>;

    /// Lists the per-seller parts of an order.
    async fn list_sub_orders(&self, order: OrderUuid) -> Result<Vec<SubOrder>, OrdersServiceError>;

    /// Lists a seller's sub-orders, newest first.
    async fn list_seller_sub_orders(
        &self,
        seller: SellerUuid,
    ) -> Result<Vec<SubOrder>, OrdersServiceError>;

    /// Cancels a pending order on behalf of its buyer, restocking every item
    /// and giving back the coupons it used.
    async fn cancel_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
        reason: Option<String>,
    ) -> Result<Order, OrdersServiceError>;

    /// Cancels one of a seller's pending items and restocks it.
    async fn cancel_item(
        &self,
        seller: SellerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Moves one of a seller's items forward.
    async fn update_item_status(
        &self,
        seller: SellerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        status: ItemStatus,
        tracking: Option<String>,
    ) -> Result<Order, OrdersServiceError>;

    /// Ships every pending or processing item of a seller under one
    /// tracking number.
    async fn add_tracking(
        &self,
        seller: SellerUuid,
        order: OrderUuid,
        tracking: String,
    ) -> Result<Order, OrdersServiceError>;

    /// Records cash collected on delivery for one item.
    async fn confirm_payment_collection(
        &self,
        seller: SellerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Buyer confirms everything arrived, releasing escrow.
    async fn confirm_delivery(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Refunds an order in full to the buyer's wallet.
    async fn refund_order(
        &self,
        order: OrderUuid,
        reason: Option<String>,
    ) -> Result<Order, OrdersServiceError>;

    /// Overrides an order's status. Cancelled and refunded orders stay as
    /// they are.
    async fn update_order_status(
        &self,
        order: OrderUuid,
        status: OrderStatus,
    ) -> Result<Order, OrdersServiceError>;

    /// Deletes an order with its sub-orders, returns, disputes and payments,
    /// putting stock for items still outstanding back on sale.
    async fn delete_order(&self, order: OrderUuid) -> Result<(), OrdersServiceError>;
}

#[cfg(all(test, feature = "docker-tests"))]
mod tests {
    use bazaar::{
        ErrorKind,
        catalog::CatalogError,
        coupons::{CouponDiscount, CouponError},
        orders::{EscrowStatus, PaymentCollectionStatus, PaymentStatus},
    };
    use testresult::TestResult;

    use crate::{
        config::PricingConfig,
        domain::{
            carts::{CartsService, data::NewCartItem},
            coupons::CouponsService,
            products::ProductsService,
            wallets::WalletsService,
        },
        notifier::MockOrderNotifier,
        test::{
            TestContext,
            helpers::{create_product, create_seller, new_coupon, shipping_address},
        },
    };

    use super::*;

    fn checkout(codes: &[&str]) -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: shipping_address(),
            item_addresses: Vec::new(),
            coupon_codes: codes.iter().map(ToString::to_string).collect(),
            notes: None,
            payment_method: PaymentMethod::Cod,
        }
    }

    fn buy(product: ProductUuid, quantity: u64, codes: &[&str]) -> BuyNowRequest {
        BuyNowRequest {
            product,
            quantity,
            shipping_address: shipping_address(),
            coupon_codes: codes.iter().map(ToString::to_string).collect(),
            notes: None,
            payment_method: PaymentMethod::Cod,
        }
    }

    async fn add_to_cart(
        ctx: &TestContext,
        user: UserUuid,
        product: ProductUuid,
        quantity: u64,
    ) -> TestResult {
        ctx.carts
            .add_item(user, NewCartItem { product, quantity })
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn checkout_splits_by_seller_and_empties_the_cart() -> TestResult {
        let ctx = TestContext::new().await;
        let first_seller = create_seller(&ctx, true).await?;
        let second_seller = create_seller(&ctx, true).await?;
        let kurta = create_product(&ctx, first_seller, 2_000, 5).await?;
        let shawl = create_product(&ctx, second_seller, 3_000, 5).await?;
        let user = UserUuid::new();

        add_to_cart(&ctx, user, kurta, 2).await?;
        add_to_cart(&ctx, user, shawl, 1).await?;

        let order = ctx.orders.create_order_from_cart(user, checkout(&[])).await?;

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.totals.merchandise_subtotal, 7_000);
        assert_eq!(order.totals.total_amount, 7_000);
        assert_eq!(order.order_status, OrderStatus::Pending);

        let sub_orders = ctx.orders.list_sub_orders(order.uuid).await?;

        assert_eq!(sub_orders.len(), 2);
        assert_eq!(
            sub_orders.iter().map(|s| s.totals.total_amount).sum::<u64>(),
            order.totals.total_amount
        );

        assert_eq!(ctx.products.get_product(kurta).await?.quantity, 3);
        assert_eq!(ctx.products.get_product(shawl).await?.quantity, 4);
        assert!(ctx.carts.get_cart(user).await?.is_empty());

        let stored = ctx.orders.get_order(order.uuid).await?;

        assert_eq!(stored, order);

        Ok(())
    }

    #[tokio::test]
    async fn empty_cart_cannot_be_checked_out() {
        let ctx = TestContext::new().await;

        let result = ctx
            .orders
            .create_order_from_cart(UserUuid::new(), checkout(&[]))
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::EmptyCart)),
            "expected EmptyCart, got {result:?}"
        );
    }

    #[tokio::test]
    async fn cart_coupon_is_redeemed_at_checkout() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 10_000, 5).await?;
        let user = UserUuid::new();

        ctx.coupons
            .create_coupon(new_coupon("EID10", CouponDiscount::PercentageOff { percentage: 10 }))
            .await?;

        add_to_cart(&ctx, user, product, 1).await?;
        ctx.carts.apply_cart_coupon(user, "eid10".to_string()).await?;

        let order = ctx.orders.create_order_from_cart(user, checkout(&[])).await?;

        assert_eq!(order.totals.discounts, 1_000);
        assert_eq!(order.totals.total_amount, 9_000);
        assert_eq!(order.applied_coupons.len(), 1);

        let coupon = ctx.coupons.get_coupon_by_code("EID10".to_string()).await?;

        assert_eq!(coupon.used_count, 1);
        assert_eq!(ctx.carts.get_cart(user).await?.coupon_code, None);

        Ok(())
    }

    #[tokio::test]
    async fn failing_coupon_leaves_stock_untouched() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 1_000, 5).await?;

        let mut coupon = new_coupon("BIGSPEND", CouponDiscount::FixedAmountOff { amount: 500 });
        coupon.min_cart_value = 50_000;
        ctx.coupons.create_coupon(coupon).await?;

        let result = ctx
            .orders
            .buy_now(UserUuid::new(), buy(product, 2, &["BIGSPEND"]))
            .await;

        assert!(
            matches!(
                result,
                Err(OrdersServiceError::Coupons(CouponsServiceError::Coupon(
                    CouponError::MinimumNotMet { .. }
                )))
            ),
            "expected MinimumNotMet, got {result:?}"
        );

        assert_eq!(ctx.products.get_product(product).await?.quantity, 5);
        assert_eq!(
            ctx.coupons
                .get_coupon_by_code("BIGSPEND".to_string())
                .await?
                .used_count,
            0
        );

        Ok(())
    }

    #[tokio::test]
    async fn buying_more_than_the_shelf_holds_is_a_conflict() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 1_000, 1).await?;

        let result = ctx.orders.buy_now(UserUuid::new(), buy(product, 2, &[])).await;

        assert!(
            matches!(
                result,
                Err(OrdersServiceError::Catalog(CatalogError::InsufficientStock { .. }))
            ),
            "expected InsufficientStock, got {result:?}"
        );
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Conflict));

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_checkouts_never_oversell() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 1_000, 3).await?;

        let (first, second) = tokio::join!(
            ctx.orders.buy_now(UserUuid::new(), buy(product, 2, &[])),
            ctx.orders.buy_now(UserUuid::new(), buy(product, 2, &[])),
        );

        let placed = [first.is_ok(), second.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count();

        assert_eq!(placed, 1, "exactly one checkout should win");
        assert_eq!(ctx.products.get_product(product).await?.quantity, 1);

        Ok(())
    }

    #[tokio::test]
    async fn buyer_cancellation_restocks_and_returns_coupons() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 2_500, 4).await?;
        let user = UserUuid::new();

        ctx.coupons
            .create_coupon(new_coupon("UNDO", CouponDiscount::FixedAmountOff { amount: 500 }))
            .await?;

        let order = ctx.orders.buy_now(user, buy(product, 3, &["UNDO"])).await?;

        assert_eq!(ctx.products.get_product(product).await?.quantity, 1);

        let stranger = ctx
            .orders
            .cancel_order(UserUuid::new(), order.uuid, None)
            .await;

        assert!(
            matches!(stranger, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {stranger:?}"
        );

        let cancelled = ctx
            .orders
            .cancel_order(user, order.uuid, Some("changed my mind".to_string()))
            .await?;

        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("changed my mind"));
        assert_eq!(ctx.products.get_product(product).await?.quantity, 4);

        let coupon = ctx.coupons.get_coupon_by_code("UNDO".to_string()).await?;

        assert_eq!(coupon.used_count, 0);
        assert_eq!(coupon.uses_by(user), 0);

        let sub_orders = ctx.orders.list_sub_orders(order.uuid).await?;

        assert!(sub_orders.iter().all(|s| s.status == OrderStatus::Cancelled));

        Ok(())
    }

    #[tokio::test]
    async fn cod_order_runs_to_completion() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 4_000, 2).await?;
        let user = UserUuid::new();

        let order = ctx.orders.buy_now(user, buy(product, 1, &[])).await?;
        let item = order.items.first().map(|item| item.uuid).ok_or("no item")?;

        let shipped = ctx
            .orders
            .add_tracking(seller, order.uuid, "TCS-123".to_string())
            .await?;

        assert_eq!(shipped.order_status, OrderStatus::Processing);

        ctx.orders
            .update_item_status(seller, order.uuid, item, ItemStatus::Delivered, None)
            .await?;

        let collected = ctx
            .orders
            .confirm_payment_collection(seller, order.uuid, item)
            .await?;

        assert_eq!(collected.payment_status, PaymentStatus::Paid);
        assert_eq!(
            collected.item(item).map(|i| i.payment_collection_status),
            Some(PaymentCollectionStatus::Collected)
        );

        let confirmed = ctx.orders.confirm_delivery(user, order.uuid).await?;

        assert_eq!(confirmed.order_status, OrderStatus::Completed);
        assert!(confirmed.delivery_confirmed_at.is_some());

        let sub_orders = ctx.orders.list_seller_sub_orders(seller).await?;

        assert_eq!(sub_orders.len(), 1);
        assert_eq!(
            sub_orders.first().map(|s| s.status),
            Some(OrderStatus::Completed)
        );
        assert!(
            confirmed
                .items
                .iter()
                .all(|i| i.escrow_status == EscrowStatus::NotApplicable)
        );

        Ok(())
    }

    #[tokio::test]
    async fn seller_cannot_touch_another_sellers_item() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let other = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 1_000, 2).await?;

        let order = ctx.orders.buy_now(UserUuid::new(), buy(product, 1, &[])).await?;
        let item = order.items.first().map(|item| item.uuid).ok_or("no item")?;

        let result = ctx.orders.cancel_item(other, order.uuid, item).await;

        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::NotFound));
        assert_eq!(ctx.products.get_product(product).await?.quantity, 1);

        let cancelled = ctx.orders.cancel_item(seller, order.uuid, item).await?;

        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        assert_eq!(ctx.products.get_product(product).await?.quantity, 2);

        Ok(())
    }

    #[tokio::test]
    async fn refund_credits_the_buyers_wallet() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 1_500, 3).await?;
        let user = UserUuid::new();

        let order = ctx.orders.buy_now(user, buy(product, 2, &[])).await?;

        let refunded = ctx
            .orders
            .refund_order(order.uuid, Some("damaged in transit".to_string()))
            .await?;

        assert_eq!(refunded.order_status, OrderStatus::Refunded);
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
        assert_eq!(ctx.products.get_product(product).await?.quantity, 3);

        let wallet = ctx.wallets.get_wallet(user).await?;

        assert_eq!(wallet.balance, 3_000);
        assert_eq!(wallet.transactions.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn admin_cancellation_restocks_once() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 1_000, 2).await?;

        let order = ctx.orders.buy_now(UserUuid::new(), buy(product, 2, &[])).await?;

        ctx.orders
            .update_order_status(order.uuid, OrderStatus::Cancelled)
            .await?;

        assert_eq!(ctx.products.get_product(product).await?.quantity, 2);

        let again = ctx
            .orders
            .update_order_status(order.uuid, OrderStatus::Cancelled)
            .await;

        assert_eq!(again.err().map(|e| e.kind()), Some(ErrorKind::Conflict));
        assert_eq!(ctx.products.get_product(product).await?.quantity, 2);

        Ok(())
    }

    #[tokio::test]
    async fn cancelled_orders_cannot_be_reopened_to_return_coupons_twice() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 2_000, 5).await?;
        let user = UserUuid::new();
        let other = UserUuid::new();

        ctx.coupons
            .create_coupon(new_coupon("ONCE", CouponDiscount::FixedAmountOff { amount: 200 }))
            .await?;

        let order = ctx.orders.buy_now(user, buy(product, 1, &["ONCE"])).await?;
        ctx.orders.buy_now(other, buy(product, 1, &["ONCE"])).await?;

        ctx.orders.cancel_order(user, order.uuid, None).await?;

        let reopened = ctx
            .orders
            .update_order_status(order.uuid, OrderStatus::Pending)
            .await;

        assert_eq!(reopened.err().map(|e| e.kind()), Some(ErrorKind::Conflict));

        let again = ctx.orders.cancel_order(user, order.uuid, None).await;

        assert_eq!(again.err().map(|e| e.kind()), Some(ErrorKind::Conflict));

        let coupon = ctx.coupons.get_coupon_by_code("ONCE".to_string()).await?;

        assert_eq!(coupon.used_count, 1);
        assert_eq!(coupon.uses_by(user), 0);
        assert_eq!(coupon.uses_by(other), 1);
        assert_eq!(ctx.products.get_product(product).await?.quantity, 4);
        assert_eq!(
            ctx.orders.get_order(order.uuid).await?.order_status,
            OrderStatus::Cancelled
        );

        Ok(())
    }

    #[tokio::test]
    async fn admin_lists_every_buyers_orders() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 1_000, 5).await?;

        let first = ctx.orders.buy_now(UserUuid::new(), buy(product, 1, &[])).await?;
        let second = ctx.orders.buy_now(UserUuid::new(), buy(product, 1, &[])).await?;

        let all: Vec<OrderUuid> = ctx
            .orders
            .list_all_orders()
            .await?
            .into_iter()
            .map(|order| order.uuid)
            .collect();

        assert_eq!(all.len(), 2);
        assert!(all.contains(&first.uuid));
        assert!(all.contains(&second.uuid));

        Ok(())
    }

    #[tokio::test]
    async fn deleting_an_order_restocks_outstanding_items() -> TestResult {
        let ctx = TestContext::new().await;
        let first_seller = create_seller(&ctx, true).await?;
        let second_seller = create_seller(&ctx, true).await?;
        let kurta = create_product(&ctx, first_seller, 2_000, 5).await?;
        let shawl = create_product(&ctx, second_seller, 3_000, 5).await?;
        let user = UserUuid::new();

        add_to_cart(&ctx, user, kurta, 2).await?;
        add_to_cart(&ctx, user, shawl, 3).await?;

        let order = ctx.orders.create_order_from_cart(user, checkout(&[])).await?;
        let kurta_item = order
            .items
            .iter()
            .find(|item| item.product == kurta)
            .map(|item| item.uuid)
            .ok_or("no kurta")?;

        ctx.orders
            .cancel_item(first_seller, order.uuid, kurta_item)
            .await?;

        assert_eq!(ctx.products.get_product(kurta).await?.quantity, 5);
        assert_eq!(ctx.products.get_product(shawl).await?.quantity, 2);

        ctx.orders.delete_order(order.uuid).await?;

        assert_eq!(ctx.products.get_product(kurta).await?.quantity, 5);
        assert_eq!(ctx.products.get_product(shawl).await?.quantity, 5);
        assert!(ctx.orders.list_sub_orders(order.uuid).await?.is_empty());
        assert!(ctx.orders.list_all_orders().await?.is_empty());

        let gone = ctx.orders.get_order(order.uuid).await;

        assert!(
            matches!(gone, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {gone:?}"
        );

        let again = ctx.orders.delete_order(order.uuid).await;

        assert!(
            matches!(again, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {again:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn placed_orders_are_announced_once() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 1_000, 2).await?;

        let mut notifier = MockOrderNotifier::new();
        notifier.expect_order_placed().times(1).return_const(());

        let service = PgOrdersService::new(
            ctx.db.clone(),
            PricingConfig::default().assembler()?,
            Arc::new(notifier),
        );

        service.buy_now(UserUuid::new(), buy(product, 1, &[])).await?;

        let rejected = service.buy_now(UserUuid::new(), buy(product, 5, &[])).await;

        assert!(rejected.is_err());

        Ok(())
    }
}
