//! Carts service.

use async_trait::async_trait;
use bazaar::{
    catalog::{CatalogError, ProductUuid, price_lines},
    coupons::{Coupon, CouponError, eligibility::check_eligibility, evaluate},
    ids::{SellerUuid, UserUuid},
};
use jiff::Timestamp;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::info;

use crate::{
    database::Db,
    domain::{
        carts::{
            data::NewCartItem,
            errors::CartsServiceError,
            records::CartRecord,
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        coupons::ledger::CouponLedger,
        products::repository::PgProductsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    carts_repository: PgCartsRepository,
    items_repository: PgCartItemsRepository,
    products_repository: PgProductsRepository,
    ledger: CouponLedger,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            carts_repository: PgCartsRepository::new(),
            items_repository: PgCartItemsRepository::new(),
            products_repository: PgProductsRepository::new(),
            ledger: CouponLedger::new(),
        }
    }

    async fn load_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<CartRecord, CartsServiceError> {
        let mut cart = self.carts_repository.upsert_cart(tx, user).await?;

        cart.items = self.items_repository.get_cart_items(tx, cart.uuid).await?;

        Ok(cart)
    }

    /// Check `quantity` units of `product` can be bought, returning its seller
    /// and current price.
    async fn check_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u64,
    ) -> Result<(SellerUuid, u64), CartsServiceError> {
        let snapshots = self.products_repository.lock_snapshots(tx, &[product]).await?;

        let snapshot = snapshots
            .get(&product)
            .ok_or(CatalogError::ProductNotFound(product))?;

        let seller = snapshot.check_available(quantity)?;

        Ok((seller, snapshot.price))
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn get_cart(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.add_item",
        skip(self, item),
        fields(user_uuid = %user, product_uuid = %item.product, quantity = item.quantity),
        err
    )]
    async fn add_item(
        &self,
        user: UserUuid,
        item: NewCartItem,
    ) -> Result<CartRecord, CartsServiceError> {
        if item.quantity == 0 {
            return Err(CatalogError::InvalidQuantity(item.product).into());
        }

        let mut tx = self.db.begin().await?;

        let cart = self.load_cart(&mut tx, user).await?;

        let in_cart = cart
            .items
            .iter()
            .filter(|line| line.product == item.product)
            .map(|line| line.quantity)
            .sum::<u64>();

        let (seller, price) = self
            .check_product(&mut tx, item.product, in_cart.saturating_add(item.quantity))
            .await?;

        self.items_repository
            .upsert_cart_item(&mut tx, cart.uuid, item.product, seller, item.quantity, price)
            .await?;

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, items = cart.items.len(), "added item to cart");

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.update_item",
        skip(self),
        fields(user_uuid = %user, product_uuid = %product),
        err
    )]
    async fn update_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: u64,
    ) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.load_cart(&mut tx, user).await?;

        if !cart.items.iter().any(|item| item.product == product) {
            return Err(CartsServiceError::NotFound);
        }

        let (_, price) = self.check_product(&mut tx, product, quantity).await?;

        self.items_repository
            .update_cart_item(&mut tx, cart.uuid, product, quantity, price)
            .await?;

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, "updated cart item");

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.remove_item",
        skip(self),
        fields(user_uuid = %user, product_uuid = %product),
        err
    )]
    async fn remove_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
    ) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.carts_repository.upsert_cart(&mut tx, user).await?;

        let rows_affected = self
            .items_repository
            .delete_cart_item(&mut tx, cart.uuid, product)
            .await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::NotFound);
        }

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, "removed cart item");

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.clear_cart",
        skip(self),
        fields(user_uuid = %user),
        err
    )]
    async fn clear_cart(&self, user: UserUuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.carts_repository.upsert_cart(&mut tx, user).await?;

        self.items_repository
            .clear_cart_items(&mut tx, cart.uuid)
            .await?;

        self.carts_repository
            .set_cart_coupon(&mut tx, cart.uuid, None)
            .await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, "cleared cart");

        Ok(())
    }

    #[tracing::instrument(
        name = "carts.service.apply_cart_coupon",
        skip(self, code),
        fields(user_uuid = %user),
        err
    )]
    async fn apply_cart_coupon(
        &self,
        user: UserUuid,
        code: String,
    ) -> Result<CartRecord, CartsServiceError> {
        let code = Coupon::normalize_code(&code);

        if code.is_empty() {
            return Err(CartsServiceError::Coupons(CouponError::NoCodes.into()));
        }

        let mut tx = self.db.begin().await?;

        let cart = self.load_cart(&mut tx, user).await?;

        let products: Vec<ProductUuid> = cart.items.iter().map(|item| item.product).collect();

        let snapshots = self
            .products_repository
            .lock_snapshots(&mut tx, &products)
            .await?;

        let priced = price_lines(&cart.lines(), &snapshots)?;

        let coupon = self.ledger.get(&mut tx, &code).await?;

        check_eligibility(&coupon, user, Timestamp::now())
            .and_then(|()| evaluate(&coupon, &priced))
            .map_err(|error| CartsServiceError::Coupons(error.into()))?;

        self.carts_repository
            .set_cart_coupon(&mut tx, cart.uuid, Some(&coupon.code))
            .await?;

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, code = %coupon.code, "applied coupon to cart");

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.remove_cart_coupon",
        skip(self),
        fields(user_uuid = %user),
        err
    )]
    async fn remove_cart_coupon(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.carts_repository.upsert_cart(&mut tx, user).await?;

        self.carts_repository
            .set_cart_coupon(&mut tx, cart.uuid, None)
            .await?;

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        Ok(cart)
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve the user's cart, creating an empty one on first use.
    async fn get_cart(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError>;

    /// Adds units of a product, merging with any existing line for it.
    async fn add_item(
        &self,
        user: UserUuid,
        item: NewCartItem,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Sets the quantity of a product already in the cart.
    async fn update_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: u64,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Removes a product from the cart.
    async fn remove_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Empties the cart and drops its coupon.
    async fn clear_cart(&self, user: UserUuid) -> Result<(), CartsServiceError>;

    /// Attaches a coupon code after checking it applies to the cart as it
    /// stands. No usage is recorded until checkout.
    async fn apply_cart_coupon(
        &self,
        user: UserUuid,
        code: String,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Detaches the cart's coupon code.
    async fn remove_cart_coupon(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError>;
}
