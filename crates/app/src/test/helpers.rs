//! Test Helpers

use bazaar::{
    catalog::{CartLine, ProductStatus, ProductUuid},
    coupons::{CouponCreator, CouponDiscount, CouponScope, CouponUuid},
    ids::{AdminUuid, SellerUuid, UserUuid},
    orders::{Order, PaymentMethod, ShippingAddress},
};

use crate::{
    domain::{
        coupons::data::NewCoupon,
        orders::{OrdersService, OrdersServiceError, data::BuyNowRequest},
        products::{ProductsService, ProductsServiceError, data::NewProduct},
        sellers::{SellersService, SellersServiceError, data::NewSeller},
    },
    test::TestContext,
};

pub(crate) async fn create_seller(
    ctx: &TestContext,
    verified: bool,
) -> Result<SellerUuid, SellersServiceError> {
    let uuid = SellerUuid::new();

    ctx.sellers
        .create_seller(NewSeller {
            uuid,
            store_name: format!("Store {uuid}"),
            is_verified: verified,
        })
        .await?;

    Ok(uuid)
}

/// An approved, taxable product.
pub(crate) async fn create_product(
    ctx: &TestContext,
    seller: SellerUuid,
    price: u64,
    quantity: u64,
) -> Result<ProductUuid, ProductsServiceError> {
    let product = ctx
        .products
        .create_product(NewProduct {
            uuid: ProductUuid::new(),
            seller,
            category: None,
            name: "Lawn suit".to_string(),
            price,
            quantity,
            status: ProductStatus::Approved,
            is_taxable: true,
        })
        .await?;

    Ok(product.uuid)
}

/// An active admin coupon for the whole order, usable ten times and once per
/// buyer.
pub(crate) fn new_coupon(code: &str, discount: CouponDiscount) -> NewCoupon {
    NewCoupon {
        uuid: CouponUuid::new(),
        code: code.to_string(),
        description: None,
        discount,
        scope: CouponScope::Order,
        sellers: Vec::new(),
        applicable_products: Vec::new(),
        applicable_categories: Vec::new(),
        min_cart_value: 0,
        max_discount: None,
        max_usage: 10,
        max_usage_per_user: 1,
        stackable: false,
        max_stack_per_order: 1,
        expires_at: None,
        is_active: true,
        created_by: CouponCreator::Admin(AdminUuid::new()),
    }
}

pub(crate) fn cart_line(product: ProductUuid, quantity: u64) -> CartLine {
    CartLine {
        product,
        quantity,
        price: None,
    }
}

pub(crate) fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        full_name: Some("Ayesha Khan".to_string()),
        street: "12 Mall Road".to_string(),
        city: "Lahore".to_string(),
        state: Some("Punjab".to_string()),
        zip: "54000".to_string(),
        country: "PK".to_string(),
        phone: "+92 300 1234567".to_string(),
    }
}

/// A cash-on-delivery purchase with no coupons.
pub(crate) async fn buy_now(
    ctx: &TestContext,
    user: UserUuid,
    product: ProductUuid,
    quantity: u64,
) -> Result<Order, OrdersServiceError> {
    ctx.orders
        .buy_now(
            user,
            BuyNowRequest {
                product,
                quantity,
                shipping_address: shipping_address(),
                coupon_codes: Vec::new(),
                notes: None,
                payment_method: PaymentMethod::Cod,
            },
        )
        .await
}
