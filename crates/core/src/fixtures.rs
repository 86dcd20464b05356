//! Test fixtures

use std::sync::Arc;

use jiff::Timestamp;

use crate::{
    catalog::{PricedLine, ProductSnapshot, ProductStatus, ProductUuid, SellerSnapshot},
    coupons::{Coupon, CouponCreator, CouponDiscount, CouponScope, CouponUuid, DiscountOutcome},
    ids::{AdminUuid, SellerUuid, UserUuid},
    orders::{
        AssemblyError, FlatCommission, FreeShipping, NoTax, Order, OrderAssembler, OrderDraft,
        OrderUuid, PaymentMethod, ShippingAddress,
    },
};

/// An active, unrestricted, single-use, order-scope coupon.
pub(crate) fn coupon(code: &str, discount: CouponDiscount) -> Coupon {
    Coupon {
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
        max_usage: 1,
        used_count: 0,
        max_usage_per_user: 1,
        user_usage: Vec::new(),
        stackable: false,
        max_stack_per_order: 1,
        expires_at: None,
        is_active: true,
        created_by: CouponCreator::Admin(AdminUuid::new()),
    }
}

/// A taxable line from a fresh seller.
pub(crate) fn line(price: u64, quantity: u64) -> PricedLine {
    PricedLine {
        product: ProductUuid::new(),
        seller: SellerUuid::new(),
        category: None,
        quantity,
        price,
        is_taxable: true,
    }
}

/// An approved product from a verified seller.
pub(crate) fn snapshot(price: u64, quantity: u64) -> ProductSnapshot {
    ProductSnapshot {
        uuid: ProductUuid::new(),
        seller: Some(SellerSnapshot {
            uuid: SellerUuid::new(),
            is_verified: true,
        }),
        category: None,
        price,
        quantity,
        in_stock: true,
        status: ProductStatus::Approved,
        is_taxable: true,
    }
}

pub(crate) fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: Some("Ayesha Khan".to_string()),
        street: "12 Canal Road".to_string(),
        city: "Lahore".to_string(),
        state: None,
        zip: "54000".to_string(),
        country: "PK".to_string(),
        phone: "+92 300 0000000".to_string(),
    }
}

/// An untaxed, free-shipping order for `lines`, paid by card.
pub(crate) fn order(lines: &[PricedLine]) -> Result<Order, AssemblyError> {
    OrderAssembler::new(
        Arc::new(NoTax),
        Arc::new(FreeShipping),
        Arc::new(FlatCommission::default()),
    )
    .assemble(
        OrderDraft {
            uuid: OrderUuid::new(),
            user: UserUuid::new(),
            payment_method: PaymentMethod::Card,
            shipping_address: address(),
            item_addresses: Vec::new(),
            notes: None,
            placed_at: Timestamp::now(),
        },
        lines,
        &DiscountOutcome::none(lines.len()),
    )
}
