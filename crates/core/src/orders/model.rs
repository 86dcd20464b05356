//! Order aggregate

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::ProductUuid,
    coupons::CouponUuid,
    ids::{SellerUuid, TypedUuid, UserUuid},
    orders::{
        address::ShippingAddress,
        status::{
            EscrowStatus, ItemStatus, OrderStatus, PaymentCollectionStatus, PaymentMethod,
            PaymentStatus, PayoutStatus,
        },
    },
    pricing::{PricingError, line_total},
};

/// Order UUID
pub type OrderUuid = TypedUuid<Order>;

/// Order Item UUID
pub type OrderItemUuid = TypedUuid<OrderItem>;

/// Monetary fields of one line, as summed into [`Totals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    /// Unit price.
    pub price: u64,

    /// Units.
    pub quantity: u64,

    /// Discount on the line.
    pub discount: u64,

    /// Tax on the line.
    pub tax_amount: u64,

    /// Shipping for the line.
    pub shipping_fee: u64,
}

/// Money rolled up from a list of lines.
///
/// `total_amount = merchandise_subtotal + taxes + shipping_fee - discounts`,
/// where `merchandise_subtotal` is the gross `price * quantity` sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of `price * quantity`.
    pub merchandise_subtotal: u64,

    /// Sum of line discounts.
    pub discounts: u64,

    /// Sum of line taxes.
    pub taxes: u64,

    /// Sum of line shipping fees.
    pub shipping_fee: u64,

    /// Amount payable.
    pub total_amount: u64,
}

impl Totals {
    /// Sum `lines` into totals.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if any sum leaves the `u64` range or
    /// discounts exceed the merchandise value.
    pub fn sum<I>(lines: I) -> Result<Self, PricingError>
    where
        I: IntoIterator<Item = LineAmounts>,
    {
        let mut totals = Self::default();

        for line in lines {
            totals.merchandise_subtotal = totals
                .merchandise_subtotal
                .checked_add(line_total(line.price, line.quantity)?)
                .ok_or(PricingError::Overflow)?;

            totals.discounts = totals
                .discounts
                .checked_add(line.discount)
                .ok_or(PricingError::Overflow)?;

            totals.taxes = totals
                .taxes
                .checked_add(line.tax_amount)
                .ok_or(PricingError::Overflow)?;

            totals.shipping_fee = totals
                .shipping_fee
                .checked_add(line.shipping_fee)
                .ok_or(PricingError::Overflow)?;
        }

        totals.total_amount = totals
            .merchandise_subtotal
            .checked_add(totals.taxes)
            .and_then(|amount| amount.checked_add(totals.shipping_fee))
            .and_then(|amount| amount.checked_sub(totals.discounts))
            .ok_or(PricingError::Overflow)?;

        Ok(totals)
    }
}

/// A coupon redeemed on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    /// Coupon redeemed.
    pub coupon: CouponUuid,

    /// Its code at redemption time.
    pub code: String,

    /// Discount it contributed before per-line capping.
    pub discount: u64,
}

/// One purchased line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Item identifier, referenced by sub-orders, returns and disputes.
    pub uuid: OrderItemUuid,

    /// Product bought.
    pub product: ProductUuid,

    /// Seller fulfilling the item.
    pub seller: SellerUuid,

    /// Units bought.
    pub quantity: u64,

    /// Unit price at purchase.
    pub price: u64,

    /// Combined coupon discount.
    pub discount: u64,

    /// `max(price * quantity - discount, 0)`.
    pub subtotal: u64,

    /// Tax on the discounted subtotal.
    pub tax_amount: u64,

    /// Shipping fee.
    pub shipping_fee: u64,

    /// Fulfilment state.
    pub status: ItemStatus,

    /// Collection state of the buyer's money.
    pub payment_collection_status: PaymentCollectionStatus,

    /// Carrier tracking number.
    pub tracking_number: String,

    /// Override of the order's shipping address.
    pub shipping_address: Option<ShippingAddress>,

    /// Codes of the coupons that discounted this item.
    pub applied_coupons: Vec<String>,

    /// Marketplace commission as a fraction.
    pub commission_rate: Decimal,

    /// Commission in minor units.
    pub commission_amount: u64,

    /// Escrow state.
    pub escrow_status: EscrowStatus,

    /// Seller payout state.
    pub payout_status: PayoutStatus,
}

impl OrderItem {
    /// The monetary fields that feed [`Totals`].
    pub const fn amounts(&self) -> LineAmounts {
        LineAmounts {
            price: self.price,
            quantity: self.quantity,
            discount: self.discount,
            tax_amount: self.tax_amount,
            shipping_fee: self.shipping_fee,
        }
    }
}

/// A buyer's order across every seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier.
    pub uuid: OrderUuid,

    /// Buyer.
    pub user: UserUuid,

    /// Purchased lines, in request order.
    pub items: Vec<OrderItem>,

    /// Money derived from `items`.
    pub totals: Totals,

    /// Coupons redeemed.
    pub applied_coupons: Vec<AppliedCoupon>,

    /// How the buyer pays.
    pub payment_method: PaymentMethod,

    /// Whether the buyer has paid.
    pub payment_status: PaymentStatus,

    /// Rolled-up fulfilment state.
    pub order_status: OrderStatus,

    /// Default destination.
    pub shipping_address: ShippingAddress,

    /// Every tracking number issued for this order.
    pub tracking_numbers: Vec<String>,

    /// Buyer notes.
    pub notes: Option<String>,

    /// Why the order was cancelled.
    pub cancellation_reason: Option<String>,

    /// Why the order was refunded.
    pub refund_reason: Option<String>,

    /// When the buyer confirmed delivery.
    pub delivery_confirmed_at: Option<Timestamp>,

    /// When the order was placed.
    pub created_at: Timestamp,

    /// Last state change.
    pub updated_at: Timestamp,
}

impl Order {
    /// Recompute [`Totals`] from the items.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the sums leave the `u64` range.
    pub fn recompute_totals(&mut self) -> Result<(), PricingError> {
        self.totals = Totals::sum(self.items.iter().map(OrderItem::amounts))?;

        Ok(())
    }

    /// Look up an item by id.
    pub fn item(&self, uuid: OrderItemUuid) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.uuid == uuid)
    }

    /// Look up an item by id for modification.
    pub fn item_mut(&mut self, uuid: OrderItemUuid) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|item| item.uuid == uuid)
    }

    /// Distinct sellers in first-appearance order.
    pub fn sellers(&self) -> Vec<SellerUuid> {
        let mut sellers: Vec<SellerUuid> = Vec::new();

        for item in &self.items {
            if !sellers.contains(&item.seller) {
                sellers.push(item.seller);
            }
        }

        sellers
    }

    /// Whether `seller` has at least one item in this order.
    pub fn involves_seller(&self, seller: SellerUuid) -> bool {
        self.items.iter().any(|item| item.seller == seller)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn amounts(price: u64, quantity: u64, discount: u64, tax: u64, shipping: u64) -> LineAmounts {
        LineAmounts {
            price,
            quantity,
            discount,
            tax_amount: tax,
            shipping_fee: shipping,
        }
    }

    #[test]
    fn totals_follow_the_order_formula() -> TestResult {
        let totals = Totals::sum([amounts(100, 2, 20, 18, 300), amounts(50, 1, 0, 5, 150)])?;

        assert_eq!(
            totals,
            Totals {
                merchandise_subtotal: 250,
                discounts: 20,
                taxes: 23,
                shipping_fee: 450,
                total_amount: 703,
            }
        );

        Ok(())
    }

    #[test]
    fn empty_totals_are_zero() -> TestResult {
        assert_eq!(Totals::sum(Vec::new())?, Totals::default());

        Ok(())
    }

    #[test]
    fn discounts_beyond_merchandise_are_rejected() {
        assert_eq!(
            Totals::sum([amounts(10, 1, 11, 0, 0)]),
            Err(PricingError::Overflow)
        );
    }
}
