//! Sub-order splitting
//!
//! Each seller in an order gets a [`SubOrder`] holding copies of its items,
//! linked back to the order items by id.

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::ProductUuid,
    ids::{SellerUuid, TypedUuid, UserUuid},
    orders::{
        lifecycle::rollup_status,
        model::{LineAmounts, Order, OrderItem, OrderItemUuid, OrderUuid, Totals},
        policies::CommissionPolicy,
        status::{EscrowStatus, ItemStatus, OrderStatus, PayoutStatus},
    },
    pricing::{PricingError, rate_of_minor},
};

/// Sub-Order UUID
pub type SubOrderUuid = TypedUuid<SubOrder>;

/// A seller's copy of one order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubOrderItem {
    /// The order item this mirrors.
    pub order_item: OrderItemUuid,

    /// Product.
    pub product: ProductUuid,

    /// Units.
    pub quantity: u64,

    /// Unit price.
    pub price: u64,

    /// Discount.
    pub discount: u64,

    /// Discounted subtotal.
    pub subtotal: u64,

    /// Tax.
    pub tax_amount: u64,

    /// Shipping fee.
    pub shipping_fee: u64,

    /// Mirrored fulfilment state.
    pub status: ItemStatus,

    /// Mirrored tracking number.
    pub tracking_number: String,
}

impl SubOrderItem {
    fn from_order_item(item: &OrderItem) -> Self {
        Self {
            order_item: item.uuid,
            product: item.product,
            quantity: item.quantity,
            price: item.price,
            discount: item.discount,
            subtotal: item.subtotal,
            tax_amount: item.tax_amount,
            shipping_fee: item.shipping_fee,
            status: item.status,
            tracking_number: item.tracking_number.clone(),
        }
    }

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

/// One seller's share of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubOrder {
    /// Sub-order identifier.
    pub uuid: SubOrderUuid,

    /// Parent order.
    pub order: OrderUuid,

    /// Buyer.
    pub user: UserUuid,

    /// Seller fulfilling it.
    pub seller: SellerUuid,

    /// The seller's items.
    pub items: Vec<SubOrderItem>,

    /// Money derived from `items`.
    pub totals: Totals,

    /// Marketplace commission as a fraction.
    pub commission_rate: Decimal,

    /// `round(total_amount * commission_rate)`.
    pub commission_amount: u64,

    /// `total_amount - commission_amount`, never negative.
    pub seller_earning: u64,

    /// Escrow state across the seller's items.
    pub escrow_status: EscrowStatus,

    /// Payout state across the seller's items.
    pub payout_status: PayoutStatus,

    /// Rolled-up fulfilment state.
    pub status: OrderStatus,

    /// Creation time.
    pub created_at: Timestamp,

    /// Last state change.
    pub updated_at: Timestamp,
}

impl SubOrder {
    /// Recompute totals, commission and seller earning from the items.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the sums overflow.
    pub fn recompute_totals(&mut self) -> Result<(), PricingError> {
        self.totals = Totals::sum(self.items.iter().map(SubOrderItem::amounts))?;
        self.commission_amount = rate_of_minor(self.commission_rate, self.totals.total_amount)?;
        self.seller_earning = self
            .totals
            .total_amount
            .saturating_sub(self.commission_amount);

        Ok(())
    }

    /// Mirror item states and tracking numbers from `order`, then roll up.
    pub fn sync_from(&mut self, order: &Order) {
        for item in &mut self.items {
            if let Some(source) = order.item(item.order_item) {
                item.status = source.status;
                item.tracking_number.clone_from(&source.tracking_number);
            }
        }

        self.status = match order.order_status {
            OrderStatus::Cancelled => OrderStatus::Cancelled,
            OrderStatus::Refunded => OrderStatus::Refunded,
            _ => rollup_status(self.items.iter().map(|item| item.status)).unwrap_or(self.status),
        };

        let own: Vec<&OrderItem> = order
            .items
            .iter()
            .filter(|item| item.seller == self.seller)
            .collect();

        if !own.is_empty() {
            if own.iter().all(|item| item.escrow_status == EscrowStatus::Released) {
                self.escrow_status = EscrowStatus::Released;
            } else if own.iter().all(|item| item.escrow_status == EscrowStatus::Refunded) {
                self.escrow_status = EscrowStatus::Refunded;
            }

            if own.iter().all(|item| item.payout_status == PayoutStatus::Eligible) {
                self.payout_status = PayoutStatus::Eligible;
            }
        }

        self.updated_at = order.updated_at;
    }
}

/// Split `order` into one [`SubOrder`] per seller, in first-appearance order.
///
/// # Errors
///
/// Returns a [`PricingError`] if a sub-order's sums overflow.
pub fn split_by_seller(
    order: &Order,
    commission: &dyn CommissionPolicy,
) -> Result<Vec<SubOrder>, PricingError> {
    let mut positions: FxHashMap<SellerUuid, usize> = FxHashMap::default();
    let mut sub_orders: Vec<SubOrder> = Vec::new();

    for item in &order.items {
        let position = *positions.entry(item.seller).or_insert_with(|| {
            sub_orders.push(SubOrder {
                uuid: SubOrderUuid::new(),
                order: order.uuid,
                user: order.user,
                seller: item.seller,
                items: Vec::new(),
                totals: Totals::default(),
                commission_rate: commission.rate_for(item.seller),
                commission_amount: 0,
                seller_earning: 0,
                escrow_status: item.escrow_status,
                payout_status: PayoutStatus::NotEligible,
                status: OrderStatus::Pending,
                created_at: order.created_at,
                updated_at: order.updated_at,
            });

            sub_orders.len() - 1
        });

        if let Some(sub_order) = sub_orders.get_mut(position) {
            sub_order.items.push(SubOrderItem::from_order_item(item));
        }
    }

    for sub_order in &mut sub_orders {
        sub_order.recompute_totals()?;
    }

    Ok(sub_orders)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use decimal_percentage::Percentage;
    use jiff::Timestamp;
    use testresult::TestResult;

    use super::*;
    use crate::{
        coupons::DiscountOutcome,
        fixtures::{address, line},
        orders::{
            assembler::{OrderAssembler, OrderDraft},
            policies::{FlatCommission, FlatPerItemShipping, NoTax},
            status::PaymentMethod,
        },
    };

    fn order_for(lines: &[crate::catalog::PricedLine]) -> Result<Order, Box<dyn std::error::Error>> {
        let assembler = OrderAssembler::new(
            Arc::new(NoTax),
            Arc::new(FlatPerItemShipping::new(0)),
            Arc::new(FlatCommission::new(Percentage::from(0.1))),
        );

        Ok(assembler.assemble(
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
        )?)
    }

    #[test]
    fn groups_items_by_seller_in_first_appearance_order() -> TestResult {
        let first = line(100, 1);
        let second = line(50, 2);
        let mut third = line(30, 1);
        third.seller = first.seller;

        let order = order_for(&[first, second, third])?;
        let sub_orders = split_by_seller(&order, &FlatCommission::new(Percentage::from(0.1)))?;

        assert_eq!(sub_orders.len(), 2);
        assert_eq!(sub_orders.first().map(|s| s.seller), Some(first.seller));
        assert_eq!(sub_orders.first().map(|s| s.items.len()), Some(2));
        assert_eq!(sub_orders.get(1).map(|s| s.seller), Some(second.seller));

        Ok(())
    }

    #[test]
    fn commission_and_earning_follow_the_total() -> TestResult {
        let order = order_for(&[line(1_005, 1)])?;
        let sub_orders = split_by_seller(&order, &FlatCommission::new(Percentage::from(0.1)))?;
        let sub_order = sub_orders.first().ok_or("missing sub-order")?;

        assert_eq!(sub_order.totals.total_amount, 1_005);
        assert_eq!(sub_order.commission_amount, 101);
        assert_eq!(sub_order.seller_earning, 904);

        Ok(())
    }

    #[test]
    fn sub_order_totals_sum_to_the_order() -> TestResult {
        let order = order_for(&[line(100, 1), line(200, 3), line(7, 9)])?;
        let sub_orders = split_by_seller(&order, &FlatCommission::default())?;

        let total: u64 = sub_orders.iter().map(|s| s.totals.total_amount).sum();

        assert_eq!(total, order.totals.total_amount);

        Ok(())
    }

    #[test]
    fn items_link_back_to_order_items() -> TestResult {
        let order = order_for(&[line(100, 1), line(200, 1)])?;
        let sub_orders = split_by_seller(&order, &FlatCommission::default())?;

        for sub_order in &sub_orders {
            for item in &sub_order.items {
                let source = order.item(item.order_item).ok_or("dangling order item")?;

                assert_eq!(source.seller, sub_order.seller);
                assert_eq!(source.tracking_number, item.tracking_number);
            }
        }

        Ok(())
    }

    #[test]
    fn sync_mirrors_item_states() -> TestResult {
        let mut order = order_for(&[line(100, 1)])?;
        let mut sub_orders = split_by_seller(&order, &FlatCommission::default())?;

        if let Some(item) = order.items.first_mut() {
            item.status = ItemStatus::Shipped;
            item.tracking_number = "TRK-CARRIER-1".to_string();
        }

        let sub_order = sub_orders.first_mut().ok_or("missing sub-order")?;
        sub_order.sync_from(&order);

        assert_eq!(sub_order.status, OrderStatus::Processing);
        assert_eq!(
            sub_order.items.first().map(|i| i.tracking_number.as_str()),
            Some("TRK-CARRIER-1")
        );

        Ok(())
    }
}
