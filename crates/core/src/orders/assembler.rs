//! Order assembly

use std::sync::Arc;

use jiff::Timestamp;
use thiserror::Error;

use crate::{
    catalog::PricedLine,
    coupons::DiscountOutcome,
    errors::ErrorKind,
    ids::{SellerUuid, UserUuid},
    orders::{
        address::{AddressError, ItemAddress, ShippingAddress},
        model::{AppliedCoupon, Order, OrderItem, OrderItemUuid, OrderUuid, Totals},
        policies::{CommissionPolicy, ShippingPolicy, TaxPolicy},
        status::{
            EscrowStatus, ItemStatus, OrderStatus, PaymentCollectionStatus, PaymentMethod,
            PaymentStatus, PayoutStatus,
        },
    },
    pricing::{PricingError, rate_of_minor},
};

/// Buyer-supplied order details, independent of the lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    /// Identifier to give the order.
    pub uuid: OrderUuid,

    /// Buyer.
    pub user: UserUuid,

    /// How the buyer pays.
    pub payment_method: PaymentMethod,

    /// Default destination.
    pub shipping_address: ShippingAddress,

    /// Per-seller destination overrides.
    pub item_addresses: Vec<ItemAddress>,

    /// Buyer notes.
    pub notes: Option<String>,

    /// Placement time.
    pub placed_at: Timestamp,
}

/// Errors raised while assembling an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// No lines to order.
    #[error("an order needs at least one item")]
    EmptyOrder,

    /// The line and discount lists disagree.
    #[error("discounts were computed for {discounts} lines but {lines} were supplied")]
    DiscountMismatch {
        /// Lines supplied.
        lines: usize,
        /// Lines the discounts cover.
        discounts: usize,
    },

    /// A destination is incomplete.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Arithmetic failure.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl AssemblyError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyOrder | Self::Address(_) => ErrorKind::Validation,
            Self::DiscountMismatch { .. } | Self::Pricing(_) => ErrorKind::Internal,
        }
    }
}

/// Builds [`Order`]s from priced lines using pluggable policies.
#[derive(Debug, Clone)]
pub struct OrderAssembler {
    tax: Arc<dyn TaxPolicy>,
    shipping: Arc<dyn ShippingPolicy>,
    commission: Arc<dyn CommissionPolicy>,
}

impl OrderAssembler {
    /// Create an assembler from its policies.
    pub fn new(
        tax: Arc<dyn TaxPolicy>,
        shipping: Arc<dyn ShippingPolicy>,
        commission: Arc<dyn CommissionPolicy>,
    ) -> Self {
        Self {
            tax,
            shipping,
            commission,
        }
    }

    /// Commission policy, shared with the sub-order splitter.
    pub fn commission(&self) -> &dyn CommissionPolicy {
        self.commission.as_ref()
    }

    /// Assemble an order from `lines` and their `discounts`.
    ///
    /// Every item starts `pending` with collection `pending` and a tracking
    /// number derived from the order, seller and line. Prepaid items are held in
    /// escrow; cash on delivery has nothing to hold.
    ///
    /// # Errors
    ///
    /// Returns an [`AssemblyError`] if there are no lines, an address is
    /// incomplete, or the amounts overflow.
    pub fn assemble(
        &self,
        draft: OrderDraft,
        lines: &[PricedLine],
        discounts: &DiscountOutcome,
    ) -> Result<Order, AssemblyError> {
        if lines.is_empty() {
            return Err(AssemblyError::EmptyOrder);
        }

        if discounts.line_discounts.len() != lines.len() {
            return Err(AssemblyError::DiscountMismatch {
                lines: lines.len(),
                discounts: discounts.line_discounts.len(),
            });
        }

        draft.shipping_address.validate()?;

        for item_address in &draft.item_addresses {
            item_address.address.validate()?;
        }

        let escrow_status = match draft.payment_method {
            PaymentMethod::Cod => EscrowStatus::NotApplicable,
            PaymentMethod::Card | PaymentMethod::Wallet => EscrowStatus::Held,
        };

        let mut items = Vec::with_capacity(lines.len());
        let mut tracking_numbers = Vec::with_capacity(lines.len());

        for (position, line) in lines.iter().enumerate() {
            let gross = line.line_total()?;
            let discount = discounts.line_discount(position).min(gross);
            let subtotal = gross - discount;

            let tax_amount = self.tax.tax_for(line, subtotal)?;
            let shipping_fee = self.shipping.shipping_for(line)?;

            let commission_rate = self.commission.rate_for(line.seller);
            let commissionable = subtotal
                .checked_add(tax_amount)
                .and_then(|amount| amount.checked_add(shipping_fee))
                .ok_or(PricingError::Overflow)?;
            let commission_amount = rate_of_minor(commission_rate, commissionable)?;

            let tracking = tracking_number(draft.uuid, line.seller, position);
            tracking_numbers.push(tracking.clone());

            let shipping_address = draft
                .item_addresses
                .iter()
                .find(|item_address| item_address.seller == line.seller)
                .map(|item_address| item_address.address.clone());

            items.push(OrderItem {
                uuid: OrderItemUuid::new(),
                product: line.product,
                seller: line.seller,
                quantity: line.quantity,
                price: line.price,
                discount,
                subtotal,
                tax_amount,
                shipping_fee,
                status: ItemStatus::Pending,
                payment_collection_status: PaymentCollectionStatus::Pending,
                tracking_number: tracking,
                shipping_address,
                applied_coupons: discounts.codes_for_line(position),
                commission_rate,
                commission_amount,
                escrow_status,
                payout_status: PayoutStatus::NotEligible,
            });
        }

        let applied_coupons = discounts
            .applications
            .iter()
            .map(|application| AppliedCoupon {
                coupon: application.coupon,
                code: application.code.clone(),
                discount: application.discount,
            })
            .collect();

        let mut order = Order {
            uuid: draft.uuid,
            user: draft.user,
            items,
            totals: Totals::default(),
            applied_coupons,
            payment_method: draft.payment_method,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            shipping_address: draft.shipping_address,
            tracking_numbers,
            notes: draft.notes,
            cancellation_reason: None,
            refund_reason: None,
            delivery_confirmed_at: None,
            created_at: draft.placed_at,
            updated_at: draft.placed_at,
        };

        order.recompute_totals()?;

        Ok(order)
    }
}

/// Tracking number for the line at `position` of `order`, fulfilled by `seller`.
///
/// Unique across the marketplace because order ids are, and the seller fragment
/// lets a sub-order's items be recognised at a glance.
pub fn tracking_number(order: OrderUuid, seller: SellerUuid, position: usize) -> String {
    let seller_fragment = u32::try_from(seller.into_uuid().as_u128() & 0xFFFF_FFFF)
        .unwrap_or_default();

    format!(
        "TRK-{:032X}-{seller_fragment:08X}-{:03}",
        order.into_uuid().as_u128(),
        position.saturating_add(1)
    )
}
