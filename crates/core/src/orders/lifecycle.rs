//! Order lifecycle
//!
//! Transitions on an [`Order`] after it has been placed. Each operation checks
//! its preconditions before touching anything, so a rejected call leaves the
//! order unchanged. Stock to put back is returned to the caller as
//! [`StockRestore`]s rather than written here.

use jiff::Timestamp;
use thiserror::Error;

use crate::{
    catalog::ProductUuid,
    errors::ErrorKind,
    ids::SellerUuid,
    orders::{
        model::{Order, OrderItem, OrderItemUuid},
        status::{
            EscrowStatus, ItemStatus, OrderStatus, PaymentCollectionStatus, PaymentMethod,
            PaymentStatus, PayoutStatus,
        },
    },
    pricing::{PricingError, pro_rata},
};

/// Units of a product to put back on sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRestore {
    /// Product to restock.
    pub product: ProductUuid,

    /// Units to add back.
    pub quantity: u64,
}

impl StockRestore {
    fn for_item(item: &OrderItem) -> Self {
        Self {
            product: item.product,
            quantity: item.quantity,
        }
    }
}

/// Result of a full refund.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefundOutcome {
    /// Stock for items that never reached the buyer.
    pub restocks: Vec<StockRestore>,

    /// Sum of the refunded items' subtotals, owed to the buyer.
    pub refunded_amount: u64,
}

/// Errors raised by lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// No item with this id in the order.
    #[error("order item {0} not found")]
    ItemNotFound(OrderItemUuid),

    /// The item belongs to another seller.
    #[error("order item {0} does not belong to this seller")]
    NotSellersItem(OrderItemUuid),

    /// The order is in a state that does not allow the action.
    #[error("cannot {action} an order that is {status}")]
    InvalidOrderState {
        /// Current order state.
        status: OrderStatus,
        /// What was attempted.
        action: &'static str,
    },

    /// The item cannot move between these states.
    #[error("order item cannot move from {from} to {to}")]
    InvalidItemTransition {
        /// Current item state.
        from: ItemStatus,
        /// Requested item state.
        to: ItemStatus,
    },

    /// A tracking number was required but blank.
    #[error("a tracking number is required")]
    MissingTrackingNumber,

    /// The seller has nothing waiting to ship.
    #[error("no pending or processing items to ship")]
    NothingToShip,

    /// Collection confirmation only applies to cash on delivery.
    #[error("payment collection only applies to cash on delivery orders")]
    NotCashOnDelivery,

    /// Online payment only applies to prepaid orders.
    #[error("cash on delivery orders are not paid online")]
    NotPrepaid,

    /// The order has already been paid.
    #[error("order is already paid")]
    AlreadyPaid,

    /// The item has not been delivered.
    #[error("order item {0} has not been delivered")]
    NotDelivered(OrderItemUuid),

    /// The item's payment was already confirmed.
    #[error("payment for order item {0} was already collected")]
    AlreadyCollected(OrderItemUuid),

    /// Some items are still on their way.
    #[error("not every item has been delivered")]
    NotAllDelivered,

    /// The buyer already confirmed delivery.
    #[error("delivery was already confirmed")]
    AlreadyConfirmed,

    /// Return quantity outside `1..=ordered`.
    #[error("cannot return {requested} of {ordered} units")]
    InvalidReturnQuantity {
        /// Units asked for.
        requested: u64,
        /// Units bought.
        ordered: u64,
    },

    /// Arithmetic failure.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl LifecycleError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ItemNotFound(_) | Self::NotSellersItem(_) => ErrorKind::NotFound,
            Self::MissingTrackingNumber | Self::InvalidReturnQuantity { .. } => {
                ErrorKind::Validation
            }
            Self::InvalidOrderState { .. }
            | Self::InvalidItemTransition { .. }
            | Self::NothingToShip
            | Self::NotCashOnDelivery
            | Self::NotPrepaid
            | Self::AlreadyPaid
            | Self::NotDelivered(_)
            | Self::AlreadyCollected(_)
            | Self::NotAllDelivered
            | Self::AlreadyConfirmed => ErrorKind::Conflict,
            Self::Pricing(_) => ErrorKind::Internal,
        }
    }
}

/// Roll item states up into an order state.
///
/// Every item delivered is `completed`, every item cancelled is `cancelled`,
/// and any item in progress makes the whole `processing`. Anything else leaves
/// the current state alone, signalled by `None`.
pub fn rollup_status<I>(statuses: I) -> Option<OrderStatus>
where
    I: IntoIterator<Item = ItemStatus>,
{
    let mut any = false;
    let mut all_delivered = true;
    let mut all_cancelled = true;
    let mut in_progress = false;

    for status in statuses {
        any = true;
        all_delivered &= status == ItemStatus::Delivered;
        all_cancelled &= status == ItemStatus::Cancelled;
        in_progress |= matches!(
            status,
            ItemStatus::Processing | ItemStatus::Shipped | ItemStatus::Delivered
        );
    }

    if !any {
        None
    } else if all_delivered {
        Some(OrderStatus::Completed)
    } else if all_cancelled {
        Some(OrderStatus::Cancelled)
    } else if in_progress {
        Some(OrderStatus::Processing)
    } else {
        None
    }
}

fn refund_item(item: &mut OrderItem, status: ItemStatus) {
    item.status = status;
    item.payment_collection_status = PaymentCollectionStatus::Refunded;

    if item.escrow_status == EscrowStatus::Held {
        item.escrow_status = EscrowStatus::Refunded;
    }

    item.payout_status = PayoutStatus::NotEligible;
}

fn cancel_item(item: &mut OrderItem) {
    item.status = ItemStatus::Cancelled;
    item.payment_collection_status = PaymentCollectionStatus::Cancelled;

    if item.escrow_status == EscrowStatus::Held {
        item.escrow_status = EscrowStatus::Refunded;
    }
}

impl Order {
    fn ensure_status(
        &self,
        allowed: &[OrderStatus],
        action: &'static str,
    ) -> Result<(), LifecycleError> {
        if allowed.contains(&self.order_status) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidOrderState {
                status: self.order_status,
                action,
            })
        }
    }

    fn item_or_err(&self, uuid: OrderItemUuid) -> Result<&OrderItem, LifecycleError> {
        self.item(uuid).ok_or(LifecycleError::ItemNotFound(uuid))
    }

    fn item_mut_or_err(&mut self, uuid: OrderItemUuid) -> Result<&mut OrderItem, LifecycleError> {
        self.item_mut(uuid).ok_or(LifecycleError::ItemNotFound(uuid))
    }

    fn sellers_item_mut(
        &mut self,
        uuid: OrderItemUuid,
        seller: SellerUuid,
    ) -> Result<&mut OrderItem, LifecycleError> {
        let item = self.item_mut_or_err(uuid)?;

        if item.seller == seller {
            Ok(item)
        } else {
            Err(LifecycleError::NotSellersItem(uuid))
        }
    }

    fn apply_rollup(&mut self) {
        if matches!(
            self.order_status,
            OrderStatus::Cancelled | OrderStatus::Refunded
        ) {
            return;
        }

        if let Some(status) = rollup_status(self.items.iter().map(|item| item.status)) {
            self.order_status = status;
        }
    }

    fn record_tracking_number(&mut self, tracking: &str) {
        if !self.tracking_numbers.iter().any(|number| number == tracking) {
            self.tracking_numbers.push(tracking.to_string());
        }
    }

    /// Cancel a pending order on the buyer's behalf.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidOrderState`] unless the order is pending.
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<Vec<StockRestore>, LifecycleError> {
        self.ensure_status(&[OrderStatus::Pending], "cancel")?;

        let mut restocks = Vec::new();

        for item in &mut self.items {
            if item.status == ItemStatus::Cancelled {
                continue;
            }

            restocks.push(StockRestore::for_item(item));
            cancel_item(item);
        }

        self.order_status = OrderStatus::Cancelled;
        self.cancellation_reason = reason;
        self.updated_at = now;

        Ok(restocks)
    }

    /// Cancel one of `seller`'s pending items.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the item is missing, belongs to another
    /// seller, or is past `pending`.
    pub fn cancel_item(
        &mut self,
        item: OrderItemUuid,
        seller: SellerUuid,
        now: Timestamp,
    ) -> Result<StockRestore, LifecycleError> {
        self.ensure_status(
            &[OrderStatus::Pending, OrderStatus::Processing],
            "cancel an item of",
        )?;

        let item = self.sellers_item_mut(item, seller)?;

        if !item.status.can_transition_to(ItemStatus::Cancelled) {
            return Err(LifecycleError::InvalidItemTransition {
                from: item.status,
                to: ItemStatus::Cancelled,
            });
        }

        let restore = StockRestore::for_item(item);
        cancel_item(item);

        self.apply_rollup();
        self.updated_at = now;

        Ok(restore)
    }

    /// Move one of `seller`'s items forward to `next`.
    ///
    /// Only `processing`, `shipped` and `delivered` may be requested. A
    /// tracking number given with `shipped` replaces the generated one.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the order is closed, the item is not the
    /// seller's, or the move is not a forward fulfilment step.
    pub fn update_item_status(
        &mut self,
        item: OrderItemUuid,
        seller: SellerUuid,
        next: ItemStatus,
        tracking: Option<String>,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        self.ensure_status(
            &[
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Completed,
            ],
            "update an item of",
        )?;

        let tracking = match tracking {
            Some(number) if number.trim().is_empty() => {
                return Err(LifecycleError::MissingTrackingNumber);
            }
            Some(number) => Some(number.trim().to_string()),
            None => None,
        };

        let order_item = self.sellers_item_mut(item, seller)?;
        let from = order_item.status;

        let forward = matches!(
            next,
            ItemStatus::Processing | ItemStatus::Shipped | ItemStatus::Delivered
        );

        if !forward || !from.can_transition_to(next) {
            return Err(LifecycleError::InvalidItemTransition { from, to: next });
        }

        order_item.status = next;

        if next == ItemStatus::Shipped
            && let Some(number) = tracking
        {
            order_item.tracking_number.clone_from(&number);
            self.record_tracking_number(&number);
        }

        self.apply_rollup();
        self.updated_at = now;

        Ok(())
    }

    /// Ship every pending or processing item of `seller` under `tracking`.
    ///
    /// Returns how many items were shipped.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the number is blank, the order is closed,
    /// or the seller has nothing waiting to ship.
    pub fn add_tracking(
        &mut self,
        seller: SellerUuid,
        tracking: &str,
        now: Timestamp,
    ) -> Result<usize, LifecycleError> {
        let tracking = tracking.trim();

        if tracking.is_empty() {
            return Err(LifecycleError::MissingTrackingNumber);
        }

        self.ensure_status(
            &[OrderStatus::Pending, OrderStatus::Processing],
            "add tracking to",
        )?;

        let mut shipped = 0;

        for item in &mut self.items {
            if item.seller == seller
                && matches!(item.status, ItemStatus::Pending | ItemStatus::Processing)
            {
                item.status = ItemStatus::Shipped;
                item.tracking_number = tracking.to_string();
                shipped += 1;
            }
        }

        if shipped == 0 {
            return Err(LifecycleError::NothingToShip);
        }

        self.record_tracking_number(tracking);
        self.apply_rollup();
        self.updated_at = now;

        Ok(shipped)
    }

    /// Record that `seller` collected cash for a delivered item.
    ///
    /// The order becomes `paid` once every live item has been collected.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] for prepaid orders, items that are not the
    /// seller's, undelivered items, or items already collected.
    pub fn confirm_payment_collection(
        &mut self,
        item: OrderItemUuid,
        seller: SellerUuid,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        if self.payment_method != PaymentMethod::Cod {
            return Err(LifecycleError::NotCashOnDelivery);
        }

        let order_item = self.sellers_item_mut(item, seller)?;

        if order_item.status != ItemStatus::Delivered {
            return Err(LifecycleError::NotDelivered(item));
        }

        if order_item.payment_collection_status != PaymentCollectionStatus::Pending {
            return Err(LifecycleError::AlreadyCollected(item));
        }

        order_item.payment_collection_status = PaymentCollectionStatus::Collected;

        let all_collected = self
            .items
            .iter()
            .filter(|item| item.status != ItemStatus::Cancelled)
            .all(|item| item.payment_collection_status == PaymentCollectionStatus::Collected);

        if all_collected {
            self.payment_status = PaymentStatus::Paid;
        }

        self.updated_at = now;

        Ok(())
    }

    /// Check the order can still be paid online.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] for cash on delivery, closed orders, or
    /// orders already paid.
    pub fn check_payable(&self) -> Result<(), LifecycleError> {
        if self.payment_method == PaymentMethod::Cod {
            return Err(LifecycleError::NotPrepaid);
        }

        self.ensure_status(
            &[OrderStatus::Pending, OrderStatus::Processing, OrderStatus::Completed],
            "take payment for",
        )?;

        if self.payment_status != PaymentStatus::Pending {
            return Err(LifecycleError::AlreadyPaid);
        }

        Ok(())
    }

    /// Record that the buyer paid a prepaid order through the gateway.
    ///
    /// Every live item's money counts as collected.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] when [`Order::check_payable`] fails.
    pub fn record_prepayment(&mut self, now: Timestamp) -> Result<(), LifecycleError> {
        self.check_payable()?;

        for item in &mut self.items {
            if item.payment_collection_status == PaymentCollectionStatus::Pending {
                item.payment_collection_status = PaymentCollectionStatus::Collected;
            }
        }

        self.payment_status = PaymentStatus::Paid;
        self.updated_at = now;

        Ok(())
    }

    /// The buyer confirms every live item arrived.
    ///
    /// Completes the order, releases escrow and makes seller payouts eligible.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the order is not in progress, delivery
    /// was already confirmed, or an item is still undelivered.
    pub fn confirm_delivery(&mut self, now: Timestamp) -> Result<(), LifecycleError> {
        self.ensure_status(
            &[OrderStatus::Processing, OrderStatus::Completed],
            "confirm delivery of",
        )?;

        if self.delivery_confirmed_at.is_some() {
            return Err(LifecycleError::AlreadyConfirmed);
        }

        let mut live = self
            .items
            .iter()
            .filter(|item| item.status != ItemStatus::Cancelled)
            .peekable();

        if live.peek().is_none() || !live.all(|item| item.status == ItemStatus::Delivered) {
            return Err(LifecycleError::NotAllDelivered);
        }

        for item in &mut self.items {
            if item.status != ItemStatus::Delivered {
                continue;
            }

            if item.escrow_status == EscrowStatus::Held {
                item.escrow_status = EscrowStatus::Released;
            }

            if item.payout_status == PayoutStatus::NotEligible {
                item.payout_status = PayoutStatus::Eligible;
            }
        }

        self.order_status = OrderStatus::Completed;
        self.delivery_confirmed_at = Some(now);
        self.updated_at = now;

        Ok(())
    }

    /// Open a return of `quantity` units of a delivered item.
    ///
    /// Returns the refund owed, the item subtotal pro-rated by quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the order is closed, the item is not
    /// delivered, or the quantity is out of range.
    pub fn request_return(
        &mut self,
        item: OrderItemUuid,
        quantity: u64,
        now: Timestamp,
    ) -> Result<u64, LifecycleError> {
        self.ensure_status(
            &[OrderStatus::Processing, OrderStatus::Completed],
            "return an item of",
        )?;

        let order_item = self.item_mut_or_err(item)?;

        if order_item.status != ItemStatus::Delivered {
            return Err(LifecycleError::NotDelivered(item));
        }

        if quantity == 0 || quantity > order_item.quantity {
            return Err(LifecycleError::InvalidReturnQuantity {
                requested: quantity,
                ordered: order_item.quantity,
            });
        }

        let refund = pro_rata(order_item.subtotal, quantity, order_item.quantity)?;

        order_item.status = ItemStatus::ReturnRequested;
        self.updated_at = now;

        Ok(refund)
    }

    /// Put an item with a rejected return back to `delivered`.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the item is missing or has no open return.
    pub fn reject_return(&mut self, item: OrderItemUuid, now: Timestamp) -> Result<(), LifecycleError> {
        let order_item = self.item_mut_or_err(item)?;

        if order_item.status != ItemStatus::ReturnRequested {
            return Err(LifecycleError::InvalidItemTransition {
                from: order_item.status,
                to: ItemStatus::Delivered,
            });
        }

        order_item.status = ItemStatus::Delivered;
        self.updated_at = now;

        Ok(())
    }

    /// Close a refunded return: the item is `returned` and its money refunded.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the item is missing or has no open return.
    pub fn complete_return(
        &mut self,
        item: OrderItemUuid,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let order_item = self.item_mut_or_err(item)?;

        if order_item.status != ItemStatus::ReturnRequested {
            return Err(LifecycleError::InvalidItemTransition {
                from: order_item.status,
                to: ItemStatus::Returned,
            });
        }

        refund_item(order_item, ItemStatus::Returned);
        self.updated_at = now;

        Ok(())
    }

    /// Settle a dispute in the buyer's favour.
    ///
    /// A shipped or delivered item becomes `returned` with its money refunded;
    /// returns whether that happened.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ItemNotFound`] if the item is missing.
    pub fn resolve_for_buyer(
        &mut self,
        item: OrderItemUuid,
        now: Timestamp,
    ) -> Result<bool, LifecycleError> {
        let order_item = self.item_mut_or_err(item)?;

        if !order_item.status.is_dispatched() {
            return Ok(false);
        }

        refund_item(order_item, ItemStatus::Returned);
        self.updated_at = now;

        Ok(true)
    }

    /// Refund the whole order.
    ///
    /// Items not already cancelled or returned are refunded; those that never
    /// reached the buyer are restocked.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the order is already cancelled or
    /// refunded.
    pub fn refund(
        &mut self,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<RefundOutcome, LifecycleError> {
        self.ensure_status(
            &[
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Completed,
            ],
            "refund",
        )?;

        let mut outcome = RefundOutcome::default();

        for item in &mut self.items {
            if matches!(
                item.status,
                ItemStatus::Cancelled | ItemStatus::Returned | ItemStatus::Refunded
            ) {
                continue;
            }

            if matches!(
                item.status,
                ItemStatus::Pending | ItemStatus::Processing | ItemStatus::Shipped
            ) {
                outcome.restocks.push(StockRestore::for_item(item));
            }

            outcome.refunded_amount = outcome
                .refunded_amount
                .checked_add(item.subtotal)
                .ok_or(PricingError::Overflow)?;

            refund_item(item, ItemStatus::Refunded);
        }

        self.order_status = OrderStatus::Refunded;
        self.payment_status = PaymentStatus::Refunded;
        self.refund_reason = reason;
        self.updated_at = now;

        Ok(outcome)
    }

    /// Stock to put back when an administrator deletes the order outright.
    ///
    /// Items already cancelled, returned or refunded have been dealt with and
    /// are skipped.
    pub fn deletion_restocks(&self) -> Vec<StockRestore> {
        self.items
            .iter()
            .filter(|item| {
                !matches!(
                    item.status,
                    ItemStatus::Cancelled | ItemStatus::Returned | ItemStatus::Refunded
                )
            })
            .map(StockRestore::for_item)
            .collect()
    }

    /// Administrative override of the order state.
    ///
    /// Cancelling restocks and cancels every item not yet shipped. Completing
    /// requires every item to be delivered, returned or cancelled. Refunds go
    /// through [`Order::refund`] instead.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the order is already cancelled or
    /// refunded, the target is `refunded`, or a completion has undelivered
    /// items. A cancelled order has given back its stock and coupon uses, so
    /// it cannot be reopened.
    pub fn admin_set_status(
        &mut self,
        status: OrderStatus,
        now: Timestamp,
    ) -> Result<Vec<StockRestore>, LifecycleError> {
        if matches!(
            self.order_status,
            OrderStatus::Cancelled | OrderStatus::Refunded
        ) || status == OrderStatus::Refunded
        {
            return Err(LifecycleError::InvalidOrderState {
                status: self.order_status,
                action: "override the status of",
            });
        }

        let mut restocks = Vec::new();

        match status {
            OrderStatus::Cancelled => {
                for item in &mut self.items {
                    if matches!(item.status, ItemStatus::Pending | ItemStatus::Processing) {
                        restocks.push(StockRestore::for_item(item));
                        cancel_item(item);
                    }
                }
            }
            OrderStatus::Completed => {
                let settled = self.items.iter().all(|item| {
                    matches!(
                        item.status,
                        ItemStatus::Delivered | ItemStatus::Returned | ItemStatus::Cancelled
                    )
                });

                if !settled {
                    return Err(LifecycleError::NotAllDelivered);
                }
            }
            OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Refunded => {}
        }

        self.order_status = status;
        self.updated_at = now;

        Ok(restocks)
    }

    /// Look up `item`, checking it belongs to `seller`.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the item is missing or is another seller's.
    pub fn check_sellers_item(
        &self,
        item: OrderItemUuid,
        seller: SellerUuid,
    ) -> Result<&OrderItem, LifecycleError> {
        let order_item = self.item_or_err(item)?;

        if order_item.seller == seller {
            Ok(order_item)
        } else {
            Err(LifecycleError::NotSellersItem(item))
        }
    }
}
