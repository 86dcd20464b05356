//! Return requests
//!
//! A buyer opens a return against a delivered item; an administrator then
//! walks it through approval, receipt and refund. The item's own state in the
//! order moves in step.

use std::fmt::{Display, Formatter, Result as FmtResult};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::ProductUuid,
    errors::ErrorKind,
    ids::{SellerUuid, TypedUuid, UserUuid},
    orders::{LifecycleError, Order, OrderItemUuid, OrderUuid, StockRestore, SubOrderUuid},
};

/// Return Request UUID
pub type ReturnRequestUuid = TypedUuid<ReturnRequest>;

/// Where a return stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    /// Opened by the buyer.
    Requested,

    /// Accepted; the buyer may send the goods back.
    Approved,

    /// Refused.
    Rejected,

    /// Goods are back with the seller.
    Received,

    /// Money returned to the buyer.
    Refunded,
}

impl ReturnStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Received => "received",
            Self::Refunded => "refunded",
        }
    }

    /// Whether a return may move from `self` to `next`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Approved | Self::Rejected)
                | (Self::Approved, Self::Received | Self::Rejected)
                | (Self::Received, Self::Refunded)
        )
    }
}

impl Display for ReturnStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReturnStatus {
    type Error = ReturnError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "requested" => Ok(Self::Requested),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "received" => Ok(Self::Received),
            "refunded" => Ok(Self::Refunded),
            other => Err(ReturnError::UnknownStatus(other.to_string())),
        }
    }
}

/// Errors raised by return requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnError {
    /// The order belongs to someone else.
    #[error("order {0} not found for this buyer")]
    NotBuyersOrder(OrderUuid),

    /// No reason was given.
    #[error("a return reason is required")]
    MissingReason,

    /// The return cannot move between these states.
    #[error("return cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: ReturnStatus,
        /// Requested state.
        to: ReturnStatus,
    },

    /// A stored status string is not recognised.
    #[error("unknown return status {0:?}")]
    UnknownStatus(String),

    /// The order refused the matching item transition.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ReturnError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotBuyersOrder(_) => ErrorKind::NotFound,
            Self::MissingReason => ErrorKind::Validation,
            Self::InvalidTransition { .. } => ErrorKind::Conflict,
            Self::UnknownStatus(_) => ErrorKind::Internal,
            Self::Lifecycle(error) => error.kind(),
        }
    }
}

/// A request to send an item back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    /// Return identifier.
    pub uuid: ReturnRequestUuid,

    /// Order the item belongs to.
    pub order: OrderUuid,

    /// The seller's sub-order, when known.
    pub sub_order: Option<SubOrderUuid>,

    /// Item being returned.
    pub item: OrderItemUuid,

    /// Product being returned.
    pub product: ProductUuid,

    /// Buyer returning it.
    pub buyer: UserUuid,

    /// Seller receiving it.
    pub seller: SellerUuid,

    /// Units returned.
    pub quantity: u64,

    /// Buyer's reason.
    pub reason: String,

    /// Current state.
    pub status: ReturnStatus,

    /// Administrator's note on the latest decision.
    pub admin_note: Option<String>,

    /// Amount owed back to the buyer.
    pub refund_amount: u64,

    /// When the buyer opened it.
    pub created_at: Timestamp,

    /// Last state change.
    pub updated_at: Timestamp,
}

impl ReturnRequest {
    /// Open a return of `quantity` units of `item`, moving the item to
    /// `return_requested`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReturnError`] if the order is not the buyer's, the reason is
    /// blank, or the order refuses the return.
    pub fn open(
        order: &mut Order,
        sub_order: Option<SubOrderUuid>,
        buyer: UserUuid,
        item: OrderItemUuid,
        quantity: u64,
        reason: &str,
        now: Timestamp,
    ) -> Result<Self, ReturnError> {
        if order.user != buyer {
            return Err(ReturnError::NotBuyersOrder(order.uuid));
        }

        let reason = reason.trim();

        if reason.is_empty() {
            return Err(ReturnError::MissingReason);
        }

        let refund_amount = order.request_return(item, quantity, now)?;

        let (product, seller) = order
            .item(item)
            .map(|order_item| (order_item.product, order_item.seller))
            .ok_or(LifecycleError::ItemNotFound(item))?;

        Ok(Self {
            uuid: ReturnRequestUuid::new(),
            order: order.uuid,
            sub_order,
            item,
            product,
            buyer,
            seller,
            quantity,
            reason: reason.to_string(),
            status: ReturnStatus::Requested,
            admin_note: None,
            refund_amount,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move the return to `next`, updating the item in `order` to match.
    ///
    /// Receipt hands back the stock to put on sale. Rejection puts the item
    /// back to `delivered`; refund marks it `returned`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReturnError`] if the transition is not allowed or the order
    /// refuses the matching item transition.
    pub fn advance(
        &mut self,
        order: &mut Order,
        next: ReturnStatus,
        note: Option<String>,
        now: Timestamp,
    ) -> Result<Option<StockRestore>, ReturnError> {
        if !self.status.can_transition_to(next) {
            return Err(ReturnError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let restock = match next {
            ReturnStatus::Rejected => {
                order.reject_return(self.item, now)?;
                None
            }
            ReturnStatus::Received => Some(StockRestore {
                product: self.product,
                quantity: self.quantity,
            }),
            ReturnStatus::Refunded => {
                order.complete_return(self.item, now)?;
                None
            }
            ReturnStatus::Requested | ReturnStatus::Approved => None,
        };

        self.status = next;

        if note.is_some() {
            self.admin_note = note;
        }

        self.updated_at = now;

        Ok(restock)
    }
}
