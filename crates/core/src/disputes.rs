//! Disputes

use std::fmt::{Display, Formatter, Result as FmtResult};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    errors::ErrorKind,
    ids::{SellerUuid, TypedUuid, UserUuid},
    orders::{LifecycleError, Order, OrderItemUuid, OrderUuid, SubOrderUuid},
};

/// Dispute UUID
pub type DisputeUuid = TypedUuid<Dispute>;

/// Where a dispute stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    /// Opened by the buyer.
    Open,

    /// An administrator is looking at it.
    InReview,

    /// Settled for the buyer.
    ResolvedBuyer,

    /// Settled for the seller.
    ResolvedSeller,

    /// Withdrawn or dismissed.
    Cancelled,
}

impl DisputeStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InReview => "in_review",
            Self::ResolvedBuyer => "resolved_buyer",
            Self::ResolvedSeller => "resolved_seller",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the dispute still awaits a decision.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::InReview)
    }
}

impl Display for DisputeStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// An administrator's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    /// The buyer was right.
    Buyer,

    /// The seller was right.
    Seller,

    /// Nothing to decide.
    Cancelled,
}

impl From<DisputeOutcome> for DisputeStatus {
    fn from(outcome: DisputeOutcome) -> Self {
        match outcome {
            DisputeOutcome::Buyer => Self::ResolvedBuyer,
            DisputeOutcome::Seller => Self::ResolvedSeller,
            DisputeOutcome::Cancelled => Self::Cancelled,
        }
    }
}

/// Errors raised by disputes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisputeError {
    /// The order belongs to someone else.
    #[error("order {0} not found for this buyer")]
    NotBuyersOrder(OrderUuid),

    /// No reason was given.
    #[error("a dispute reason is required")]
    MissingReason,

    /// The item has not left the seller.
    #[error("order item {0} has not been shipped")]
    NotDispatched(OrderItemUuid),

    /// Nothing in the order has been shipped.
    #[error("nothing in order {0} has been shipped")]
    NothingDispatched(OrderUuid),

    /// The buyer already disputed this order or item.
    #[error("a dispute already exists for this order and item")]
    AlreadyExists,

    /// The dispute has already been decided.
    #[error("dispute is already {0}")]
    Closed(DisputeStatus),

    /// The order refused the matching item transition.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl DisputeError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotBuyersOrder(_) => ErrorKind::NotFound,
            Self::MissingReason => ErrorKind::Validation,
            Self::NotDispatched(_)
            | Self::NothingDispatched(_)
            | Self::AlreadyExists
            | Self::Closed(_) => ErrorKind::Conflict,
            Self::Lifecycle(error) => error.kind(),
        }
    }
}

/// A buyer's complaint about an order or one of its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Dispute identifier.
    pub uuid: DisputeUuid,

    /// Order disputed.
    pub order: OrderUuid,

    /// The seller's sub-order, when the dispute targets one seller.
    pub sub_order: Option<SubOrderUuid>,

    /// Item disputed; `None` for the order as a whole.
    pub item: Option<OrderItemUuid>,

    /// Buyer who opened it.
    pub opened_by: UserUuid,

    /// Seller the complaint is against, when there is exactly one.
    pub against_seller: Option<SellerUuid>,

    /// Buyer's reason.
    pub reason: String,

    /// Current state.
    pub status: DisputeStatus,

    /// Administrator's explanation of the decision.
    pub resolution: Option<String>,

    /// When it was opened.
    pub created_at: Timestamp,

    /// Last state change.
    pub updated_at: Timestamp,
}

impl Dispute {
    /// Open a dispute on `order`, or on one of its items.
    ///
    /// Items must have shipped; order-level disputes need at least one shipped
    /// item. `existing` holds the buyer's earlier disputes on this order.
    ///
    /// # Errors
    ///
    /// Returns a [`DisputeError`] if the order is not the buyer's, the reason
    /// is blank, nothing has shipped, or the buyer already disputed it.
    pub fn open(
        order: &Order,
        sub_order: Option<SubOrderUuid>,
        buyer: UserUuid,
        item: Option<OrderItemUuid>,
        reason: &str,
        existing: &[Self],
        now: Timestamp,
    ) -> Result<Self, DisputeError> {
        if order.user != buyer {
            return Err(DisputeError::NotBuyersOrder(order.uuid));
        }

        let reason = reason.trim();

        if reason.is_empty() {
            return Err(DisputeError::MissingReason);
        }

        if existing
            .iter()
            .any(|dispute| dispute.order == order.uuid && dispute.item == item && dispute.opened_by == buyer)
        {
            return Err(DisputeError::AlreadyExists);
        }

        let against_seller = match item {
            Some(uuid) => {
                let order_item = order.item(uuid).ok_or(LifecycleError::ItemNotFound(uuid))?;

                if !order_item.status.is_dispatched() {
                    return Err(DisputeError::NotDispatched(uuid));
                }

                Some(order_item.seller)
            }
            None => {
                if !order.items.iter().any(|i| i.status.is_dispatched()) {
                    return Err(DisputeError::NothingDispatched(order.uuid));
                }

                match order.sellers().as_slice() {
                    [only] => Some(*only),
                    _ => None,
                }
            }
        };

        Ok(Self {
            uuid: DisputeUuid::new(),
            order: order.uuid,
            sub_order,
            item,
            opened_by: buyer,
            against_seller,
            reason: reason.to_string(),
            status: DisputeStatus::Open,
            resolution: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Take an open dispute into review.
    ///
    /// # Errors
    ///
    /// Returns [`DisputeError::Closed`] unless the dispute is `open`.
    pub fn mark_in_review(&mut self, now: Timestamp) -> Result<(), DisputeError> {
        if self.status != DisputeStatus::Open {
            return Err(DisputeError::Closed(self.status));
        }

        self.status = DisputeStatus::InReview;
        self.updated_at = now;

        Ok(())
    }

    /// Decide the dispute.
    ///
    /// Deciding for the buyer on a shipped or delivered item marks it returned
    /// and refunded in `order`; returns whether that happened.
    ///
    /// # Errors
    ///
    /// Returns a [`DisputeError`] if the dispute was already decided.
    pub fn resolve(
        &mut self,
        order: &mut Order,
        outcome: DisputeOutcome,
        resolution: Option<String>,
        now: Timestamp,
    ) -> Result<bool, DisputeError> {
        if !self.status.is_open() {
            return Err(DisputeError::Closed(self.status));
        }

        let refunded = match (outcome, self.item) {
            (DisputeOutcome::Buyer, Some(item)) => order.resolve_for_buyer(item, now)?,
            _ => false,
        };

        self.status = outcome.into();
        self.resolution = resolution;
        self.updated_at = now;

        Ok(refunded)
    }
}
