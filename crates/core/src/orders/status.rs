//! Order, item and payment states

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Fulfilment state of a single order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Placed, not yet handled by the seller.
    Pending,

    /// Being prepared by the seller.
    Processing,

    /// Handed to a carrier.
    Shipped,

    /// Received by the buyer.
    Delivered,

    /// Cancelled before shipping.
    Cancelled,

    /// The buyer asked to return it.
    ReturnRequested,

    /// Returned to the seller.
    Returned,

    /// Refunded by an administrator.
    Refunded,
}

impl ItemStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::ReturnRequested => "return_requested",
            Self::Returned => "returned",
            Self::Refunded => "refunded",
        }
    }

    /// Whether an item may move from `self` to `next`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Pending,
                Self::Processing | Self::Shipped | Self::Cancelled | Self::Refunded
            ) | (Self::Processing, Self::Shipped | Self::Refunded)
                | (
                    Self::Shipped,
                    Self::Delivered | Self::Returned | Self::Refunded
                )
                | (
                    Self::Delivered,
                    Self::ReturnRequested | Self::Returned | Self::Refunded
                )
                | (
                    Self::ReturnRequested,
                    Self::Delivered | Self::Returned | Self::Refunded
                )
        )
    }

    /// Whether the item has left the seller's hands.
    pub const fn is_dispatched(self) -> bool {
        matches!(self, Self::Shipped | Self::Delivered)
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Whether money for an item has been collected from the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentCollectionStatus {
    /// Not yet collected.
    Pending,

    /// Collected (cash on delivery confirmed by the seller).
    Collected,

    /// Returned to the buyer.
    Refunded,

    /// Never to be collected.
    Cancelled,
}

impl PaymentCollectionStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Collected => "collected",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Rolled-up state of an order or sub-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// No item has progressed yet.
    Pending,

    /// At least one item is being fulfilled.
    Processing,

    /// Every item delivered.
    Completed,

    /// Every item cancelled.
    Cancelled,

    /// Refunded by an administrator.
    Refunded,
}

impl OrderStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown order status {other:?}")),
        }
    }
}

/// How the buyer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,

    /// Card through the payment gateway.
    Card,

    /// Marketplace wallet balance.
    Wallet,
}

impl PaymentMethod {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Card => "card",
            Self::Wallet => "wallet",
        }
    }
}

/// Whether the buyer has paid for the order as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting payment.
    Pending,

    /// Paid in full.
    Paid,

    /// Refunded.
    Refunded,
}

impl PaymentStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }
}

/// Whether the marketplace still holds the buyer's money for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// Held until the buyer confirms delivery.
    Held,

    /// Released towards the seller.
    Released,

    /// Returned to the buyer.
    Refunded,

    /// Escrow does not apply.
    NotApplicable,
}

/// Whether the seller can be paid out for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Not yet payable.
    NotEligible,

    /// Payable on the next payout run.
    Eligible,

    /// Included in a pending payout.
    Queued,

    /// Paid to the seller.
    Paid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_fulfilment_path_is_allowed() {
        assert!(ItemStatus::Pending.can_transition_to(ItemStatus::Processing));
        assert!(ItemStatus::Processing.can_transition_to(ItemStatus::Shipped));
        assert!(ItemStatus::Shipped.can_transition_to(ItemStatus::Delivered));
        assert!(ItemStatus::Delivered.can_transition_to(ItemStatus::ReturnRequested));
        assert!(ItemStatus::ReturnRequested.can_transition_to(ItemStatus::Returned));
    }

    #[test]
    fn backwards_moves_are_rejected() {
        assert!(!ItemStatus::Shipped.can_transition_to(ItemStatus::Processing));
        assert!(!ItemStatus::Delivered.can_transition_to(ItemStatus::Shipped));
        assert!(!ItemStatus::Processing.can_transition_to(ItemStatus::Cancelled));
    }

    #[test]
    fn terminal_states_go_nowhere() {
        for terminal in [
            ItemStatus::Cancelled,
            ItemStatus::Returned,
            ItemStatus::Refunded,
        ] {
            for next in [
                ItemStatus::Pending,
                ItemStatus::Processing,
                ItemStatus::Shipped,
                ItemStatus::Delivered,
                ItemStatus::Refunded,
            ] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal} should not move to {next}"
                );
            }
        }
    }

    #[test]
    fn order_status_parses_its_own_names() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(OrderStatus::try_from(status.as_str()), Ok(status));
        }
    }
}
