//! Payment data.

/// What the gateway reported for a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The buyer paid.
    Approved,

    /// The payment did not go through.
    Failed {
        /// Gateway explanation.
        reason: String,
    },
}
