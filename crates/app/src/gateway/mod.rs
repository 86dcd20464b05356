//! Payment gateway
//!
//! The marketplace talks to an external card processor through
//! [`PaymentGateway`]. Calls go over the network, so services make them with
//! no database transaction open.

use std::fmt;

use async_trait::async_trait;
use mockall::automock;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use zeroize::Zeroize;

mod http;
mod signature;

pub use http::{HttpGatewayConfig, HttpPaymentGateway};
pub use signature::{hmac_sha256_hex, verify_hmac_sha256_hex};

/// A secret shared with the gateway. Wiped from memory on drop.
#[derive(Clone, Default)]
pub struct GatewayKey(String);

impl GatewayKey {
    #[must_use]
    pub const fn new(secret: String) -> Self {
        Self(secret)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for GatewayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GatewayKey(**redacted**)")
    }
}

impl Drop for GatewayKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Ask the gateway to collect `amount` for the order named by `reference`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOrderRequest {
    /// Amount to collect.
    pub amount: Money<'static, Currency>,

    /// Our reference for the purchase, echoed back in webhooks.
    pub reference: String,
}

/// The gateway's side of a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrder {
    /// Gateway-assigned identifier.
    pub id: String,

    /// Gateway status string, e.g. `created`.
    pub status: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected gateway response: {0}")]
    UnexpectedResponse(String),

    #[error("payment amount must be positive")]
    InvalidAmount,
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Name recorded against payments made through this gateway.
    fn provider(&self) -> String;

    /// Create a purchase the buyer can then pay for.
    async fn create_payment_order(
        &self,
        request: PaymentOrderRequest,
    ) -> Result<PaymentOrder, GatewayError>;

    /// Check a webhook body against the signature the gateway sent with it.
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> bool;
}
