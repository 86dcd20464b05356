//! HTTP client for a Razorpay-style orders API.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, header::AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::gateway::{
    GatewayError, GatewayKey, PaymentGateway, PaymentOrder, PaymentOrderRequest,
    signature::verify_hmac_sha256_hex,
};

/// Settings for [`HttpPaymentGateway`].
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// API base URL without a trailing slash, e.g. `"https://api.razorpay.com"`.
    pub base_url: String,

    /// Public key id.
    pub key_id: String,

    /// Key secret, sent as the basic-auth password.
    pub key_secret: GatewayKey,

    /// Secret the gateway signs webhook bodies with.
    pub webhook_secret: GatewayKey,

    /// Provider name recorded on payments.
    pub provider: String,
}

#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    config: HttpGatewayConfig,
    http: Client,
}

impl HttpPaymentGateway {
    #[must_use]
    pub fn new(config: HttpGatewayConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn authorization(&self) -> String {
        let credentials = format!(
            "{}:{}",
            self.config.key_id,
            self.config.key_secret.expose()
        );

        format!("Basic {}", BASE64.encode(credentials))
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    fn provider(&self) -> String {
        self.config.provider.clone()
    }

    async fn create_payment_order(
        &self,
        request: PaymentOrderRequest,
    ) -> Result<PaymentOrder, GatewayError> {
        let amount = request.amount.to_minor_units();

        if amount <= 0 {
            return Err(GatewayError::InvalidAmount);
        }

        let url = format!("{}/v1/orders", self.config.base_url);

        let body = serde_json::json!({
            "amount": amount,
            "currency": request.amount.currency().iso_alpha_code,
            "receipt": request.reference,
        });

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.authorization())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(GatewayError::UnexpectedResponse(format!(
                "order request failed with status {status}: {text}"
            )));
        }

        let parsed: OrderResponse = response.json().await?;

        debug!(provider_order_id = %parsed.id, "created gateway order");

        Ok(PaymentOrder {
            id: parsed.id,
            status: parsed.status,
        })
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> bool {
        if self.config.webhook_secret.is_empty() {
            warn!("webhook secret is not configured; rejecting webhook");

            return false;
        }

        verify_hmac_sha256_hex(
            self.config.webhook_secret.expose().as_bytes(),
            payload,
            signature,
        )
    }
}
