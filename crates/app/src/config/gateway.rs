//! Payment Gateway Config

use std::fmt;

use clap::Args;
use zeroize::Zeroize;

use crate::gateway::{GatewayKey, HttpGatewayConfig};

/// Payment gateway settings.
#[derive(Clone, Args)]
pub struct GatewayConfig {
    /// Payment gateway base URL
    #[arg(long, env = "GATEWAY_URL", default_value = "https://api.razorpay.com")]
    pub gateway_url: String,

    /// Payment gateway key id
    #[arg(long, env = "GATEWAY_KEY_ID", default_value = "")]
    pub gateway_key_id: String,

    /// Payment gateway key secret
    #[arg(long, env = "GATEWAY_KEY", hide_env_values = true, default_value = "")]
    pub gateway_key: String,

    /// Secret used to sign gateway webhooks
    #[arg(long, env = "GATEWAY_WEBHOOK_SECRET", hide_env_values = true, default_value = "")]
    pub gateway_webhook_secret: String,

    /// Provider name recorded on payments
    #[arg(long, env = "GATEWAY_PROVIDER", default_value = "razorpay")]
    pub gateway_provider: String,
}

impl GatewayConfig {
    /// Client settings for [`crate::gateway::HttpPaymentGateway`].
    #[must_use]
    pub fn http(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            base_url: self.gateway_url.trim_end_matches('/').to_string(),
            key_id: self.gateway_key_id.clone(),
            key_secret: GatewayKey::new(self.gateway_key.clone()),
            webhook_secret: GatewayKey::new(self.gateway_webhook_secret.clone()),
            provider: self.gateway_provider.clone(),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("gateway_url", &self.gateway_url)
            .field("gateway_key_id", &self.gateway_key_id)
            .field("gateway_key", &"**redacted**")
            .field("gateway_webhook_secret", &"**redacted**")
            .field("gateway_provider", &self.gateway_provider)
            .finish()
    }
}

impl Drop for GatewayConfig {
    fn drop(&mut self) {
        self.gateway_key.zeroize();
        self.gateway_webhook_secret.zeroize();
    }
}
