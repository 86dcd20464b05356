//! Application configuration

use clap::Args;

pub mod database;
pub mod gateway;
pub mod logging;
pub mod pricing;

pub use database::DatabaseConfig;
pub use gateway::GatewayConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use pricing::{PricingConfig, PricingConfigError};

/// Everything needed to build an [`crate::context::AppContext`].
#[derive(Debug, Args)]
pub struct AppConfig {
    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Tax, shipping and commission settings.
    #[command(flatten)]
    pub pricing: PricingConfig,

    /// Payment gateway settings.
    #[command(flatten)]
    pub gateway: GatewayConfig,
}
