use bazaar_app::{
    config::{AppConfig, LoggingConfig},
    context::AppContext,
};
use clap::{Parser, Subcommand};

mod coupon;
mod db;
mod order;
mod product;
mod seller;

#[derive(Debug, Parser)]
#[command(name = "bazaar", about = "Bazaar marketplace CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    Seller(seller::SellerCommand),
    Product(product::ProductCommand),
    Coupon(coupon::CouponCommand),
    Order(order::OrderCommand),
}

impl Cli {
    pub(crate) const fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::Seller(command) => seller::run(command).await,
            Commands::Product(command) => product::run(command).await,
            Commands::Coupon(command) => coupon::run(command).await,
            Commands::Order(command) => order::run(command).await,
        }
    }
}

pub(crate) async fn context(config: &AppConfig) -> Result<AppContext, String> {
    AppContext::from_config(config)
        .await
        .map_err(|error| format!("failed to start: {error}"))
}
