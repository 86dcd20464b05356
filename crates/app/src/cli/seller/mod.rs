use bazaar::ids::SellerUuid;
use bazaar_app::{
    config::AppConfig,
    domain::sellers::{SellersService, data::NewSeller, records::SellerRecord},
};
use clap::{Args, Subcommand};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct SellerCommand {
    #[command(subcommand)]
    command: SellerSubcommand,
}

#[derive(Debug, Subcommand)]
enum SellerSubcommand {
    /// Register a seller
    Create(CreateSellerArgs),

    /// Mark a seller verified so their products can be sold
    Verify(VerifySellerArgs),
}

#[derive(Debug, Args)]
struct CreateSellerArgs {
    /// Store display name
    #[arg(long)]
    store_name: String,

    /// Optional seller UUID; generated when omitted
    #[arg(long)]
    seller_uuid: Option<Uuid>,

    #[command(flatten)]
    config: AppConfig,
}

#[derive(Debug, Args)]
struct VerifySellerArgs {
    /// Seller UUID
    #[arg(long)]
    seller_uuid: Uuid,

    /// Revoke verification instead of granting it
    #[arg(long)]
    revoke: bool,

    #[command(flatten)]
    config: AppConfig,
}

pub(crate) async fn run(command: SellerCommand) -> Result<(), String> {
    match command.command {
        SellerSubcommand::Create(args) => create(args).await,
        SellerSubcommand::Verify(args) => verify(args).await,
    }
}

async fn create(args: CreateSellerArgs) -> Result<(), String> {
    if args.store_name.trim().is_empty() {
        return Err("store_name cannot be empty".to_string());
    }

    let ctx = super::context(&args.config).await?;

    let seller = ctx
        .sellers
        .create_seller(NewSeller {
            uuid: args
                .seller_uuid
                .map_or_else(SellerUuid::new, SellerUuid::from_uuid),
            store_name: args.store_name.trim().to_string(),
            is_verified: false,
        })
        .await
        .map_err(|error| format!("failed to create seller: {error}"))?;

    print_seller(&seller);

    Ok(())
}

async fn verify(args: VerifySellerArgs) -> Result<(), String> {
    let ctx = super::context(&args.config).await?;

    let seller = ctx
        .sellers
        .set_seller_verified(SellerUuid::from_uuid(args.seller_uuid), !args.revoke)
        .await
        .map_err(|error| format!("failed to update seller: {error}"))?;

    print_seller(&seller);

    Ok(())
}

fn print_seller(seller: &SellerRecord) {
    println!("seller_uuid: {}", seller.uuid);
    println!("store_name: {}", seller.store_name);
    println!("verified: {}", seller.is_verified);
}
