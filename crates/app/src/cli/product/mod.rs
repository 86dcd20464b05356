use bazaar::{
    catalog::{ProductStatus, ProductUuid},
    ids::{CategoryUuid, SellerUuid},
};
use bazaar_app::{
    config::AppConfig,
    domain::products::{ProductsService, data::NewProduct},
};
use clap::{Args, Subcommand};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct ProductCommand {
    #[command(subcommand)]
    command: ProductSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductSubcommand {
    /// List an approved product for a seller
    Create(CreateProductArgs),
}

#[derive(Debug, Args)]
struct CreateProductArgs {
    /// Owning seller UUID
    #[arg(long)]
    seller_uuid: Uuid,

    /// Product name
    #[arg(long)]
    name: String,

    /// Unit price in minor units
    #[arg(long)]
    price: u64,

    /// Units on the shelf
    #[arg(long, default_value_t = 0)]
    quantity: u64,

    /// Optional category UUID
    #[arg(long)]
    category_uuid: Option<Uuid>,

    /// Exempt the product from tax
    #[arg(long)]
    tax_exempt: bool,

    #[command(flatten)]
    config: AppConfig,
}

pub(crate) async fn run(command: ProductCommand) -> Result<(), String> {
    match command.command {
        ProductSubcommand::Create(args) => create(args).await,
    }
}

async fn create(args: CreateProductArgs) -> Result<(), String> {
    let ctx = super::context(&args.config).await?;

    let product = ctx
        .products
        .create_product(NewProduct {
            uuid: ProductUuid::new(),
            seller: SellerUuid::from_uuid(args.seller_uuid),
            category: args.category_uuid.map(CategoryUuid::from_uuid),
            name: args.name,
            price: args.price,
            quantity: args.quantity,
            status: ProductStatus::Approved,
            is_taxable: !args.tax_exempt,
        })
        .await
        .map_err(|error| format!("failed to create product: {error}"))?;

    println!("product_uuid: {}", product.uuid);
    println!("name: {}", product.name);
    println!("price: {}", product.price);
    println!("quantity: {}", product.quantity);

    Ok(())
}
