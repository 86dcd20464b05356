use bazaar::{
    coupons::{CouponCreator, CouponDiscount, CouponScope, CouponUuid},
    ids::{AdminUuid, SellerUuid},
};
use bazaar_app::{
    config::AppConfig,
    domain::coupons::{CouponsService, data::NewCoupon},
};
use clap::{Args, Subcommand, ValueEnum};
use jiff::Timestamp;
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct CouponCommand {
    #[command(subcommand)]
    command: CouponSubcommand,
}

#[derive(Debug, Subcommand)]
enum CouponSubcommand {
    /// Define a coupon
    Create(CreateCouponArgs),

    /// List every coupon, or one seller's, including inactive ones
    List(ListCouponsArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ScopeArg {
    /// One discount over all qualifying lines
    Order,

    /// A discount on each qualifying line
    Items,
}

#[derive(Debug, Args)]
#[group(id = "discount", required = true, multiple = false)]
struct DiscountArgs {
    /// Whole-number percentage off
    #[arg(long)]
    percentage: Option<u16>,

    /// Fixed amount off, in minor units
    #[arg(long)]
    amount: Option<u64>,
}

#[derive(Debug, Args)]
struct CreateCouponArgs {
    /// Code buyers type; stored upper-case
    #[arg(long)]
    code: String,

    #[command(flatten)]
    discount: DiscountArgs,

    /// Where the discount is taken
    #[arg(long, value_enum, default_value_t = ScopeArg::Order)]
    scope: ScopeArg,

    /// Seller issuing the coupon; an admin coupon when omitted
    #[arg(long)]
    seller_uuid: Option<Uuid>,

    /// Smallest eligible subtotal, in minor units
    #[arg(long, default_value_t = 0)]
    min_cart_value: u64,

    /// Largest discount one redemption can give, in minor units
    #[arg(long)]
    max_discount: Option<u64>,

    /// Total redemptions allowed
    #[arg(long, default_value_t = 1)]
    max_usage: u32,

    /// Redemptions allowed per buyer
    #[arg(long, default_value_t = 1)]
    max_usage_per_user: u32,

    /// Allow combining with other coupons
    #[arg(long)]
    stackable: bool,

    /// Most coupons an order may combine this one with
    #[arg(long, default_value_t = 1)]
    max_stack_per_order: u32,

    /// Expiry as an RFC 3339 timestamp
    #[arg(long)]
    expires_at: Option<Timestamp>,

    #[command(flatten)]
    config: AppConfig,
}

#[derive(Debug, Args)]
struct ListCouponsArgs {
    /// Only coupons that apply to this seller
    #[arg(long)]
    seller_uuid: Option<Uuid>,

    #[command(flatten)]
    config: AppConfig,
}

pub(crate) async fn run(command: CouponCommand) -> Result<(), String> {
    match command.command {
        CouponSubcommand::Create(args) => create(args).await,
        CouponSubcommand::List(args) => list(args).await,
    }
}

async fn create(args: CreateCouponArgs) -> Result<(), String> {
    let discount = match (args.discount.percentage, args.discount.amount) {
        (Some(percentage), None) => CouponDiscount::PercentageOff { percentage },
        (None, Some(amount)) => CouponDiscount::FixedAmountOff { amount },
        _ => return Err("give exactly one of --percentage or --amount".to_string()),
    };

    let created_by = args.seller_uuid.map_or_else(
        || CouponCreator::Admin(AdminUuid::new()),
        |seller| CouponCreator::Seller(SellerUuid::from_uuid(seller)),
    );

    let ctx = super::context(&args.config).await?;

    let coupon = ctx
        .coupons
        .create_coupon(NewCoupon {
            uuid: CouponUuid::new(),
            code: args.code,
            description: None,
            discount,
            scope: match args.scope {
                ScopeArg::Order => CouponScope::Order,
                ScopeArg::Items => CouponScope::Items,
            },
            sellers: Vec::new(),
            applicable_products: Vec::new(),
            applicable_categories: Vec::new(),
            min_cart_value: args.min_cart_value,
            max_discount: args.max_discount,
            max_usage: args.max_usage,
            max_usage_per_user: args.max_usage_per_user,
            stackable: args.stackable,
            max_stack_per_order: args.max_stack_per_order,
            expires_at: args.expires_at,
            is_active: true,
            created_by,
        })
        .await
        .map_err(|error| format!("failed to create coupon: {error}"))?;

    println!("coupon_uuid: {}", coupon.uuid);
    println!("code: {}", coupon.code);
    println!("discount: {}", coupon.discount.type_as_str());

    Ok(())
}

async fn list(args: ListCouponsArgs) -> Result<(), String> {
    let ctx = super::context(&args.config).await?;

    let coupons = match args.seller_uuid {
        Some(seller) => {
            ctx.coupons
                .list_seller_coupons(SellerUuid::from_uuid(seller))
                .await
        }
        None => ctx.coupons.list_all_coupons().await,
    }
    .map_err(|error| format!("failed to list coupons: {error}"))?;

    for coupon in &coupons {
        println!(
            "{} {} active={} used={}/{}",
            coupon.uuid, coupon.code, coupon.is_active, coupon.used_count, coupon.max_usage,
        );
    }

    Ok(())
}
