use bazaar::orders::OrderUuid;
use bazaar_app::{config::AppConfig, domain::orders::OrdersService};
use clap::{Args, Subcommand};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct OrderCommand {
    #[command(subcommand)]
    command: OrderSubcommand,
}

#[derive(Debug, Subcommand)]
enum OrderSubcommand {
    /// Print an order with its items and per-seller sub-orders
    Show(ShowOrderArgs),

    /// List every order, newest first
    List(ListOrdersArgs),

    /// Delete an order, restocking items still outstanding
    Delete(DeleteOrderArgs),
}

#[derive(Debug, Args)]
struct ShowOrderArgs {
    /// Order UUID
    #[arg(long)]
    order_uuid: Uuid,

    #[command(flatten)]
    config: AppConfig,
}

#[derive(Debug, Args)]
struct ListOrdersArgs {
    #[command(flatten)]
    config: AppConfig,
}

#[derive(Debug, Args)]
struct DeleteOrderArgs {
    /// Order UUID
    #[arg(long)]
    order_uuid: Uuid,

    #[command(flatten)]
    config: AppConfig,
}

pub(crate) async fn run(command: OrderCommand) -> Result<(), String> {
    match command.command {
        OrderSubcommand::Show(args) => show(args).await,
        OrderSubcommand::List(args) => list(args).await,
        OrderSubcommand::Delete(args) => delete(args).await,
    }
}

async fn show(args: ShowOrderArgs) -> Result<(), String> {
    let ctx = super::context(&args.config).await?;
    let uuid = OrderUuid::from_uuid(args.order_uuid);

    let order = ctx
        .orders
        .get_order(uuid)
        .await
        .map_err(|error| format!("failed to load order: {error}"))?;

    let sub_orders = ctx
        .orders
        .list_sub_orders(uuid)
        .await
        .map_err(|error| format!("failed to load sub-orders: {error}"))?;

    println!("order_uuid: {}", order.uuid);
    println!("user_uuid: {}", order.user);
    println!("order_status: {}", order.order_status);
    println!("payment_method: {}", order.payment_method.as_str());
    println!("payment_status: {}", order.payment_status.as_str());
    println!("merchandise_subtotal: {}", order.totals.merchandise_subtotal);
    println!("discounts: {}", order.totals.discounts);
    println!("taxes: {}", order.totals.taxes);
    println!("shipping_fee: {}", order.totals.shipping_fee);
    println!("total_amount: {}", order.totals.total_amount);

    for coupon in &order.applied_coupons {
        println!("coupon: {} -{}", coupon.code, coupon.discount);
    }

    for item in &order.items {
        println!(
            "item: {} product={} seller={} qty={} subtotal={} status={} tracking={}",
            item.uuid,
            item.product,
            item.seller,
            item.quantity,
            item.subtotal,
            item.status,
            item.tracking_number,
        );
    }

    for sub_order in &sub_orders {
        println!(
            "sub_order: {} seller={} total={} commission={} earning={} status={}",
            sub_order.uuid,
            sub_order.seller,
            sub_order.totals.total_amount,
            sub_order.commission_amount,
            sub_order.seller_earning,
            sub_order.status,
        );
    }

    Ok(())
}

async fn list(args: ListOrdersArgs) -> Result<(), String> {
    let ctx = super::context(&args.config).await?;

    let orders = ctx
        .orders
        .list_all_orders()
        .await
        .map_err(|error| format!("failed to list orders: {error}"))?;

    for order in &orders {
        println!(
            "{} user={} status={} payment={} total={}",
            order.uuid,
            order.user,
            order.order_status,
            order.payment_status.as_str(),
            order.totals.total_amount,
        );
    }

    Ok(())
}

async fn delete(args: DeleteOrderArgs) -> Result<(), String> {
    let ctx = super::context(&args.config).await?;

    ctx.orders
        .delete_order(OrderUuid::from_uuid(args.order_uuid))
        .await
        .map_err(|error| format!("failed to delete order: {error}"))?;

    println!("deleted order {}", args.order_uuid);

    Ok(())
}
