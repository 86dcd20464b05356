//! Order notifications

use async_trait::async_trait;
use bazaar::orders::Order;
use mockall::automock;
use tracing::info;

#[automock]
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Announce a newly placed order. Called after the order is committed;
    /// failures stay inside the notifier.
    async fn order_placed(&self, order: &Order);
}

/// Writes order events to the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl OrderNotifier for LoggingNotifier {
    async fn order_placed(&self, order: &Order) {
        info!(
            order_uuid = %order.uuid,
            user_uuid = %order.user,
            items = order.items.len(),
            sellers = order.sellers().len(),
            total_amount = order.totals.total_amount,
            "order placed"
        );
    }
}
