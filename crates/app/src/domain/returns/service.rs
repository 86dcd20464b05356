//! Returns service.

use async_trait::async_trait;
use bazaar::{
    ids::UserUuid,
    orders::{OrderItemUuid, OrderUuid},
    returns::{ReturnRequest, ReturnRequestUuid, ReturnStatus},
};
use jiff::Timestamp;
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::{
        orders::{
            OrdersServiceError,
            store::{Effects, OrderStore},
        },
        returns::{errors::ReturnsServiceError, repository::PgReturnsRepository},
    },
};

#[derive(Debug, Clone)]
pub struct PgReturnsService {
    db: Db,
    repository: PgReturnsRepository,
    store: OrderStore,
}

impl PgReturnsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgReturnsRepository::new(),
            store: OrderStore::new(),
        }
    }
}

#[async_trait]
impl ReturnsService for PgReturnsService {
    #[tracing::instrument(
        name = "returns.service.request_return",
        skip(self, reason),
        fields(user_uuid = %user, order_uuid = %order, item_uuid = %item),
        err
    )]
    async fn request_return(
        &self,
        user: UserUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        quantity: u64,
        reason: String,
    ) -> Result<ReturnRequest, ReturnsServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let mut locked = self.store.lock(&mut tx, order).await?;

        let seller = locked
            .item(item)
            .map(|order_item| order_item.seller)
            .ok_or(OrdersServiceError::NotFound)?;

        let sub_order = self.store.sub_order_for(&mut tx, order, seller).await?;

        let request =
            ReturnRequest::open(&mut locked, sub_order, user, item, quantity, &reason, now)?;

        self.store.save(&mut tx, &mut locked).await?;
        self.repository
            .insert_return_request(&mut tx, &request)
            .await?;

        tx.commit().await?;

        info!(
            return_uuid = %request.uuid,
            refund_amount = request.refund_amount,
            "requested return"
        );

        Ok(request)
    }

    #[tracing::instrument(
        name = "returns.service.update_return_status",
        skip(self, note),
        fields(return_uuid = %request, status = %status),
        err
    )]
    async fn update_return_status(
        &self,
        request: ReturnRequestUuid,
        status: ReturnStatus,
        note: Option<String>,
    ) -> Result<ReturnRequest, ReturnsServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self
            .repository
            .get_return_request(&mut tx, request)
            .await?
            .order;

        let mut locked = self.store.lock(&mut tx, order).await?;
        let mut current = self.repository.lock_return_request(&mut tx, request).await?;

        let restock = current.advance(&mut locked, status, note, now)?;

        let effects = Effects {
            restocks: restock.into_iter().collect(),
            refund: if status == ReturnStatus::Refunded {
                current.refund_amount
            } else {
                0
            },
            restore_coupons: false,
        };

        self.store.apply(&mut tx, &mut locked, &effects, now).await?;
        self.repository
            .update_return_request(&mut tx, &current)
            .await?;

        tx.commit().await?;

        info!(return_uuid = %request, status = %status, "updated return");

        Ok(current)
    }

    async fn list_returns(
        &self,
        order: OrderUuid,
    ) -> Result<Vec<ReturnRequest>, ReturnsServiceError> {
        let mut tx = self.db.begin().await?;

        let requests = self
            .repository
            .list_order_return_requests(&mut tx, order)
            .await?;

        tx.commit().await?;

        Ok(requests)
    }
}

#[automock]
#[async_trait]
pub trait ReturnsService: Send + Sync {
    /// Asks to send back some units of a delivered item.
    async fn request_return(
        &self,
        user: UserUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        quantity: u64,
        reason: String,
    ) -> Result<ReturnRequest, ReturnsServiceError>;

    /// Moves a return forward. Receipt restocks the units; refund credits the
    /// buyer's wallet.
    async fn update_return_status(
        &self,
        request: ReturnRequestUuid,
        status: ReturnStatus,
        note: Option<String>,
    ) -> Result<ReturnRequest, ReturnsServiceError>;

    /// Lists the returns raised against an order.
    async fn list_returns(&self, order: OrderUuid)
    -> Result<Vec<ReturnRequest>, ReturnsServiceError>;
}
