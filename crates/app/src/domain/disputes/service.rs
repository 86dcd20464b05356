//! Disputes service.

use async_trait::async_trait;
use bazaar::{
    disputes::{Dispute, DisputeOutcome, DisputeUuid},
    ids::UserUuid,
    orders::{OrderItemUuid, OrderUuid},
};
use jiff::Timestamp;
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::{
        disputes::{errors::DisputesServiceError, repository::PgDisputesRepository},
        orders::store::{Effects, OrderStore},
    },
};

#[derive(Debug, Clone)]
pub struct PgDisputesService {
    db: Db,
    repository: PgDisputesRepository,
    store: OrderStore,
}

impl PgDisputesService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgDisputesRepository::new(),
            store: OrderStore::new(),
        }
    }
}

#[async_trait]
impl DisputesService for PgDisputesService {
    #[tracing::instrument(
        name = "disputes.service.open_dispute",
        skip(self, reason),
        fields(user_uuid = %user, order_uuid = %order),
        err
    )]
    async fn open_dispute(
        &self,
        user: UserUuid,
        order: OrderUuid,
        item: Option<OrderItemUuid>,
        reason: String,
    ) -> Result<Dispute, DisputesServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let locked = self.store.lock(&mut tx, order).await?;

        let existing = self.repository.list_order_disputes(&mut tx, order).await?;

        let seller = item.and_then(|uuid| locked.item(uuid)).map(|i| i.seller);
        let sub_order = match seller {
            Some(seller) => self.store.sub_order_for(&mut tx, order, seller).await?,
            None => None,
        };

        let dispute = Dispute::open(&locked, sub_order, user, item, &reason, &existing, now)?;

        self.repository.insert_dispute(&mut tx, &dispute).await?;

        tx.commit().await?;

        info!(dispute_uuid = %dispute.uuid, "opened dispute");

        Ok(dispute)
    }

    #[tracing::instrument(
        name = "disputes.service.mark_in_review",
        skip(self),
        fields(dispute_uuid = %dispute),
        err
    )]
    async fn mark_in_review(&self, dispute: DisputeUuid) -> Result<Dispute, DisputesServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let mut current = self.repository.lock_dispute(&mut tx, dispute).await?;

        current.mark_in_review(now)?;

        self.repository.update_dispute(&mut tx, &current).await?;

        tx.commit().await?;

        info!(dispute_uuid = %dispute, "dispute in review");

        Ok(current)
    }

    #[tracing::instrument(
        name = "disputes.service.resolve_dispute",
        skip(self, resolution),
        fields(dispute_uuid = %dispute, outcome = ?outcome, refunded = tracing::field::Empty),
        err
    )]
    async fn resolve_dispute(
        &self,
        dispute: DisputeUuid,
        outcome: DisputeOutcome,
        resolution: Option<String>,
    ) -> Result<Dispute, DisputesServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self.repository.get_dispute(&mut tx, dispute).await?.order;

        let mut locked = self.store.lock(&mut tx, order).await?;
        let mut current = self.repository.lock_dispute(&mut tx, dispute).await?;

        let refunded = current.resolve(&mut locked, outcome, resolution, now)?;

        let refund = if refunded {
            current
                .item
                .and_then(|item| locked.item(item))
                .map_or(0, |item| item.subtotal)
        } else {
            0
        };

        tracing::Span::current().record("refunded", refund);

        self.store
            .apply(
                &mut tx,
                &mut locked,
                &Effects {
                    refund,
                    ..Effects::default()
                },
                now,
            )
            .await?;
        self.repository.update_dispute(&mut tx, &current).await?;

        tx.commit().await?;

        info!(dispute_uuid = %dispute, status = %current.status, "resolved dispute");

        Ok(current)
    }

    async fn list_disputes(&self, order: OrderUuid) -> Result<Vec<Dispute>, DisputesServiceError> {
        let mut tx = self.db.begin().await?;

        let disputes = self.repository.list_order_disputes(&mut tx, order).await?;

        tx.commit().await?;

        Ok(disputes)
    }
}

#[automock]
#[async_trait]
pub trait DisputesService: Send + Sync {
    /// Opens a dispute on an order, or on one shipped item of it. A buyer can
    /// dispute each order or item once.
    async fn open_dispute(
        &self,
        user: UserUuid,
        order: OrderUuid,
        item: Option<OrderItemUuid>,
        reason: String,
    ) -> Result<Dispute, DisputesServiceError>;

    /// Takes an open dispute into review.
    async fn mark_in_review(&self, dispute: DisputeUuid) -> Result<Dispute, DisputesServiceError>;

    /// Decides a dispute. Deciding for the buyer on a dispatched item refunds
    /// it to the buyer's wallet.
    async fn resolve_dispute(
        &self,
        dispute: DisputeUuid,
        outcome: DisputeOutcome,
        resolution: Option<String>,
    ) -> Result<Dispute, DisputesServiceError>;

    /// Lists the disputes raised against an order.
    async fn list_disputes(&self, order: OrderUuid) -> Result<Vec<Dispute>, DisputesServiceError>;
}
