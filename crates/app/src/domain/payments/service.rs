//! Payments service.
//!
//! Gateway calls are made with no transaction open: the order is read and the
//! transaction committed before the call, and the result is recorded in a
//! fresh one afterwards.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bazaar::{ids::UserUuid, orders::OrderUuid};
use jiff::Timestamp;
use mockall::automock;
use rusty_money::{Money, iso::Currency};
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        orders::{OrdersServiceError, store::OrderStore},
        payments::{
            data::PaymentOutcome,
            errors::PaymentsServiceError,
            records::{PaymentRecord, PaymentRecordStatus},
            repository::{NewPayment, PgPaymentsRepository},
        },
    },
    gateway::{PaymentGateway, PaymentOrderRequest},
};

#[derive(Clone)]
pub struct PgPaymentsService {
    db: Db,
    gateway: Arc<dyn PaymentGateway>,
    currency: &'static Currency,
    repository: PgPaymentsRepository,
    store: OrderStore,
}

impl fmt::Debug for PgPaymentsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgPaymentsService")
            .field("db", &self.db)
            .field("currency", &self.currency.iso_alpha_code)
            .finish_non_exhaustive()
    }
}

impl PgPaymentsService {
    #[must_use]
    pub fn new(db: Db, gateway: Arc<dyn PaymentGateway>, currency: &'static Currency) -> Self {
        Self {
            db,
            gateway,
            currency,
            repository: PgPaymentsRepository::new(),
            store: OrderStore::new(),
        }
    }
}

#[async_trait]
impl PaymentsService for PgPaymentsService {
    #[tracing::instrument(
        name = "payments.service.start_payment",
        skip(self),
        fields(user_uuid = %user, order_uuid = %order),
        err
    )]
    async fn start_payment(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<PaymentRecord, PaymentsServiceError> {
        let mut tx = self.db.begin().await?;

        let placed = self.store.orders.get_order(&mut tx, order).await?;

        tx.commit().await?;

        if placed.user != user {
            return Err(OrdersServiceError::NotFound.into());
        }

        placed.check_payable()?;

        let amount = placed.totals.total_amount;
        let minor = i64::try_from(amount)
            .map_err(|_too_large| PaymentsServiceError::AmountOutOfRange)?;
        let provider = self.gateway.provider();

        let created = self
            .gateway
            .create_payment_order(PaymentOrderRequest {
                amount: Money::from_minor(minor, self.currency),
                reference: order.to_string(),
            })
            .await;

        let (provider_order_id, status, failure_reason) = match &created {
            Ok(payment_order) => (
                Some(payment_order.id.as_str()),
                PaymentRecordStatus::Pending,
                None,
            ),
            Err(error) => {
                warn!(order_uuid = %order, %error, "gateway refused payment");

                (None, PaymentRecordStatus::Failed, Some(error.to_string()))
            }
        };

        let mut tx = self.db.begin().await?;

        let record = self
            .repository
            .insert_payment(
                &mut tx,
                &NewPayment {
                    order,
                    user,
                    provider: &provider,
                    provider_order_id,
                    amount,
                    currency: self.currency.iso_alpha_code,
                    status,
                    failure_reason: failure_reason.as_deref(),
                },
                Timestamp::now(),
            )
            .await?;

        tx.commit().await?;

        info!(
            payment_uuid = %record.uuid,
            status = %record.status,
            "started payment"
        );

        Ok(record)
    }

    #[tracing::instrument(
        name = "payments.service.handle_webhook",
        skip(self, payload, signature, outcome),
        fields(provider_order_id = %provider_order_id),
        err
    )]
    async fn handle_webhook(
        &self,
        provider_order_id: String,
        payload: Vec<u8>,
        signature: String,
        outcome: PaymentOutcome,
    ) -> Result<PaymentRecord, PaymentsServiceError> {
        if !self.gateway.verify_webhook(&payload, &signature) {
            warn!(provider_order_id = %provider_order_id, "rejected unsigned webhook");

            return Err(PaymentsServiceError::InvalidSignature);
        }

        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let found = self
            .repository
            .get_payment_by_provider_order(&mut tx, &provider_order_id)
            .await?;

        let mut order = self.store.lock(&mut tx, found.order).await?;
        let payment = self.repository.lock_payment(&mut tx, found.uuid).await?;

        if payment.status != PaymentRecordStatus::Pending {
            return Err(PaymentsServiceError::AlreadySettled(payment.status));
        }

        let (status, failure_reason) = match &outcome {
            PaymentOutcome::Approved => {
                match order.record_prepayment(now) {
                    Ok(()) => self.store.save(&mut tx, &mut order).await?,
                    Err(error) => {
                        // The money arrived after the order stopped taking
                        // payment, so it goes back to the buyer's wallet.
                        warn!(
                            order_uuid = %order.uuid,
                            payment_uuid = %payment.uuid,
                            %error,
                            "approved payment for an order that is no longer payable"
                        );

                        self.store
                            .refund_to_wallet(&mut tx, order.user, payment.amount, order.uuid, now)
                            .await?;
                    }
                }

                (PaymentRecordStatus::Approved, None)
            }
            PaymentOutcome::Failed { reason } => {
                (PaymentRecordStatus::Failed, Some(reason.as_str()))
            }
        };

        let settled = self
            .repository
            .settle_payment(&mut tx, payment.uuid, status, failure_reason, now)
            .await?
            .ok_or(PaymentsServiceError::AlreadySettled(payment.status))?;

        tx.commit().await?;

        info!(
            payment_uuid = %settled.uuid,
            order_uuid = %settled.order,
            status = %settled.status,
            "settled payment"
        );

        Ok(settled)
    }

    async fn list_payments(
        &self,
        order: OrderUuid,
    ) -> Result<Vec<PaymentRecord>, PaymentsServiceError> {
        let mut tx = self.db.begin().await?;

        let payments = self.repository.list_order_payments(&mut tx, order).await?;

        tx.commit().await?;

        Ok(payments)
    }
}

#[automock]
#[async_trait]
pub trait PaymentsService: Send + Sync {
    /// Asks the gateway to collect a prepaid order's total. A gateway failure
    /// is recorded as a failed payment and leaves the order untouched.
    async fn start_payment(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<PaymentRecord, PaymentsServiceError>;

    /// Applies a signed gateway notification to a pending payment, marking
    /// the order paid on approval. An approval for an order that can no
    /// longer take payment is still recorded and credited to the buyer's
    /// wallet.
    async fn handle_webhook(
        &self,
        provider_order_id: String,
        payload: Vec<u8>,
        signature: String,
        outcome: PaymentOutcome,
    ) -> Result<PaymentRecord, PaymentsServiceError>;

    /// Lists the payment attempts for an order.
    async fn list_payments(
        &self,
        order: OrderUuid,
    ) -> Result<Vec<PaymentRecord>, PaymentsServiceError>;
}
