//! Payments service errors.

use bazaar::{ErrorKind, orders::LifecycleError};
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind as DbErrorKind},
};
use thiserror::Error;

use crate::{
    database::is_transaction_aborted,
    domain::{orders::OrdersServiceError, payments::records::PaymentRecordStatus},
};

#[derive(Debug, Error)]
pub enum PaymentsServiceError {
    #[error("payment already exists")]
    AlreadyExists,

    #[error("payment not found")]
    NotFound,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("transaction aborted by a concurrent update; retry")]
    TransactionAborted,

    #[error("webhook signature does not match")]
    InvalidSignature,

    #[error("payment is already {0}")]
    AlreadySettled(PaymentRecordStatus),

    #[error("order total does not fit the payment amount")]
    AmountOutOfRange,

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Orders(#[from] OrdersServiceError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl PaymentsServiceError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists | Self::AlreadySettled(_) => ErrorKind::Conflict,
            Self::NotFound => ErrorKind::NotFound,
            Self::InvalidReference
            | Self::MissingRequiredData
            | Self::InvalidData
            | Self::InvalidSignature => ErrorKind::Validation,
            Self::TransactionAborted => ErrorKind::TransactionAborted,
            Self::Lifecycle(error) => error.kind(),
            Self::Orders(error) => error.kind(),
            Self::AmountOutOfRange | Self::Sql(_) => ErrorKind::Internal,
        }
    }
}

impl From<Error> for PaymentsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        if is_transaction_aborted(&error) {
            return Self::TransactionAborted;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(DbErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(DbErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(DbErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(DbErrorKind::CheckViolation) => Self::InvalidData,
            Some(DbErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
