//! Returns service errors.

use bazaar::{ErrorKind, returns::ReturnError};
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind as DbErrorKind},
};
use thiserror::Error;

use crate::{database::is_transaction_aborted, domain::orders::OrdersServiceError};

#[derive(Debug, Error)]
pub enum ReturnsServiceError {
    #[error("return request already exists")]
    AlreadyExists,

    #[error("return request not found")]
    NotFound,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("transaction aborted by a concurrent update; retry")]
    TransactionAborted,

    #[error(transparent)]
    Return(#[from] ReturnError),

    #[error(transparent)]
    Orders(#[from] OrdersServiceError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl ReturnsServiceError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists => ErrorKind::Conflict,
            Self::NotFound => ErrorKind::NotFound,
            Self::InvalidReference | Self::MissingRequiredData | Self::InvalidData => {
                ErrorKind::Validation
            }
            Self::TransactionAborted => ErrorKind::TransactionAborted,
            Self::Return(error) => error.kind(),
            Self::Orders(error) => error.kind(),
            Self::Sql(_) => ErrorKind::Internal,
        }
    }
}

impl From<Error> for ReturnsServiceError {
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
