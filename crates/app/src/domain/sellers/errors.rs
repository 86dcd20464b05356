//! Sellers service errors.

use bazaar::ErrorKind;
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind as DbErrorKind},
};
use thiserror::Error;

use crate::database::is_transaction_aborted;

#[derive(Debug, Error)]
pub enum SellersServiceError {
    #[error("seller already exists")]
    AlreadyExists,

    #[error("seller not found")]
    NotFound,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("transaction aborted by a concurrent update; retry")]
    TransactionAborted,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl SellersServiceError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists => ErrorKind::Conflict,
            Self::NotFound => ErrorKind::NotFound,
            Self::MissingRequiredData | Self::InvalidData => ErrorKind::Validation,
            Self::TransactionAborted => ErrorKind::TransactionAborted,
            Self::Sql(_) => ErrorKind::Internal,
        }
    }
}

impl From<Error> for SellersServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        if is_transaction_aborted(&error) {
            return Self::TransactionAborted;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(DbErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(DbErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(DbErrorKind::CheckViolation) => Self::InvalidData,
            Some(DbErrorKind::ForeignKeyViolation | DbErrorKind::Other | _) | None => {
                Self::Sql(error)
            }
        }
    }
}
