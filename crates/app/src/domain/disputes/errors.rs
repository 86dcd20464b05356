//! Disputes service errors.

use bazaar::{ErrorKind, disputes::DisputeError};
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind as DbErrorKind},
};
use thiserror::Error;

use crate::{database::is_transaction_aborted, domain::orders::OrdersServiceError};

#[derive(Debug, Error)]
pub enum DisputesServiceError {
    #[error("dispute already exists")]
    AlreadyExists,

    #[error("dispute not found")]
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
    Dispute(#[from] DisputeError),

    #[error(transparent)]
    Orders(#[from] OrdersServiceError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl DisputesServiceError {
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
            Self::Dispute(error) => error.kind(),
            Self::Orders(error) => error.kind(),
            Self::Sql(_) => ErrorKind::Internal,
        }
    }
}

impl From<Error> for DisputesServiceError {
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

#[cfg(test)]
mod tests {
    use bazaar::disputes::DisputeStatus;

    use super::*;

    #[test]
    fn duplicate_disputes_are_conflicts() {
        assert_eq!(
            DisputesServiceError::from(DisputeError::AlreadyExists).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DisputesServiceError::from(DisputeError::Closed(DisputeStatus::Cancelled)).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn blank_reasons_are_validation_errors() {
        assert_eq!(
            DisputesServiceError::from(DisputeError::MissingReason).kind(),
            ErrorKind::Validation
        );
    }
}
