//! Coupons service errors.

use bazaar::{ErrorKind, catalog::CatalogError, coupons::CouponError};
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind as DbErrorKind},
};
use thiserror::Error;

use crate::database::is_transaction_aborted;

#[derive(Debug, Error)]
pub enum CouponsServiceError {
    #[error("coupon already exists")]
    AlreadyExists,

    #[error("coupon not found")]
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
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl CouponsServiceError {
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
            Self::Coupon(error) => error.kind(),
            Self::Catalog(error) => error.kind(),
            Self::Sql(_) => ErrorKind::Internal,
        }
    }
}

impl From<Error> for CouponsServiceError {
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
    use super::*;

    #[test]
    fn coupon_rejections_keep_their_kind() {
        let error = CouponsServiceError::from(CouponError::Expired("OLD".to_string()));

        assert_eq!(error.kind(), ErrorKind::Conflict);
        assert_eq!(error.to_string(), "coupon OLD has expired");
    }

    #[test]
    fn unknown_codes_are_not_found() {
        let error = CouponsServiceError::from(CouponError::NotFound("NOPE".to_string()));

        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn missing_rows_map_to_not_found() {
        assert!(matches!(
            CouponsServiceError::from(Error::RowNotFound),
            CouponsServiceError::NotFound
        ));
    }
}
