//! Orders service errors.

use bazaar::{
    ErrorKind,
    catalog::{CatalogError, ProductUuid},
    orders::{AssemblyError, LifecycleError},
    pricing::PricingError,
};
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind as DbErrorKind},
};
use thiserror::Error;

use crate::{database::is_transaction_aborted, domain::coupons::CouponsServiceError};

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("order already exists")]
    AlreadyExists,

    #[error("order not found")]
    NotFound,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("transaction aborted by a concurrent update; retry")]
    TransactionAborted,

    #[error("cart is empty")]
    EmptyCart,

    #[error("product {0} sold out while the order was being placed")]
    StockExhausted(ProductUuid),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Coupons(#[from] CouponsServiceError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl OrdersServiceError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists | Self::StockExhausted(_) => ErrorKind::Conflict,
            Self::NotFound | Self::EmptyCart => ErrorKind::NotFound,
            Self::InvalidReference | Self::MissingRequiredData | Self::InvalidData => {
                ErrorKind::Validation
            }
            Self::TransactionAborted => ErrorKind::TransactionAborted,
            Self::Catalog(error) => error.kind(),
            Self::Coupons(error) => error.kind(),
            Self::Assembly(error) => error.kind(),
            Self::Lifecycle(error) => error.kind(),
            Self::Pricing(_) | Self::Sql(_) => ErrorKind::Internal,
        }
    }
}

impl From<Error> for OrdersServiceError {
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
    use bazaar::coupons::CouponError;

    use super::*;

    #[test]
    fn sold_out_is_a_conflict() {
        assert_eq!(
            OrdersServiceError::StockExhausted(ProductUuid::new()).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn empty_cart_is_not_found() {
        assert_eq!(OrdersServiceError::EmptyCart.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let exhausted = OrdersServiceError::from(CouponsServiceError::from(
            CouponError::UsageLimitReached("LAST".to_string()),
        ));

        assert_eq!(exhausted.kind(), ErrorKind::Conflict);
        assert_eq!(
            OrdersServiceError::from(AssemblyError::EmptyOrder).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            OrdersServiceError::from(Error::RowNotFound).kind(),
            ErrorKind::NotFound
        );
    }
}
