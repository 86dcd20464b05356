//! Catalog snapshots
//!
//! A snapshot is the state of a product read inside the checkout transaction.
//! Every check here runs before any write, so a failure aborts the attempt with
//! nothing to undo.

use std::fmt::{Display, Formatter, Result as FmtResult};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    errors::ErrorKind,
    ids::{CategoryUuid, SellerUuid, TypedUuid},
    pricing::{PricingError, line_total},
};

/// Product UUID
pub type ProductUuid = TypedUuid<ProductSnapshot>;

/// Moderation state of a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Awaiting moderation.
    Pending,

    /// Listed and purchasable.
    Approved,

    /// Refused by moderation.
    Rejected,
}

impl ProductStatus {
    /// Stable lowercase name, as stored.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProductStatus {
    type Error = CatalogError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(CatalogError::UnknownStatus(other.to_string())),
        }
    }
}

/// Seller fields relevant to checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellerSnapshot {
    /// Seller identifier.
    pub uuid: SellerUuid,

    /// Whether the seller passed verification.
    pub is_verified: bool,
}

/// Product fields relevant to checkout, read under a row lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    /// Product identifier.
    pub uuid: ProductUuid,

    /// Owning seller, if it still exists.
    pub seller: Option<SellerSnapshot>,

    /// Catalog category.
    pub category: Option<CategoryUuid>,

    /// Current unit price in minor units.
    pub price: u64,

    /// Units available.
    pub quantity: u64,

    /// Seller-controlled availability flag.
    pub in_stock: bool,

    /// Moderation state.
    pub status: ProductStatus,

    /// Whether tax applies to this product.
    pub is_taxable: bool,
}

impl ProductSnapshot {
    /// Check the product can be sold in `requested` units, returning its seller.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] describing the first failed check.
    pub fn check_available(&self, requested: u64) -> Result<SellerUuid, CatalogError> {
        if requested == 0 {
            return Err(CatalogError::InvalidQuantity(self.uuid));
        }

        let seller = match self.seller {
            Some(seller) if seller.is_verified => seller.uuid,
            _ => return Err(CatalogError::SellerUnverified(self.uuid)),
        };

        if !self.in_stock || self.status != ProductStatus::Approved {
            return Err(CatalogError::Unavailable(self.uuid));
        }

        if requested > self.quantity {
            return Err(CatalogError::InsufficientStock {
                product: self.uuid,
                requested,
                available: self.quantity,
            });
        }

        Ok(seller)
    }
}

/// A requested purchase line, before pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    /// Product to buy.
    pub product: ProductUuid,

    /// Units requested.
    pub quantity: u64,

    /// Unit price captured when the line was added to a cart, if any.
    pub price: Option<u64>,
}

/// A line validated against the catalog and ready for discounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    /// Product being bought.
    pub product: ProductUuid,

    /// Seller fulfilling the line.
    pub seller: SellerUuid,

    /// Product category, used by category-restricted coupons.
    pub category: Option<CategoryUuid>,

    /// Units bought.
    pub quantity: u64,

    /// Unit price in minor units.
    pub price: u64,

    /// Whether tax applies.
    pub is_taxable: bool,
}

impl PricedLine {
    /// `price * quantity` for this line.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the amount does not fit.
    pub fn line_total(&self) -> Result<u64, PricingError> {
        line_total(self.price, self.quantity)
    }
}

/// Errors raised while validating requested lines against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// A line asked for zero units.
    #[error("quantity for product {0} must be at least one")]
    InvalidQuantity(ProductUuid),

    /// No product with this id.
    #[error("product {0} not found")]
    ProductNotFound(ProductUuid),

    /// The product's seller is missing or not verified.
    #[error("seller of product {0} is missing or unverified")]
    SellerUnverified(ProductUuid),

    /// Out of stock or not approved for sale.
    #[error("product {0} is not available for sale")]
    Unavailable(ProductUuid),

    /// Fewer units on hand than requested.
    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product short on stock.
        product: ProductUuid,
        /// Units requested across the order.
        requested: u64,
        /// Units on hand.
        available: u64,
    },

    /// A stored status string is not recognised.
    #[error("unknown product status {0:?}")]
    UnknownStatus(String),
}

impl CatalogError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuantity(_) => ErrorKind::Validation,
            Self::ProductNotFound(_) => ErrorKind::NotFound,
            Self::SellerUnverified(_) | Self::Unavailable(_) | Self::InsufficientStock { .. } => {
                ErrorKind::Conflict
            }
            Self::UnknownStatus(_) => ErrorKind::Internal,
        }
    }
}

/// Validate `lines` against `snapshots` and price them.
///
/// Quantities for the same product are summed before the stock check, so two
/// lines for one product cannot oversell it between them.
///
/// # Errors
///
/// Returns the first [`CatalogError`] encountered, in line order.
pub fn price_lines(
    lines: &[CartLine],
    snapshots: &FxHashMap<ProductUuid, ProductSnapshot>,
) -> Result<Vec<PricedLine>, CatalogError> {
    let mut requested: FxHashMap<ProductUuid, u64> = FxHashMap::default();

    for line in lines {
        if line.quantity == 0 {
            return Err(CatalogError::InvalidQuantity(line.product));
        }

        let total = requested.entry(line.product).or_default();
        *total = total.saturating_add(line.quantity);
    }

    lines
        .iter()
        .map(|line| {
            let snapshot = snapshots
                .get(&line.product)
                .ok_or(CatalogError::ProductNotFound(line.product))?;

            let total_requested = requested
                .get(&line.product)
                .copied()
                .unwrap_or(line.quantity);

            let seller = snapshot.check_available(total_requested)?;

            Ok(PricedLine {
                product: snapshot.uuid,
                seller,
                category: snapshot.category,
                quantity: line.quantity,
                price: line.price.unwrap_or(snapshot.price),
                is_taxable: snapshot.is_taxable,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;
    use crate::fixtures;

    fn snapshot(quantity: u64) -> ProductSnapshot {
        fixtures::snapshot(100, quantity)
    }

    fn catalog(products: &[ProductSnapshot]) -> FxHashMap<ProductUuid, ProductSnapshot> {
        products.iter().map(|p| (p.uuid, p.clone())).collect()
    }

    #[test]
    fn prices_lines_from_snapshots() -> TestResult {
        let product = snapshot(5);
        let lines = [CartLine {
            product: product.uuid,
            quantity: 2,
            price: None,
        }];

        let priced = price_lines(&lines, &catalog(&[product.clone()]))?;

        assert_eq!(priced.len(), 1);
        assert_eq!(priced.first().map(|l| l.price), Some(100));
        assert_eq!(priced.first().map(PricedLine::line_total), Some(Ok(200)));

        Ok(())
    }

    #[test]
    fn captured_cart_price_wins() -> TestResult {
        let product = snapshot(5);
        let lines = [CartLine {
            product: product.uuid,
            quantity: 1,
            price: Some(80),
        }];

        let priced = price_lines(&lines, &catalog(&[product]))?;

        assert_eq!(priced.first().map(|l| l.price), Some(80));

        Ok(())
    }

    #[test]
    fn missing_product_is_not_found() {
        let missing = ProductUuid::new();
        let lines = [CartLine {
            product: missing,
            quantity: 1,
            price: None,
        }];

        let result = price_lines(&lines, &FxHashMap::default());

        assert_eq!(result, Err(CatalogError::ProductNotFound(missing)));
        assert_eq!(CatalogError::ProductNotFound(missing).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn unverified_seller_is_rejected() {
        let mut product = snapshot(5);
        product.seller = product.seller.map(|s| SellerSnapshot {
            is_verified: false,
            ..s
        });

        assert_eq!(
            product.check_available(1),
            Err(CatalogError::SellerUnverified(product.uuid))
        );
    }

    #[test]
    fn unapproved_or_out_of_stock_is_unavailable() {
        let mut pending = snapshot(5);
        pending.status = ProductStatus::Pending;

        let mut hidden = snapshot(5);
        hidden.in_stock = false;

        assert_eq!(
            pending.check_available(1),
            Err(CatalogError::Unavailable(pending.uuid))
        );
        assert_eq!(
            hidden.check_available(1),
            Err(CatalogError::Unavailable(hidden.uuid))
        );
    }

    #[test]
    fn duplicate_lines_are_checked_against_combined_quantity() {
        let product = snapshot(3);
        let lines = [
            CartLine {
                product: product.uuid,
                quantity: 2,
                price: None,
            },
            CartLine {
                product: product.uuid,
                quantity: 2,
                price: None,
            },
        ];

        let result = price_lines(&lines, &catalog(&[product.clone()]));

        assert_eq!(
            result,
            Err(CatalogError::InsufficientStock {
                product: product.uuid,
                requested: 4,
                available: 3,
            })
        );
    }

    #[test]
    fn zero_quantity_is_a_validation_error() {
        let product = snapshot(3);
        let lines = [CartLine {
            product: product.uuid,
            quantity: 0,
            price: None,
        }];

        let result = price_lines(&lines, &catalog(&[product.clone()]));

        assert_eq!(result, Err(CatalogError::InvalidQuantity(product.uuid)));
        assert_eq!(
            CatalogError::InvalidQuantity(product.uuid).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn status_round_trips_through_storage_names() -> TestResult {
        for status in [
            ProductStatus::Pending,
            ProductStatus::Approved,
            ProductStatus::Rejected,
        ] {
            assert_eq!(ProductStatus::try_from(status.as_str())?, status);
        }

        Ok(())
    }
}
