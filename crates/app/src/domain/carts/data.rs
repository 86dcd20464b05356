//! Cart Data

use bazaar::catalog::ProductUuid;

/// New Cart Item Data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCartItem {
    pub product: ProductUuid,
    pub quantity: u64,
}
