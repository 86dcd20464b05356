//! Product Records

use bazaar::{
    catalog::{ProductStatus, ProductUuid},
    ids::{CategoryUuid, SellerUuid},
};
use jiff::Timestamp;

/// Product Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub seller: Option<SellerUuid>,
    pub category: Option<CategoryUuid>,
    pub name: String,
    pub price: u64,
    pub quantity: u64,
    pub in_stock: bool,
    pub status: ProductStatus,
    pub is_taxable: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
