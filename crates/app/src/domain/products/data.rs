//! Products Data

use bazaar::{
    catalog::{ProductStatus, ProductUuid},
    ids::{CategoryUuid, SellerUuid},
};

/// New Product Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub seller: SellerUuid,
    pub category: Option<CategoryUuid>,
    pub name: String,
    pub price: u64,
    pub quantity: u64,
    pub status: ProductStatus,
    pub is_taxable: bool,
}
