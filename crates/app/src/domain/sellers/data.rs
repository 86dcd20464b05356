//! Sellers Data

use bazaar::ids::SellerUuid;

/// New Seller Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeller {
    pub uuid: SellerUuid,
    pub store_name: String,
    pub is_verified: bool,
}
