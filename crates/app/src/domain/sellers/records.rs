//! Seller Records

use bazaar::ids::SellerUuid;
use jiff::Timestamp;

/// Seller Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerRecord {
    pub uuid: SellerUuid,
    pub store_name: String,
    pub is_verified: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
