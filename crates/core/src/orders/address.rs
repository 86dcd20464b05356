//! Shipping addresses

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{errors::ErrorKind, ids::SellerUuid};

/// Where an order, or part of it, is shipped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Recipient name.
    pub full_name: Option<String>,

    /// Street and number.
    pub street: String,

    /// City.
    pub city: String,

    /// State or province.
    pub state: Option<String>,

    /// Postal code.
    pub zip: String,

    /// Country.
    pub country: String,

    /// Contact phone number.
    pub phone: String,
}

impl ShippingAddress {
    /// Check every required field is present.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingFields`] listing each blank field.
    pub fn validate(&self) -> Result<(), AddressError> {
        let missing: SmallVec<[&'static str; 5]> = [
            ("street", &self.street),
            ("city", &self.city),
            ("zip", &self.zip),
            ("country", &self.country),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AddressError::MissingFields(missing.into_vec()))
        }
    }
}

/// A per-seller override of the order's shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAddress {
    /// Seller whose items ship here.
    pub seller: SellerUuid,

    /// Destination.
    pub address: ShippingAddress,
}

/// Errors raised for malformed addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Required fields were blank.
    #[error("shipping address is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

impl AddressError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
