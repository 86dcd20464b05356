//! Bazaar
//!
//! Order placement and coupon discount engine for a multi-vendor marketplace.
//!
//! The crate is pure: it turns catalog snapshots, coupons and a buyer's request
//! into fully priced [`orders::Order`] aggregates and per-seller
//! [`orders::SubOrder`]s, and drives their lifecycle afterwards. Persistence and
//! transaction boundaries live in the `bazaar-app` crate.

pub mod catalog;
pub mod coupons;
pub mod disputes;
pub mod errors;
pub mod ids;
pub mod orders;
pub mod pricing;
pub mod returns;

pub use errors::ErrorKind;

#[cfg(test)]
pub(crate) mod fixtures;
