//! Coupons

pub mod data;
pub mod errors;
pub(crate) mod ledger;
mod repositories;
pub mod service;

pub use errors::CouponsServiceError;
pub use service::*;
