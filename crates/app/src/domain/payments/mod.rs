//! Payments
//!
//! Online payment of prepaid orders through the external gateway.

pub mod data;
pub mod errors;
pub mod records;
mod repository;
pub mod service;

pub use errors::PaymentsServiceError;
pub use service::*;
