//! Wallets
//!
//! Buyer balances credited by refunds.

pub mod errors;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::WalletsServiceError;
pub use service::*;
