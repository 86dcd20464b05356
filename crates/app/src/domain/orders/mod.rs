//! Orders

pub mod data;
pub mod errors;
pub(crate) mod repositories;
pub mod service;
pub(crate) mod store;

pub use errors::OrdersServiceError;
pub use service::*;
