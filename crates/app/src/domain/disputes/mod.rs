//! Disputes

pub mod errors;
mod repository;
pub mod service;

pub use errors::DisputesServiceError;
pub use service::*;
