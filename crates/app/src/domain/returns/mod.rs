//! Returns
//!
//! Buyers sending delivered items back, moderated by an administrator.

pub mod errors;
mod repository;
pub mod service;

pub use errors::ReturnsServiceError;
pub use service::*;
