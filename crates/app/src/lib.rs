//! Persistence, services and wiring for the Bazaar marketplace.

pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod gateway;
pub mod notifier;
pub mod observability;

#[cfg(all(test, feature = "docker-tests"))]
mod test;
