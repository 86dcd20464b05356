//! Bazaar Domain Concerns

pub mod carts;
pub mod coupons;
pub mod disputes;
pub mod orders;
pub mod payments;
pub mod products;
pub mod returns;
pub mod sellers;
pub mod wallets;
