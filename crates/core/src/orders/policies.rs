//! Tax, shipping and commission policies
//!
//! Each policy is a trait so deployments can swap in their own rules; the
//! flat implementations here cover the common case.

use std::fmt::Debug;

use decimal_percentage::Percentage;
use rust_decimal::Decimal;

use crate::{
    catalog::PricedLine,
    ids::SellerUuid,
    pricing::{PricingError, percent_of_minor},
};

/// Computes tax for a line.
pub trait TaxPolicy: Debug + Send + Sync {
    /// Tax in minor units on `taxable_base`, the line's discounted subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the calculation overflows.
    fn tax_for(&self, line: &PricedLine, taxable_base: u64) -> Result<u64, PricingError>;
}

/// Computes shipping for a line.
pub trait ShippingPolicy: Debug + Send + Sync {
    /// Shipping fee in minor units.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the calculation overflows.
    fn shipping_for(&self, line: &PricedLine) -> Result<u64, PricingError>;
}

/// Chooses the marketplace commission for a seller.
pub trait CommissionPolicy: Debug + Send + Sync {
    /// Commission as a fraction (`0.1` is ten percent).
    fn rate_for(&self, seller: SellerUuid) -> Decimal;
}

/// One tax rate for every taxable line.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateTax {
    rate: Percentage,
}

impl FlatRateTax {
    /// Tax taxable lines at `rate`.
    pub const fn new(rate: Percentage) -> Self {
        Self { rate }
    }
}

impl TaxPolicy for FlatRateTax {
    fn tax_for(&self, line: &PricedLine, taxable_base: u64) -> Result<u64, PricingError> {
        if !line.is_taxable {
            return Ok(0);
        }

        percent_of_minor(&self.rate, taxable_base)
    }
}

/// No tax at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTax;

impl TaxPolicy for NoTax {
    fn tax_for(&self, _line: &PricedLine, _taxable_base: u64) -> Result<u64, PricingError> {
        Ok(0)
    }
}

/// A fixed fee per unit shipped.
#[derive(Debug, Clone, Copy)]
pub struct FlatPerItemShipping {
    per_item: u64,
}

impl FlatPerItemShipping {
    /// Charge `per_item` minor units for each unit.
    pub const fn new(per_item: u64) -> Self {
        Self { per_item }
    }
}

impl ShippingPolicy for FlatPerItemShipping {
    fn shipping_for(&self, line: &PricedLine) -> Result<u64, PricingError> {
        self.per_item
            .checked_mul(line.quantity)
            .ok_or(PricingError::Overflow)
    }
}

/// Free shipping.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeShipping;

impl ShippingPolicy for FreeShipping {
    fn shipping_for(&self, _line: &PricedLine) -> Result<u64, PricingError> {
        Ok(0)
    }
}

/// The same commission for every seller.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatCommission {
    rate: Decimal,
}

impl FlatCommission {
    /// Charge every seller `rate`.
    pub fn new(rate: Percentage) -> Self {
        Self {
            rate: rate * Decimal::ONE,
        }
    }
}

impl CommissionPolicy for FlatCommission {
    fn rate_for(&self, _seller: SellerUuid) -> Decimal {
        self.rate
    }
}
