//! Pricing Config

use std::sync::Arc;

use bazaar::orders::{
    FlatCommission, FlatPerItemShipping, FlatRateTax, FreeShipping, NoTax, OrderAssembler,
    ShippingPolicy, TaxPolicy,
};
use clap::Args;
use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::iso::{self, Currency};
use thiserror::Error;

/// Errors raised while turning pricing settings into policies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingConfigError {
    /// A rate was outside `0..=100`.
    #[error("{name} must be between 0 and 100, got {value}")]
    RateOutOfRange {
        /// Setting name.
        name: &'static str,
        /// Value supplied.
        value: Decimal,
    },

    /// The currency code is not an ISO 4217 code.
    #[error("unknown currency code {0:?}")]
    UnknownCurrency(String),
}

/// Tax, shipping, commission and currency settings.
#[derive(Debug, Clone, Args)]
pub struct PricingConfig {
    /// Tax rate applied to taxable lines, in percent
    #[arg(long, env = "TAX_RATE_PERCENT", default_value_t = Decimal::ZERO)]
    pub tax_rate_percent: Decimal,

    /// Shipping fee per order item, in minor units
    #[arg(long, env = "SHIPPING_PER_ITEM", default_value_t = 0)]
    pub shipping_per_item: u64,

    /// Marketplace commission on seller revenue, in percent
    #[arg(long, env = "COMMISSION_RATE_PERCENT", default_value_t = Decimal::TEN)]
    pub commission_rate_percent: Decimal,

    /// ISO 4217 currency code for payments
    #[arg(long, env = "CURRENCY", default_value = "PKR")]
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate_percent: Decimal::ZERO,
            shipping_per_item: 0,
            commission_rate_percent: Decimal::TEN,
            currency: "PKR".to_string(),
        }
    }
}

impl PricingConfig {
    /// Build the order assembler described by these settings.
    ///
    /// A zero tax rate or shipping fee selects the no-op policy.
    ///
    /// # Errors
    ///
    /// Returns [`PricingConfigError::RateOutOfRange`] for rates outside `0..=100`.
    pub fn assembler(&self) -> Result<OrderAssembler, PricingConfigError> {
        let tax: Arc<dyn TaxPolicy> = if self.tax_rate_percent.is_zero() {
            Arc::new(NoTax)
        } else {
            Arc::new(FlatRateTax::new(to_percentage(
                "tax rate",
                self.tax_rate_percent,
            )?))
        };

        let shipping: Arc<dyn ShippingPolicy> = if self.shipping_per_item == 0 {
            Arc::new(FreeShipping)
        } else {
            Arc::new(FlatPerItemShipping::new(self.shipping_per_item))
        };

        let commission = FlatCommission::new(to_percentage(
            "commission rate",
            self.commission_rate_percent,
        )?);

        Ok(OrderAssembler::new(tax, shipping, Arc::new(commission)))
    }

    /// Resolve the configured currency.
    ///
    /// # Errors
    ///
    /// Returns [`PricingConfigError::UnknownCurrency`] when the code is not ISO 4217.
    pub fn currency(&self) -> Result<&'static Currency, PricingConfigError> {
        iso::find(&self.currency.trim().to_uppercase())
            .ok_or_else(|| PricingConfigError::UnknownCurrency(self.currency.clone()))
    }
}

fn to_percentage(name: &'static str, percent: Decimal) -> Result<Percentage, PricingConfigError> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(PricingConfigError::RateOutOfRange {
            name,
            value: percent,
        });
    }

    Ok(Percentage::from(percent / Decimal::ONE_HUNDRED))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn defaults_build_an_assembler() -> TestResult {
        let config = PricingConfig::default();

        config.assembler()?;

        assert_eq!(config.currency()?.iso_alpha_code, "PKR");

        Ok(())
    }

    #[test]
    fn rates_above_one_hundred_percent_are_rejected() {
        let config = PricingConfig {
            tax_rate_percent: Decimal::from(150),
            ..PricingConfig::default()
        };

        assert!(matches!(
            config.assembler(),
            Err(PricingConfigError::RateOutOfRange {
                name: "tax rate",
                ..
            })
        ));
    }

    #[test]
    fn unknown_currencies_are_rejected() {
        let config = PricingConfig {
            currency: "XYZ1".to_string(),
            ..PricingConfig::default()
        };

        assert_eq!(
            config.currency(),
            Err(PricingConfigError::UnknownCurrency("XYZ1".to_string()))
        );
    }
}
