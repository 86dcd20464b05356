//! Order requests.

use bazaar::{
    catalog::ProductUuid,
    coupons::{Coupon, CouponError, stacking::normalize_codes},
    orders::{ItemAddress, PaymentMethod, ShippingAddress},
};

/// Checkout of the buyer's whole cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,

    /// Per-seller destination overrides.
    pub item_addresses: Vec<ItemAddress>,

    /// Codes on top of any coupon already attached to the cart.
    pub coupon_codes: Vec<String>,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
}

/// Immediate purchase of one product, bypassing the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyNowRequest {
    pub product: ProductUuid,
    pub quantity: u64,
    pub shipping_address: ShippingAddress,
    pub coupon_codes: Vec<String>,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
}

/// Normalise the codes to redeem at checkout: the requested codes, followed by
/// the cart's coupon unless it was also requested. No codes is not an error.
///
/// # Errors
///
/// Returns [`CouponError::DuplicateCode`] when a code is requested twice.
pub(crate) fn checkout_codes(
    requested: &[String],
    cart_code: Option<&str>,
) -> Result<Vec<String>, CouponError> {
    let mut codes: Vec<String> = requested
        .iter()
        .map(|code| Coupon::normalize_code(code))
        .filter(|code| !code.is_empty())
        .collect();

    if let Some(cart_code) = cart_code.map(Coupon::normalize_code)
        && !cart_code.is_empty()
        && !codes.contains(&cart_code)
    {
        codes.push(cart_code);
    }

    if codes.is_empty() {
        return Ok(codes);
    }

    normalize_codes(&codes)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn no_codes_is_fine() -> TestResult {
        assert!(checkout_codes(&[], None)?.is_empty());
        assert!(checkout_codes(&[" ".to_string()], Some(""))?.is_empty());

        Ok(())
    }

    #[test]
    fn cart_coupon_is_appended_once() -> TestResult {
        let codes = checkout_codes(&["eid10".to_string()], Some("FREESHIP"))?;

        assert_eq!(codes, vec!["EID10".to_string(), "FREESHIP".to_string()]);

        let codes = checkout_codes(&["freeship".to_string()], Some("FREESHIP"))?;

        assert_eq!(codes, vec!["FREESHIP".to_string()]);

        Ok(())
    }

    #[test]
    fn duplicate_requested_codes_are_rejected() {
        let result = checkout_codes(&["SAVE".to_string(), "save ".to_string()], None);

        assert_eq!(result, Err(CouponError::DuplicateCode("SAVE".to_string())));
    }
}
