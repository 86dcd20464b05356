//! Cart Records

use bazaar::{
    catalog::{CartLine, ProductUuid},
    ids::{SellerUuid, TypedUuid, UserUuid},
    pricing::PricingError,
};
use jiff::Timestamp;

/// Cart UUID
pub type CartUuid = TypedUuid<CartRecord>;

/// Cart Record
#[derive(Debug, Clone, PartialEq)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub user: UserUuid,
    pub coupon_code: Option<String>,
    pub items: Vec<CartItemRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartRecord {
    /// Sum of `price * quantity` over the cart.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] when the sum does not fit.
    pub fn subtotal(&self) -> Result<u64, PricingError> {
        self.items.iter().try_fold(0_u64, |sum, item| {
            item.price
                .checked_mul(item.quantity)
                .and_then(|line| sum.checked_add(line))
                .ok_or(PricingError::Overflow)
        })
    }

    /// The cart as checkout lines, carrying the prices captured when each item
    /// was added.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.items
            .iter()
            .map(|item| CartLine {
                product: item.product,
                quantity: item.quantity,
                price: Some(item.price),
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItemRecord>;

/// CartItem Record
#[derive(Debug, Clone, PartialEq)]
pub struct CartItemRecord {
    pub uuid: CartItemUuid,
    pub product: ProductUuid,
    pub seller: SellerUuid,
    pub quantity: u64,
    pub price: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn item(price: u64, quantity: u64) -> CartItemRecord {
        CartItemRecord {
            uuid: CartItemUuid::new(),
            product: ProductUuid::new(),
            seller: SellerUuid::new(),
            quantity,
            price,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    fn cart(items: Vec<CartItemRecord>) -> CartRecord {
        CartRecord {
            uuid: CartUuid::new(),
            user: UserUuid::new(),
            coupon_code: None,
            items,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn subtotal_sums_lines() -> TestResult {
        let cart = cart(vec![item(1_500, 2), item(250, 4)]);

        assert_eq!(cart.subtotal()?, 4_000);

        Ok(())
    }

    #[test]
    fn subtotal_overflow_is_an_error() {
        let cart = cart(vec![item(u64::MAX, 2)]);

        assert_eq!(cart.subtotal(), Err(PricingError::Overflow));
    }

    #[test]
    fn lines_carry_captured_prices() {
        let cart = cart(vec![item(999, 3)]);
        let lines = cart.lines();

        assert_eq!(lines.len(), 1);
        assert!(lines.iter().all(|line| line.price == Some(999) && line.quantity == 3));
    }
}
