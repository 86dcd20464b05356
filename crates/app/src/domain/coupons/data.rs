//! Coupon inputs and quotes.

use bazaar::{
    catalog::ProductUuid,
    coupons::{
        Coupon, CouponApplication, CouponCreator, CouponDiscount, CouponError, CouponScope,
        CouponUuid, ItemDiscount, validate_definition,
    },
    ids::{CategoryUuid, SellerUuid},
};
use jiff::Timestamp;

/// A coupon to be created.
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub uuid: CouponUuid,
    pub code: String,
    pub description: Option<String>,
    pub discount: CouponDiscount,
    pub scope: CouponScope,
    pub sellers: Vec<SellerUuid>,
    pub applicable_products: Vec<ProductUuid>,
    pub applicable_categories: Vec<CategoryUuid>,
    pub min_cart_value: u64,
    pub max_discount: Option<u64>,
    pub max_usage: u32,
    pub max_usage_per_user: u32,
    pub stackable: bool,
    pub max_stack_per_order: u32,
    pub expires_at: Option<Timestamp>,
    pub is_active: bool,
    pub created_by: CouponCreator,
}

impl NewCoupon {
    /// Normalise and validate into a storable coupon.
    ///
    /// The code is trimmed and upper-cased, and seller coupons are pinned to
    /// their creator whatever seller list was supplied.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::Invalid`] when the definition is malformed.
    pub fn into_coupon(self) -> Result<Coupon, CouponError> {
        let sellers = match self.created_by {
            CouponCreator::Seller(seller) => vec![seller],
            CouponCreator::Admin(_) => self.sellers,
        };

        let coupon = Coupon {
            uuid: self.uuid,
            code: Coupon::normalize_code(&self.code),
            description: self.description,
            discount: self.discount,
            scope: self.scope,
            sellers,
            applicable_products: self.applicable_products,
            applicable_categories: self.applicable_categories,
            min_cart_value: self.min_cart_value,
            max_discount: self.max_discount,
            max_usage: self.max_usage,
            used_count: 0,
            max_usage_per_user: self.max_usage_per_user,
            user_usage: Vec::new(),
            stackable: self.stackable,
            max_stack_per_order: self.max_stack_per_order,
            expires_at: self.expires_at,
            is_active: self.is_active,
            created_by: self.created_by,
        };

        validate_definition(&coupon)?;

        Ok(coupon)
    }
}

/// A replacement definition for an existing coupon.
#[derive(Debug, Clone)]
pub struct CouponUpdate {
    pub code: String,
    pub description: Option<String>,
    pub discount: CouponDiscount,
    pub scope: CouponScope,
    pub sellers: Vec<SellerUuid>,
    pub applicable_products: Vec<ProductUuid>,
    pub applicable_categories: Vec<CategoryUuid>,
    pub min_cart_value: u64,
    pub max_discount: Option<u64>,
    pub max_usage: u32,
    pub max_usage_per_user: u32,
    pub stackable: bool,
    pub max_stack_per_order: u32,
    pub expires_at: Option<Timestamp>,
    pub is_active: bool,
}

impl CouponUpdate {
    /// Apply this definition to `coupon`, keeping its identity, creator and
    /// usage history.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::Invalid`] when the result is malformed, including
    /// a usage limit below the uses already recorded.
    pub fn apply_to(self, coupon: Coupon) -> Result<Coupon, CouponError> {
        let sellers = match coupon.created_by {
            CouponCreator::Seller(seller) => vec![seller],
            CouponCreator::Admin(_) => self.sellers,
        };

        let updated = Coupon {
            code: Coupon::normalize_code(&self.code),
            description: self.description,
            discount: self.discount,
            scope: self.scope,
            sellers,
            applicable_products: self.applicable_products,
            applicable_categories: self.applicable_categories,
            min_cart_value: self.min_cart_value,
            max_discount: self.max_discount,
            max_usage: self.max_usage,
            max_usage_per_user: self.max_usage_per_user,
            stackable: self.stackable,
            max_stack_per_order: self.max_stack_per_order,
            expires_at: self.expires_at,
            is_active: self.is_active,
            ..coupon
        };

        validate_definition(&updated)?;

        Ok(updated)
    }
}

/// What one coupon takes off a set of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponQuote {
    pub coupon: CouponUuid,
    pub code: String,
    pub discount: u64,
    pub breakdown: Vec<ItemDiscount>,
    pub applicable_cart_value: u64,
    pub final_total: u64,
    pub applicable_items: Vec<ProductUuid>,
}

impl From<CouponApplication> for CouponQuote {
    fn from(application: CouponApplication) -> Self {
        let applicable_items = application.applicable_items().collect();
        let final_total = application.final_total();

        Self {
            coupon: application.coupon,
            code: application.code,
            discount: application.discount,
            breakdown: application.breakdown.into_vec(),
            applicable_cart_value: application.applicable_value,
            final_total,
            applicable_items,
        }
    }
}

/// What a stack of coupons takes off a set of lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackedQuote {
    /// Combined discount, each line capped at its own value.
    pub total_discount: u64,
    pub applied: Vec<CouponQuote>,
}

#[cfg(test)]
mod tests {
    use bazaar::ids::AdminUuid;
    use testresult::TestResult;

    use super::*;

    fn new_coupon(created_by: CouponCreator) -> NewCoupon {
        NewCoupon {
            uuid: CouponUuid::new(),
            code: "  eid25 ".to_string(),
            description: None,
            discount: CouponDiscount::PercentageOff { percentage: 25 },
            scope: CouponScope::Order,
            sellers: Vec::new(),
            applicable_products: Vec::new(),
            applicable_categories: Vec::new(),
            min_cart_value: 0,
            max_discount: Some(5_000),
            max_usage: 100,
            max_usage_per_user: 1,
            stackable: false,
            max_stack_per_order: 1,
            expires_at: None,
            is_active: true,
            created_by,
        }
    }

    #[test]
    fn codes_are_normalised() -> TestResult {
        let coupon = new_coupon(CouponCreator::Admin(AdminUuid::new())).into_coupon()?;

        assert_eq!(coupon.code, "EID25");
        assert_eq!(coupon.used_count, 0);

        Ok(())
    }

    #[test]
    fn seller_coupons_are_pinned_to_their_seller() -> TestResult {
        let seller = SellerUuid::new();
        let mut new = new_coupon(CouponCreator::Seller(seller));
        new.sellers = vec![SellerUuid::new(), SellerUuid::new()];

        let coupon = new.into_coupon()?;

        assert_eq!(coupon.sellers, vec![seller]);

        Ok(())
    }

    fn update_from(coupon: &Coupon) -> CouponUpdate {
        CouponUpdate {
            code: coupon.code.clone(),
            description: coupon.description.clone(),
            discount: coupon.discount,
            scope: coupon.scope,
            sellers: coupon.sellers.clone(),
            applicable_products: coupon.applicable_products.clone(),
            applicable_categories: coupon.applicable_categories.clone(),
            min_cart_value: coupon.min_cart_value,
            max_discount: coupon.max_discount,
            max_usage: coupon.max_usage,
            max_usage_per_user: coupon.max_usage_per_user,
            stackable: coupon.stackable,
            max_stack_per_order: coupon.max_stack_per_order,
            expires_at: coupon.expires_at,
            is_active: coupon.is_active,
        }
    }

    #[test]
    fn updates_keep_identity_and_usage() -> TestResult {
        let mut coupon = new_coupon(CouponCreator::Admin(AdminUuid::new())).into_coupon()?;
        coupon.used_count = 3;

        let mut update = update_from(&coupon);
        update.code = "eid30 ".to_string();
        update.discount = CouponDiscount::PercentageOff { percentage: 30 };

        let updated = update.apply_to(coupon.clone())?;

        assert_eq!(updated.uuid, coupon.uuid);
        assert_eq!(updated.code, "EID30");
        assert_eq!(updated.used_count, 3);
        assert_eq!(updated.created_by, coupon.created_by);

        Ok(())
    }

    #[test]
    fn updates_cannot_unpin_a_seller_coupon() -> TestResult {
        let seller = SellerUuid::new();
        let coupon = new_coupon(CouponCreator::Seller(seller)).into_coupon()?;

        let mut update = update_from(&coupon);
        update.sellers = vec![SellerUuid::new()];

        assert_eq!(update.apply_to(coupon)?.sellers, vec![seller]);

        Ok(())
    }

    #[test]
    fn updates_cannot_drop_below_recorded_uses() -> TestResult {
        let mut coupon = new_coupon(CouponCreator::Admin(AdminUuid::new())).into_coupon()?;
        coupon.used_count = 5;

        let mut update = update_from(&coupon);
        update.max_usage = 4;

        assert!(matches!(update.apply_to(coupon), Err(CouponError::Invalid(_))));

        Ok(())
    }

    #[test]
    fn malformed_definitions_are_rejected() {
        let mut new = new_coupon(CouponCreator::Admin(AdminUuid::new()));
        new.max_usage = 0;

        assert!(matches!(new.into_coupon(), Err(CouponError::Invalid(_))));
    }
}
