//! Coupons
//!
//! A coupon is a discount strategy ([`CouponDiscount`]) applied over a scope
//! ([`CouponScope`]) to the lines it qualifies, subject to usage limits and
//! stacking rules.

use std::fmt::{Display, Formatter, Result as FmtResult};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    catalog::{PricedLine, ProductUuid},
    errors::ErrorKind,
    ids::{AdminUuid, CategoryUuid, SellerUuid, TypedUuid, UserUuid},
    pricing::PricingError,
};

pub mod calculator;
pub mod eligibility;
pub mod stacking;

pub use calculator::{CouponApplication, DiscountOutcome, ItemDiscount, calculate, evaluate};

/// Coupon UUID
pub type CouponUuid = TypedUuid<Coupon>;

/// How a coupon reduces the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponDiscount {
    /// Take a whole-number percentage off (`10` is ten percent).
    PercentageOff {
        /// Percentage between 0 and 100.
        percentage: u16,
    },

    /// Take a fixed amount of minor units off.
    FixedAmountOff {
        /// Amount in minor units.
        amount: u64,
    },
}

impl CouponDiscount {
    /// Stable lowercase name, as stored.
    pub const fn type_as_str(&self) -> &'static str {
        match self {
            Self::PercentageOff { .. } => "percentage",
            Self::FixedAmountOff { .. } => "fixed",
        }
    }

    /// The stored value: the percentage or the amount.
    pub fn value(&self) -> u64 {
        match *self {
            Self::PercentageOff { percentage } => u64::from(percentage),
            Self::FixedAmountOff { amount } => amount,
        }
    }

    /// Rebuild a discount from its stored type name and value.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::Invalid`] for an unknown type or a percentage that
    /// does not fit.
    pub fn from_stored(discount_type: &str, value: u64) -> Result<Self, CouponError> {
        match discount_type {
            "percentage" => u16::try_from(value)
                .map(|percentage| Self::PercentageOff { percentage })
                .map_err(|_out_of_range| CouponError::Invalid("percentage out of range")),
            "fixed" => Ok(Self::FixedAmountOff { amount: value }),
            _ => Err(CouponError::Invalid("unknown discount type")),
        }
    }
}

/// What the discount is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponScope {
    /// One discount over the sum of all qualifying lines.
    #[default]
    Order,

    /// A discount per qualifying line, each capped at that line's value.
    Items,
}

impl CouponScope {
    /// Stable lowercase name, as stored.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Items => "items",
        }
    }
}

impl TryFrom<&str> for CouponScope {
    type Error = CouponError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "order" => Ok(Self::Order),
            "items" => Ok(Self::Items),
            _ => Err(CouponError::Invalid("unknown coupon scope")),
        }
    }
}

impl Display for CouponScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Who created a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uuid", rename_all = "snake_case")]
pub enum CouponCreator {
    /// A marketplace administrator.
    Admin(AdminUuid),

    /// A seller; such coupons only ever apply to that seller's products.
    Seller(SellerUuid),
}

impl CouponCreator {
    /// Stable lowercase name, as stored.
    pub const fn kind_as_str(&self) -> &'static str {
        match self {
            Self::Admin(_) => "admin",
            Self::Seller(_) => "seller",
        }
    }

    /// UUID of the admin or seller.
    pub fn uuid(&self) -> Uuid {
        match *self {
            Self::Admin(admin) => admin.into_uuid(),
            Self::Seller(seller) => seller.into_uuid(),
        }
    }

    /// Rebuild a creator from its stored kind and UUID.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::Invalid`] for an unknown kind.
    pub fn from_stored(kind: &str, uuid: Uuid) -> Result<Self, CouponError> {
        match kind {
            "admin" => Ok(Self::Admin(AdminUuid::from_uuid(uuid))),
            "seller" => Ok(Self::Seller(SellerUuid::from_uuid(uuid))),
            _ => Err(CouponError::Invalid("unknown creator kind")),
        }
    }
}

/// A single recorded use of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponUsage {
    /// Buyer who used the coupon.
    pub user: UserUuid,

    /// When it was used.
    pub used_at: Timestamp,
}

/// A discount coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    /// Coupon identifier.
    pub uuid: CouponUuid,

    /// Upper-case redemption code, unique across the marketplace.
    pub code: String,

    /// Free-form description shown to buyers.
    pub description: Option<String>,

    /// Discount strategy.
    pub discount: CouponDiscount,

    /// Discount scope.
    pub scope: CouponScope,

    /// Sellers the coupon is restricted to; empty means every seller.
    pub sellers: Vec<SellerUuid>,

    /// Products the coupon is restricted to; empty means unrestricted.
    pub applicable_products: Vec<ProductUuid>,

    /// Categories the coupon is restricted to; empty means unrestricted.
    pub applicable_categories: Vec<CategoryUuid>,

    /// Minimum qualifying value in minor units.
    pub min_cart_value: u64,

    /// Cap on percentage discounts, in minor units.
    pub max_discount: Option<u64>,

    /// Total redemptions allowed.
    pub max_usage: u32,

    /// Redemptions so far.
    pub used_count: u32,

    /// Redemptions allowed per buyer.
    pub max_usage_per_user: u32,

    /// Recorded redemptions.
    pub user_usage: Vec<CouponUsage>,

    /// Whether this coupon may be combined with others.
    pub stackable: bool,

    /// Maximum coupons in an order that includes this one.
    pub max_stack_per_order: u32,

    /// Expiry instant, if any.
    pub expires_at: Option<Timestamp>,

    /// Whether the coupon is switched on.
    pub is_active: bool,

    /// Creator of the coupon.
    pub created_by: CouponCreator,
}

impl Coupon {
    /// Normalise a user-supplied code for lookup.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Number of recorded redemptions by `user`.
    pub fn uses_by(&self, user: UserUuid) -> u32 {
        let uses = self.user_usage.iter().filter(|u| u.user == user).count();

        u32::try_from(uses).unwrap_or(u32::MAX)
    }

    /// Whether `line` falls inside this coupon's restrictions.
    ///
    /// The seller list always applies. When products or categories are listed,
    /// matching either list qualifies the line.
    pub fn qualifies(&self, line: &PricedLine) -> bool {
        let seller_matches = self.sellers.is_empty() || self.sellers.contains(&line.seller);

        let restricted =
            !self.applicable_products.is_empty() || !self.applicable_categories.is_empty();

        let target_matches = !restricted
            || self.applicable_products.contains(&line.product)
            || line
                .category
                .is_some_and(|category| self.applicable_categories.contains(&category));

        seller_matches && target_matches
    }
}

/// Errors raised while validating or applying coupons.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    /// The request carried no codes.
    #[error("no coupon codes supplied")]
    NoCodes,

    /// The same code appeared twice.
    #[error("coupon code {0} supplied more than once")]
    DuplicateCode(String),

    /// No coupon with this code.
    #[error("coupon {0} not found")]
    NotFound(String),

    /// The coupon is switched off.
    #[error("coupon {0} is inactive")]
    Inactive(String),

    /// The coupon's expiry has passed.
    #[error("coupon {0} has expired")]
    Expired(String),

    /// Global redemption limit reached.
    #[error("coupon {0} has reached its usage limit")]
    UsageLimitReached(String),

    /// This buyer's redemption limit reached.
    #[error("coupon {0} has already been used the maximum number of times by this user")]
    PerUserLimitReached(String),

    /// Qualifying value below the coupon minimum.
    #[error("coupon {code} requires a minimum cart value of {required}, eligible value is {actual}")]
    MinimumNotMet {
        /// Coupon code.
        code: String,
        /// Required qualifying value.
        required: u64,
        /// Actual qualifying value.
        actual: u64,
    },

    /// No line qualifies or the discount works out to nothing.
    #[error("coupon {0} does not apply to any items")]
    NotApplicable(String),

    /// More than one non-stackable coupon in one order.
    #[error("only one non-stackable coupon can be used per order")]
    MultipleNonStackable,

    /// More coupons than the strictest stacking limit allows.
    #[error("{requested} coupons exceed the stacking limit of {limit}")]
    StackLimitExceeded {
        /// Coupons requested.
        requested: usize,
        /// Strictest `max_stack_per_order` among them.
        limit: u32,
    },

    /// A coupon definition is malformed.
    #[error("invalid coupon: {0}")]
    Invalid(&'static str),

    /// Arithmetic failure.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl CouponError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCodes | Self::DuplicateCode(_) | Self::Invalid(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Inactive(_)
            | Self::Expired(_)
            | Self::UsageLimitReached(_)
            | Self::PerUserLimitReached(_)
            | Self::MinimumNotMet { .. }
            | Self::NotApplicable(_)
            | Self::MultipleNonStackable
            | Self::StackLimitExceeded { .. } => ErrorKind::Conflict,
            Self::Pricing(_) => ErrorKind::Internal,
        }
    }
}

/// Check a coupon definition before it is stored.
///
/// # Errors
///
/// Returns [`CouponError::Invalid`] naming the first malformed field.
pub fn validate_definition(coupon: &Coupon) -> Result<(), CouponError> {
    if coupon.code.is_empty() || coupon.code != Coupon::normalize_code(&coupon.code) {
        return Err(CouponError::Invalid("code must be non-empty, trimmed and upper-case"));
    }

    match coupon.discount {
        CouponDiscount::PercentageOff { percentage } if percentage == 0 || percentage > 100 => {
            return Err(CouponError::Invalid("percentage must be between 1 and 100"));
        }
        CouponDiscount::FixedAmountOff { amount: 0 } => {
            return Err(CouponError::Invalid("fixed amount must be positive"));
        }
        CouponDiscount::FixedAmountOff { .. } if coupon.max_discount.is_some() => {
            return Err(CouponError::Invalid("max discount only applies to percentage coupons"));
        }
        _ => {}
    }

    if coupon.max_usage == 0 || coupon.max_usage_per_user == 0 {
        return Err(CouponError::Invalid("usage limits must be at least one"));
    }

    if coupon.max_stack_per_order == 0 {
        return Err(CouponError::Invalid("stacking limit must be at least one"));
    }

    if coupon.used_count > coupon.max_usage {
        return Err(CouponError::Invalid("used count exceeds max usage"));
    }

    if let CouponCreator::Seller(seller) = coupon.created_by
        && coupon.sellers != [seller]
    {
        return Err(CouponError::Invalid("seller coupons must be restricted to their seller"));
    }

    Ok(())
}
