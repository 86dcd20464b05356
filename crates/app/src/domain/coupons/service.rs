//! Coupons service.

use async_trait::async_trait;
use bazaar::{
    catalog::{CartLine, ProductUuid, price_lines},
    coupons::{
        Coupon, CouponCreator, CouponError, CouponUuid, DiscountOutcome, calculate,
        stacking::normalize_codes,
    },
    ids::{SellerUuid, UserUuid},
};
use jiff::Timestamp;
use mockall::automock;
use tracing::{Span, info, warn};

use crate::{
    database::Db,
    domain::{
        coupons::{
            data::{CouponQuote, CouponUpdate, NewCoupon, StackedQuote},
            errors::CouponsServiceError,
            ledger::CouponLedger,
            repositories::PgCouponsRepository,
        },
        products::repository::PgProductsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgCouponsService {
    db: Db,
    coupons_repository: PgCouponsRepository,
    products_repository: PgProductsRepository,
    ledger: CouponLedger,
}

impl PgCouponsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            coupons_repository: PgCouponsRepository::new(),
            products_repository: PgProductsRepository::new(),
            ledger: CouponLedger::new(),
        }
    }

    /// Price `lines`, validate `codes` against them and record one use of each
    /// coupon, all in one transaction.
    async fn redeem(
        &self,
        user: UserUuid,
        codes: &[String],
        lines: &[CartLine],
    ) -> Result<DiscountOutcome, CouponsServiceError> {
        let now = Timestamp::now();
        let products: Vec<ProductUuid> = lines.iter().map(|line| line.product).collect();

        let mut tx = self.db.begin().await?;

        let snapshots = self
            .products_repository
            .lock_snapshots(&mut tx, &products)
            .await?;

        let priced = price_lines(lines, &snapshots)?;

        let coupons = self.ledger.lock(&mut tx, codes).await?;

        let outcome = calculate(&coupons, &priced, user, now).inspect_err(|error| {
            warn!(user_uuid = %user, %error, "coupon rejected");
        })?;

        self.ledger
            .redeem(&mut tx, &outcome.applications, user, now)
            .await?;

        tx.commit().await?;

        Ok(outcome)
    }
}

#[async_trait]
impl CouponsService for PgCouponsService {
    #[tracing::instrument(
        name = "coupons.service.create_coupon",
        skip(self, coupon),
        fields(coupon_uuid = %coupon.uuid, code = %coupon.code),
        err
    )]
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon, CouponsServiceError> {
        let coupon = coupon.into_coupon()?;

        let mut tx = self.db.begin().await?;

        let created = self.coupons_repository.create_coupon(&mut tx, &coupon).await?;

        tx.commit().await?;

        info!(
            coupon_uuid = %created.uuid,
            code = %created.code,
            created_by = created.created_by.kind_as_str(),
            "created coupon"
        );

        Ok(created)
    }

    #[tracing::instrument(
        name = "coupons.service.update_coupon",
        skip(self, editor, update),
        fields(coupon_uuid = %coupon, editor = editor.kind_as_str()),
        err
    )]
    async fn update_coupon(
        &self,
        coupon: CouponUuid,
        editor: CouponCreator,
        update: CouponUpdate,
    ) -> Result<Coupon, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let current = self
            .coupons_repository
            .lock_coupon(&mut tx, coupon)
            .await?
            .ok_or(CouponsServiceError::NotFound)?;

        if matches!(editor, CouponCreator::Seller(_)) && current.created_by != editor {
            warn!(coupon_uuid = %coupon, "seller tried to edit a coupon it does not own");

            return Err(CouponsServiceError::NotFound);
        }

        let updated = update.apply_to(current)?;

        let updated = self.coupons_repository.update_coupon(&mut tx, &updated).await?;

        tx.commit().await?;

        info!(coupon_uuid = %coupon, code = %updated.code, "updated coupon");

        Ok(updated)
    }

    async fn get_coupon_by_code(&self, code: String) -> Result<Coupon, CouponsServiceError> {
        let code = Coupon::normalize_code(&code);

        let mut tx = self.db.begin().await?;

        let coupon = self
            .coupons_repository
            .get_coupon_by_code(&mut tx, &code)
            .await?;

        tx.commit().await?;

        Ok(coupon)
    }

    #[tracing::instrument(
        name = "coupons.service.set_coupon_active",
        skip(self),
        fields(coupon_uuid = %coupon),
        err
    )]
    async fn set_coupon_active(
        &self,
        coupon: CouponUuid,
        is_active: bool,
    ) -> Result<Coupon, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let updated = self
            .coupons_repository
            .set_coupon_active(&mut tx, coupon, is_active)
            .await?;

        tx.commit().await?;

        info!(coupon_uuid = %coupon, is_active, "updated coupon status");

        Ok(updated)
    }

    #[tracing::instrument(
        name = "coupons.service.delete_coupon",
        skip(self),
        fields(coupon_uuid = %coupon),
        err
    )]
    async fn delete_coupon(&self, coupon: CouponUuid) -> Result<(), CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.coupons_repository.delete_coupon(&mut tx, coupon).await?;

        tx.commit().await?;

        if rows_affected == 0 {
            return Err(CouponsServiceError::NotFound);
        }

        info!(coupon_uuid = %coupon, "deleted coupon");

        Ok(())
    }

    async fn list_available_coupons(
        &self,
        seller: Option<SellerUuid>,
        product: Option<ProductUuid>,
    ) -> Result<Vec<Coupon>, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let coupons = self
            .coupons_repository
            .list_available_coupons(&mut tx, seller, product, Timestamp::now())
            .await?;

        tx.commit().await?;

        Ok(coupons)
    }

    async fn list_all_coupons(&self) -> Result<Vec<Coupon>, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let coupons = self.coupons_repository.list_all_coupons(&mut tx).await?;

        tx.commit().await?;

        Ok(coupons)
    }

    async fn list_seller_coupons(
        &self,
        seller: SellerUuid,
    ) -> Result<Vec<Coupon>, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let coupons = self
            .coupons_repository
            .list_seller_coupons(&mut tx, seller)
            .await?;

        tx.commit().await?;

        Ok(coupons)
    }

    #[tracing::instrument(
        name = "coupons.service.apply_coupon",
        skip(self, code, lines),
        fields(user_uuid = %user, code, discount),
        err
    )]
    async fn apply_coupon(
        &self,
        user: UserUuid,
        code: String,
        lines: Vec<CartLine>,
    ) -> Result<CouponQuote, CouponsServiceError> {
        let codes = normalize_codes(&[code])?;

        Span::current().record("code", codes.join(",").as_str());

        let outcome = self.redeem(user, &codes, &lines).await?;

        let quote = outcome
            .applications
            .into_iter()
            .next()
            .map(CouponQuote::from)
            .ok_or_else(|| CouponError::NotApplicable(codes.join(",")))?;

        Span::current().record("discount", quote.discount);

        info!(code = %quote.code, discount = quote.discount, "applied coupon");

        Ok(quote)
    }

    #[tracing::instrument(
        name = "coupons.service.apply_coupons",
        skip(self, codes, lines),
        fields(user_uuid = %user, codes = codes.len(), total_discount),
        err
    )]
    async fn apply_coupons(
        &self,
        user: UserUuid,
        codes: Vec<String>,
        lines: Vec<CartLine>,
    ) -> Result<StackedQuote, CouponsServiceError> {
        let codes = normalize_codes(&codes)?;

        let outcome = self.redeem(user, &codes, &lines).await?;

        Span::current().record("total_discount", outcome.total_discount);

        info!(
            coupons = outcome.applications.len(),
            total_discount = outcome.total_discount,
            "applied coupons"
        );

        Ok(StackedQuote {
            total_discount: outcome.total_discount,
            applied: outcome
                .applications
                .into_iter()
                .map(CouponQuote::from)
                .collect(),
        })
    }

    #[tracing::instrument(
        name = "coupons.service.restore_coupon_usage",
        skip(self),
        fields(coupon_uuid = %coupon, user_uuid = %user),
        err
    )]
    async fn restore_coupon_usage(
        &self,
        coupon: CouponUuid,
        user: UserUuid,
    ) -> Result<(), CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let restored = self.ledger.restore(&mut tx, coupon, user).await?;

        tx.commit().await?;

        if !restored {
            return Err(CouponsServiceError::NotFound);
        }

        info!(coupon_uuid = %coupon, user_uuid = %user, "restored coupon usage");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CouponsService: Send + Sync {
    /// Creates a coupon. Seller coupons only ever apply to that seller.
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon, CouponsServiceError>;

    /// Replaces a coupon's definition. Admins may edit any coupon, sellers
    /// only their own; anything else is not found. Usage is kept.
    async fn update_coupon(
        &self,
        coupon: CouponUuid,
        editor: CouponCreator,
        update: CouponUpdate,
    ) -> Result<Coupon, CouponsServiceError>;

    /// Retrieve a coupon by code, in any case.
    async fn get_coupon_by_code(&self, code: String) -> Result<Coupon, CouponsServiceError>;

    /// Switches a coupon on or off.
    async fn set_coupon_active(
        &self,
        coupon: CouponUuid,
        is_active: bool,
    ) -> Result<Coupon, CouponsServiceError>;

    /// Deletes a coupon and its usage history.
    async fn delete_coupon(&self, coupon: CouponUuid) -> Result<(), CouponsServiceError>;

    /// Lists coupons a buyer could still redeem, optionally only those that
    /// can apply to a seller or product.
    async fn list_available_coupons(
        &self,
        seller: Option<SellerUuid>,
        product: Option<ProductUuid>,
    ) -> Result<Vec<Coupon>, CouponsServiceError>;

    /// Lists every coupon, newest first.
    async fn list_all_coupons(&self) -> Result<Vec<Coupon>, CouponsServiceError>;

    /// Lists the coupons that apply to a seller, including inactive and
    /// expired ones.
    async fn list_seller_coupons(
        &self,
        seller: SellerUuid,
    ) -> Result<Vec<Coupon>, CouponsServiceError>;

    /// Validates one coupon against the given lines and records its use.
    async fn apply_coupon(
        &self,
        user: UserUuid,
        code: String,
        lines: Vec<CartLine>,
    ) -> Result<CouponQuote, CouponsServiceError>;

    /// Validates a stack of coupons against the given lines and records a use
    /// of each. Either every coupon is recorded or none is.
    async fn apply_coupons(
        &self,
        user: UserUuid,
        codes: Vec<String>,
        lines: Vec<CartLine>,
    ) -> Result<StackedQuote, CouponsServiceError>;

    /// Gives back the user's most recent use of a coupon. Fails with not
    /// found when the user holds no use of it.
    async fn restore_coupon_usage(
        &self,
        coupon: CouponUuid,
        user: UserUuid,
    ) -> Result<(), CouponsServiceError>;
}

#[cfg(all(test, feature = "docker-tests"))]
mod tests {
    use bazaar::{
        coupons::{CouponCreator, CouponDiscount},
        ids::AdminUuid,
    };
    use testresult::TestResult;

    use crate::test::{
        TestContext,
        helpers::{cart_line, create_product, create_seller, new_coupon},
    };

    use super::*;

    #[tokio::test]
    async fn coupons_are_found_by_any_case() -> TestResult {
        let ctx = TestContext::new().await;

        let created = ctx
            .coupons
            .create_coupon(new_coupon(" eid10 ", CouponDiscount::PercentageOff { percentage: 10 }))
            .await?;

        assert_eq!(created.code, "EID10");

        let fetched = ctx.coupons.get_coupon_by_code("eid10".to_string()).await?;

        assert_eq!(fetched, created);

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_codes_already_exist() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.coupons
            .create_coupon(new_coupon("ONCE", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await?;

        let result = ctx
            .coupons
            .create_coupon(new_coupon("once", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await;

        assert!(
            matches!(result, Err(CouponsServiceError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn apply_coupon_records_usage() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 10_000, 5).await?;
        let user = UserUuid::new();

        let mut coupon = new_coupon("SAVE20", CouponDiscount::PercentageOff { percentage: 20 });
        coupon.max_discount = Some(3_000);
        ctx.coupons.create_coupon(coupon).await?;

        let quote = ctx
            .coupons
            .apply_coupon(user, "save20".to_string(), vec![cart_line(product, 2)])
            .await?;

        assert_eq!(quote.discount, 3_000);
        assert_eq!(quote.applicable_cart_value, 20_000);
        assert_eq!(quote.final_total, 17_000);
        assert_eq!(quote.applicable_items, vec![product]);

        let stored = ctx.coupons.get_coupon_by_code("SAVE20".to_string()).await?;

        assert_eq!(stored.used_count, 1);
        assert_eq!(stored.uses_by(user), 1);

        let again = ctx
            .coupons
            .apply_coupon(user, "SAVE20".to_string(), vec![cart_line(product, 1)])
            .await;

        assert!(
            matches!(
                again,
                Err(CouponsServiceError::Coupon(CouponError::PerUserLimitReached(_)))
            ),
            "expected PerUserLimitReached, got {again:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn rejected_stack_records_nothing() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 5_000, 5).await?;

        ctx.coupons
            .create_coupon(new_coupon("FIRST", CouponDiscount::FixedAmountOff { amount: 500 }))
            .await?;
        ctx.coupons
            .create_coupon(new_coupon("SECOND", CouponDiscount::FixedAmountOff { amount: 500 }))
            .await?;

        let result = ctx
            .coupons
            .apply_coupons(
                UserUuid::new(),
                vec!["FIRST".to_string(), "SECOND".to_string()],
                vec![cart_line(product, 1)],
            )
            .await;

        assert!(
            matches!(
                result,
                Err(CouponsServiceError::Coupon(CouponError::MultipleNonStackable))
            ),
            "expected MultipleNonStackable, got {result:?}"
        );

        let first = ctx.coupons.get_coupon_by_code("FIRST".to_string()).await?;

        assert_eq!(first.used_count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn stackable_coupons_combine() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 5_000, 5).await?;

        for code in ["STACK1", "STACK2"] {
            let mut coupon = new_coupon(code, CouponDiscount::FixedAmountOff { amount: 1_000 });
            coupon.stackable = true;
            coupon.max_stack_per_order = 2;
            ctx.coupons.create_coupon(coupon).await?;
        }

        let quote = ctx
            .coupons
            .apply_coupons(
                UserUuid::new(),
                vec!["stack1".to_string(), "stack2".to_string()],
                vec![cart_line(product, 1)],
            )
            .await?;

        assert_eq!(quote.total_discount, 2_000);
        assert_eq!(quote.applied.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 5_000, 5).await?;

        let result = ctx
            .coupons
            .apply_coupon(UserUuid::new(), "GHOST".to_string(), vec![cart_line(product, 1)])
            .await;

        assert!(
            matches!(&result, Err(error) if error.kind() == bazaar::ErrorKind::NotFound),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn restore_gives_back_one_use() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 5_000, 5).await?;
        let user = UserUuid::new();
        let other = UserUuid::new();

        let coupon = ctx
            .coupons
            .create_coupon(new_coupon("BACK", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await?;

        for buyer in [user, other] {
            ctx.coupons
                .apply_coupon(buyer, "BACK".to_string(), vec![cart_line(product, 1)])
                .await?;
        }

        ctx.coupons.restore_coupon_usage(coupon.uuid, user).await?;

        let restored = ctx.coupons.get_coupon_by_code("BACK".to_string()).await?;

        assert_eq!(restored.used_count, 1);
        assert_eq!(restored.uses_by(user), 0);
        assert_eq!(restored.uses_by(other), 1);

        let again = ctx.coupons.restore_coupon_usage(coupon.uuid, user).await;

        assert!(
            matches!(again, Err(CouponsServiceError::NotFound)),
            "expected NotFound, got {again:?}"
        );

        let unchanged = ctx.coupons.get_coupon_by_code("BACK".to_string()).await?;

        assert_eq!(unchanged.used_count, 1);
        assert_eq!(unchanged.uses_by(other), 1);

        Ok(())
    }

    #[tokio::test]
    async fn last_use_goes_to_exactly_one_buyer() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 5_000, 10).await?;

        let mut coupon = new_coupon("LASTONE", CouponDiscount::FixedAmountOff { amount: 100 });
        coupon.max_usage = 1;
        ctx.coupons.create_coupon(coupon).await?;

        let (first, second) = tokio::join!(
            ctx.coupons
                .apply_coupon(UserUuid::new(), "LASTONE".to_string(), vec![cart_line(product, 1)]),
            ctx.coupons
                .apply_coupon(UserUuid::new(), "LASTONE".to_string(), vec![cart_line(product, 1)]),
        );

        assert_eq!(usize::from(first.is_ok()) + usize::from(second.is_ok()), 1);

        let stored = ctx.coupons.get_coupon_by_code("LASTONE".to_string()).await?;

        assert_eq!(stored.used_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn listing_hides_inactive_and_other_sellers_coupons() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let other = create_seller(&ctx, true).await?;

        let mut own = new_coupon("OWN", CouponDiscount::FixedAmountOff { amount: 100 });
        own.created_by = CouponCreator::Seller(seller);
        ctx.coupons.create_coupon(own).await?;

        let mut theirs = new_coupon("THEIRS", CouponDiscount::FixedAmountOff { amount: 100 });
        theirs.created_by = CouponCreator::Seller(other);
        ctx.coupons.create_coupon(theirs).await?;

        let paused = ctx
            .coupons
            .create_coupon(new_coupon("PAUSED", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await?;
        ctx.coupons.set_coupon_active(paused.uuid, false).await?;

        let mut global = new_coupon("GLOBAL", CouponDiscount::FixedAmountOff { amount: 100 });
        global.created_by = CouponCreator::Admin(AdminUuid::new());
        ctx.coupons.create_coupon(global).await?;

        let codes: Vec<String> = ctx
            .coupons
            .list_available_coupons(Some(seller), None)
            .await?
            .into_iter()
            .map(|coupon| coupon.code)
            .collect();

        assert!(codes.contains(&"OWN".to_string()));
        assert!(codes.contains(&"GLOBAL".to_string()));
        assert!(!codes.contains(&"THEIRS".to_string()));
        assert!(!codes.contains(&"PAUSED".to_string()));

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

    #[tokio::test]
    async fn admin_updates_keep_usage() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let product = create_product(&ctx, seller, 5_000, 5).await?;
        let user = UserUuid::new();

        let coupon = ctx
            .coupons
            .create_coupon(new_coupon("EDIT", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await?;

        ctx.coupons
            .apply_coupon(user, "EDIT".to_string(), vec![cart_line(product, 1)])
            .await?;

        let mut update = update_from(&coupon);
        update.code = "edited".to_string();
        update.discount = CouponDiscount::FixedAmountOff { amount: 250 };

        let updated = ctx
            .coupons
            .update_coupon(coupon.uuid, CouponCreator::Admin(AdminUuid::new()), update)
            .await?;

        assert_eq!(updated.code, "EDITED");
        assert_eq!(updated.discount, CouponDiscount::FixedAmountOff { amount: 250 });
        assert_eq!(updated.used_count, 1);
        assert_eq!(updated.uses_by(user), 1);
        assert_eq!(
            ctx.coupons.get_coupon_by_code("edited".to_string()).await?,
            updated
        );

        let mut invalid = update_from(&updated);
        invalid.max_usage = 0;

        let rejected = ctx
            .coupons
            .update_coupon(coupon.uuid, CouponCreator::Admin(AdminUuid::new()), invalid)
            .await;

        assert!(
            matches!(rejected, Err(CouponsServiceError::Coupon(CouponError::Invalid(_)))),
            "expected Invalid, got {rejected:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn sellers_only_edit_their_own_coupons() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let other = create_seller(&ctx, true).await?;

        let mut own = new_coupon("MINE", CouponDiscount::FixedAmountOff { amount: 100 });
        own.created_by = CouponCreator::Seller(seller);
        let own = ctx.coupons.create_coupon(own).await?;

        let admin = ctx
            .coupons
            .create_coupon(new_coupon("HOUSE", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await?;

        let stolen = ctx
            .coupons
            .update_coupon(own.uuid, CouponCreator::Seller(other), update_from(&own))
            .await;

        assert!(
            matches!(stolen, Err(CouponsServiceError::NotFound)),
            "expected NotFound, got {stolen:?}"
        );

        let house = ctx
            .coupons
            .update_coupon(admin.uuid, CouponCreator::Seller(seller), update_from(&admin))
            .await;

        assert!(
            matches!(house, Err(CouponsServiceError::NotFound)),
            "expected NotFound, got {house:?}"
        );

        let mut update = update_from(&own);
        update.is_active = false;
        update.sellers = vec![other];

        let updated = ctx
            .coupons
            .update_coupon(own.uuid, CouponCreator::Seller(seller), update)
            .await?;

        assert!(!updated.is_active);
        assert_eq!(updated.sellers, vec![seller]);

        Ok(())
    }

    #[tokio::test]
    async fn renaming_onto_an_existing_code_already_exists() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.coupons
            .create_coupon(new_coupon("TAKEN", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await?;
        let coupon = ctx
            .coupons
            .create_coupon(new_coupon("FREE", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await?;

        let mut update = update_from(&coupon);
        update.code = "taken".to_string();

        let result = ctx
            .coupons
            .update_coupon(coupon.uuid, CouponCreator::Admin(AdminUuid::new()), update)
            .await;

        assert!(
            matches!(result, Err(CouponsServiceError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn admin_and_seller_listings_include_inactive_coupons() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = create_seller(&ctx, true).await?;
        let other = create_seller(&ctx, true).await?;

        let mut own = new_coupon("PAUSEDOWN", CouponDiscount::FixedAmountOff { amount: 100 });
        own.created_by = CouponCreator::Seller(seller);
        own.is_active = false;
        ctx.coupons.create_coupon(own).await?;

        let mut theirs = new_coupon("THEIRS", CouponDiscount::FixedAmountOff { amount: 100 });
        theirs.created_by = CouponCreator::Seller(other);
        ctx.coupons.create_coupon(theirs).await?;

        ctx.coupons
            .create_coupon(new_coupon("HOUSE", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await?;

        let codes = |coupons: Vec<Coupon>| -> Vec<String> {
            coupons.into_iter().map(|coupon| coupon.code).collect()
        };

        let seller_codes = codes(ctx.coupons.list_seller_coupons(seller).await?);

        assert_eq!(seller_codes, vec!["PAUSEDOWN".to_string()]);

        let all_codes = codes(ctx.coupons.list_all_coupons().await?);

        assert_eq!(all_codes.len(), 3);
        assert!(all_codes.contains(&"PAUSEDOWN".to_string()));

        let available = codes(ctx.coupons.list_available_coupons(Some(seller), None).await?);

        assert!(!available.contains(&"PAUSEDOWN".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() -> TestResult {
        let ctx = TestContext::new().await;

        let coupon = ctx
            .coupons
            .create_coupon(new_coupon("GONE", CouponDiscount::FixedAmountOff { amount: 100 }))
            .await?;

        ctx.coupons.delete_coupon(coupon.uuid).await?;

        let result = ctx.coupons.delete_coupon(coupon.uuid).await;

        assert!(
            matches!(result, Err(CouponsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }
}
