//! Coupon validation.
//!
//! The rules live in [`validate_coupon`], a pure function over a coupon row, a subtotal and a clock reading, so
//! the cart API, the placement flow and the standalone validation endpoint all reject a code for exactly the same
//! reasons. Checks run in a fixed order and the first failure wins.
use bloom_common::Rupees;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{AppliedCoupon, Coupon},
    pricing,
    shop_api::errors::CouponRejection,
    traits::{ShopDatabase, ShopDatabaseError},
};

/// Validates `coupon` against `subtotal` at instant `now` and returns the discount it grants.
///
/// Order of checks: active flag, start date, expiry date, usage limit, minimum order amount. The discount is
/// computed from the item subtotal only; delivery charges and surcharges never enter the discount base.
pub fn validate_coupon(coupon: &Coupon, subtotal: Rupees, now: DateTime<Utc>) -> Result<Rupees, CouponRejection> {
    let code = coupon.code.clone();
    if !coupon.is_active {
        return Err(CouponRejection::Inactive(code));
    }
    if matches!(coupon.starts_at, Some(start) if now < start) {
        return Err(CouponRejection::NotYetActive(code));
    }
    if matches!(coupon.expires_at, Some(end) if now >= end) {
        return Err(CouponRejection::Expired(code));
    }
    if matches!(coupon.usage_limit, Some(limit) if coupon.times_used >= limit) {
        return Err(CouponRejection::UsageLimitReached(code));
    }
    if subtotal < coupon.min_order_amount {
        return Err(CouponRejection::MinOrderNotMet { code, min: coupon.min_order_amount });
    }
    Ok(pricing::discount_for(coupon.kind, coupon.value, coupon.max_discount, subtotal))
}

/// Wire response for the validation endpoint. Serialized as-is; `coupon` and `error` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<AppliedCoupon>,
    pub discount: Rupees,
    pub total_after_discount: Rupees,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CouponValidation {
    pub fn accepted(coupon: &Coupon, discount: Rupees, subtotal: Rupees) -> Self {
        Self {
            valid: true,
            coupon: Some(AppliedCoupon::from_coupon(coupon, discount)),
            discount,
            total_after_discount: subtotal.saturating_sub(discount),
            error: None,
        }
    }

    pub fn rejected(rejection: &CouponRejection, subtotal: Rupees) -> Self {
        Self {
            valid: false,
            coupon: None,
            discount: Rupees::default(),
            total_after_discount: subtotal,
            error: Some(rejection.to_string()),
        }
    }
}

/// Storefront-facing coupon checks, backed by the shop database.
#[derive(Debug, Clone)]
pub struct CouponApi<B> {
    db: B,
}

impl<B> CouponApi<B>
where B: ShopDatabase
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Looks up `code` (case-insensitively) and validates it against `subtotal`. Rejections come back inside the
    /// [`CouponValidation`] payload; only transport failures are errors.
    pub async fn validate_code(&self, code: &str, subtotal: Rupees) -> Result<CouponValidation, ShopDatabaseError> {
        match self.check_code(code, subtotal).await? {
            Ok((coupon, discount)) => {
                debug!("🎟️ Coupon {} accepted for a discount of {discount}", coupon.code);
                Ok(CouponValidation::accepted(&coupon, discount, subtotal))
            },
            Err(rejection) => {
                debug!("🎟️ Coupon rejected: {rejection}");
                Ok(CouponValidation::rejected(&rejection, subtotal))
            },
        }
    }

    /// As [`Self::validate_code`], but surfaces the rejection for callers that branch on it. The outer `Result`
    /// is transport, the inner one is business rules.
    pub async fn check_code(
        &self,
        code: &str,
        subtotal: Rupees,
    ) -> Result<Result<(Coupon, Rupees), CouponRejection>, ShopDatabaseError> {
        let code = code.trim().to_uppercase();
        let Some(coupon) = self.db.fetch_coupon_by_code(&code).await? else {
            return Ok(Err(CouponRejection::NotFound(code)));
        };
        Ok(validate_coupon(&coupon, subtotal, Utc::now()).map(|discount| (coupon, discount)))
    }
}
