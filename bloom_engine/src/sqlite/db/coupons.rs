use log::trace;
use sqlx::SqliteConnection;

use crate::{db_types::Coupon, traits::ShopDatabaseError};

/// Fetches a coupon by code. Codes are stored upper-case; the caller normalises before lookup, but the query
/// upper-cases defensively so case can never cause a miss.
pub async fn fetch_coupon_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<Coupon>, sqlx::Error> {
    let coupon = sqlx::query_as("SELECT * FROM coupons WHERE code = upper($1)")
        .bind(code)
        .fetch_optional(conn)
        .await?;
    Ok(coupon)
}

/// Increments the usage counter for a coupon. Called from inside the placement transaction only, so an increment
/// without a matching order can never be observed.
pub async fn increment_usage(coupon_id: i64, conn: &mut SqliteConnection) -> Result<(), ShopDatabaseError> {
    let rows = sqlx::query("UPDATE coupons SET times_used = times_used + 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(coupon_id)
        .execute(conn)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(ShopDatabaseError::DatabaseError(format!("Coupon id {coupon_id} vanished during placement")));
    }
    trace!("📝️ Coupon id {coupon_id} usage incremented");
    Ok(())
}

/// Seeding helper used by the test fixtures.
pub async fn insert_coupon(coupon: &Coupon, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO coupons (code, kind, value, max_discount, min_order_amount, description, is_active, starts_at,
                             expires_at, usage_limit, times_used)
        VALUES (upper($1), $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        "#,
    )
    .bind(&coupon.code)
    .bind(coupon.kind.to_string())
    .bind(coupon.value)
    .bind(coupon.max_discount)
    .bind(coupon.min_order_amount)
    .bind(&coupon.description)
    .bind(coupon.is_active)
    .bind(coupon.starts_at)
    .bind(coupon.expires_at)
    .bind(coupon.usage_limit)
    .bind(coupon.times_used)
    .fetch_one(conn)
    .await?;
    Ok(id)
}
