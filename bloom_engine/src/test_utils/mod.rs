//! Helpers for integration tests: environment setup and a seeded in-memory store.
use bloom_common::Rupees;
use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{Coupon, DeliveryOption, DiscountKind, Product},
    sqlite::{
        db::{catalog, coupons},
        SqliteDatabase,
    },
};

pub fn prepare_test_env() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
}

/// A fresh in-memory database with migrations applied. Each call returns an isolated store.
pub async fn new_test_db() -> SqliteDatabase {
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating in-memory database")
}

/// A store seeded with a small catalog, two delivery options and the two standard demo coupons.
///
/// Seeded ids: products 1 (Rose Bouquet, ₹800, stock 50), 2 (Lily Basket, ₹1500, stock 10) and
/// 3 (Orchid Pot, ₹2300, stock 3); delivery options 1 (Standard, ₹100) and 2 (Express, ₹250).
pub async fn seeded_test_db() -> SqliteDatabase {
    let db = new_test_db().await;
    let mut conn = db.pool().acquire().await.expect("Error acquiring a connection");
    for (name, price, stock) in
        [("Rose Bouquet", 800, 50), ("Lily Basket", 1500, 10), ("Orchid Pot", 2300, 3)]
    {
        let product =
            Product { id: 0, name: name.into(), unit_price: Rupees::from_rupees(price), stock, is_active: true };
        catalog::insert_product(&product, &mut conn).await.expect("Error seeding product");
    }
    for (name, estimate, price, days, sort_order) in
        [("Standard", "3-5 business days", 100, 4, 1), ("Express", "1-2 business days", 250, 2, 2)]
    {
        let option = DeliveryOption {
            id: 0,
            name: name.into(),
            estimate: estimate.into(),
            price: Rupees::from_rupees(price),
            delivery_days: days,
            is_active: true,
            sort_order,
        };
        catalog::insert_delivery_option(&option, &mut conn).await.expect("Error seeding delivery option");
    }
    coupons::insert_coupon(&save10(), &mut conn).await.expect("Error seeding coupon");
    coupons::insert_coupon(&flat500(), &mut conn).await.expect("Error seeding coupon");
    info!("🚀️ Test store seeded");
    db
}

/// 10% off, capped at ₹150, minimum order ₹500.
pub fn save10() -> Coupon {
    Coupon {
        id: 0,
        code: "SAVE10".into(),
        kind: DiscountKind::Percentage,
        value: 10,
        max_discount: Some(Rupees::from_rupees(150)),
        min_order_amount: Rupees::from_rupees(500),
        description: Some("10% off, up to ₹150".into()),
        is_active: true,
        starts_at: None,
        expires_at: Some(Utc::now() + Duration::days(30)),
        usage_limit: Some(100),
        times_used: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A flat ₹500 off with no minimum.
pub fn flat500() -> Coupon {
    Coupon {
        id: 0,
        code: "FLAT500".into(),
        kind: DiscountKind::Fixed,
        value: Rupees::from_rupees(500).value(),
        max_discount: None,
        min_order_amount: Rupees::default(),
        description: Some("₹500 off any order".into()),
        is_active: true,
        starts_at: None,
        expires_at: None,
        usage_limit: None,
        times_used: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
