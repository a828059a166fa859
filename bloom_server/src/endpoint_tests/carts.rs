use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest, web};
use bloom_common::Rupees;
use bloom_engine::{
    db_types::{AppliedCoupon, CartLine, CartState, Product},
    test_utils::save10,
    CartApi,
    CouponFailPolicy,
    ShopDatabaseError,
};
use serde_json::json;

use super::{
    helpers::send_request,
    mocks::{mock_with_inert_clones, MockShopDb},
};
use crate::routes::{AddCartItemRoute, ShoppingCartRoute};

fn cart_api(db: MockShopDb) -> CartApi<MockShopDb> {
    CartApi::new(db, Duration::from_secs(3600), CouponFailPolicy::Keep)
}

fn rose_bouquet() -> Product {
    Product { id: 1, name: "Rose Bouquet".into(), unit_price: Rupees::from_rupees(800), stock: 50, is_active: true }
}

/// A backend whose coupon store is unreachable. The cart APIs re-validate coupons through an internal validator
/// built from a clone, so the failure is planted on the clone.
fn coupon_store_down() -> MockShopDb {
    let mut db = MockShopDb::new();
    db.expect_clone().returning(|| {
        let mut validator = MockShopDb::new();
        validator
            .expect_fetch_coupon_by_code()
            .returning(|_| Err(ShopDatabaseError::DatabaseError("the coupon store is down".into())));
        validator
    });
    db
}

/// One rose bouquet with SAVE10 already applied against it.
fn cart_with_save10() -> CartState {
    let line =
        CartLine { product_id: 1, name: "Rose Bouquet".into(), unit_price: Rupees::from_rupees(800), quantity: 1 };
    CartState {
        lines: vec![line],
        coupon: Some(AppliedCoupon::from_coupon(&save10(), Rupees::from_rupees(80))),
        ..CartState::default()
    }
}

#[actix_web::test]
async fn requests_without_identity_are_rejected() {
    let api = cart_api(mock_with_inert_clones());
    let req = TestRequest::get().uri("/cart");
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(ShoppingCartRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("No user id or session token"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn adding_an_item_reprices_the_cart_from_the_catalog() {
    let mut db = mock_with_inert_clones();
    db.expect_fetch_product().withf(|id| *id == 1).returning(|_| Ok(Some(rose_bouquet())));
    db.expect_load_cart().withf(|key| key == "user:42").returning(|_| Ok(None));
    db.expect_save_cart().withf(|key, cart| key == "user:42" && cart.item_count() == 2).returning(|_, _| Ok(()));
    let api = cart_api(db);
    let req = TestRequest::post()
        .uri("/cart/items")
        .insert_header(("x-bloom-user-id", "42"))
        .set_json(json!({ "product_id": 1, "quantity": 2 }));
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(AddCartItemRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    // 2 × ₹800, in paise. The client never sent a price.
    assert!(body.contains("\"subtotal\":160000"), "Unexpected body: {body}");
    assert!(body.contains("\"item_count\":2"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn adding_an_unknown_product_is_a_404() {
    let mut db = mock_with_inert_clones();
    db.expect_fetch_product().returning(|_| Ok(None));
    db.expect_load_cart().returning(|_| Ok(None));
    let api = cart_api(db);
    let req = TestRequest::post()
        .uri("/cart/items")
        .insert_header(("x-bloom-user-id", "42"))
        .set_json(json!({ "product_id": 7, "quantity": 1 }));
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(AddCartItemRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Product 7 does not exist"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn keep_policy_holds_the_coupon_when_the_store_is_unreachable() {
    let mut db = coupon_store_down();
    db.expect_fetch_product().returning(|_| Ok(Some(rose_bouquet())));
    db.expect_load_cart().returning(|_| Ok(Some(cart_with_save10())));
    db.expect_save_cart().withf(|_, cart| cart.coupon.is_some()).returning(|_, _| Ok(()));
    let api = cart_api(db);
    let req = TestRequest::post()
        .uri("/cart/items")
        .insert_header(("x-bloom-user-id", "42"))
        .set_json(json!({ "product_id": 1, "quantity": 1 }));
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(AddCartItemRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("SAVE10"), "Unexpected body: {body}");
    // ₹1600 subtotal, 10% recomputed from the cart's own snapshot, capped at ₹150.
    assert!(body.contains("\"discount\":15000"), "Unexpected body: {body}");
    assert!(!body.contains("coupon_dropped"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn drop_policy_sheds_the_coupon_when_the_store_is_unreachable() {
    let mut db = coupon_store_down();
    db.expect_fetch_product().returning(|_| Ok(Some(rose_bouquet())));
    db.expect_load_cart().returning(|_| Ok(Some(cart_with_save10())));
    db.expect_save_cart().withf(|_, cart| cart.coupon.is_none()).returning(|_, _| Ok(()));
    let api = CartApi::new(db, Duration::from_secs(3600), CouponFailPolicy::Drop);
    let req = TestRequest::post()
        .uri("/cart/items")
        .insert_header(("x-bloom-user-id", "42"))
        .set_json(json!({ "product_id": 1, "quantity": 1 }));
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(AddCartItemRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("coupon_dropped"), "Unexpected body: {body}");
    assert!(body.contains("\"discount\":0"), "Unexpected body: {body}");
}
