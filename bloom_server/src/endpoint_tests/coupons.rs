use actix_web::{http::StatusCode, test::TestRequest, web};
use bloom_engine::{test_utils::save10, CouponApi};
use serde_json::json;

use super::{helpers::send_request, mocks::MockShopDb};
use crate::routes::ValidateCouponRoute;

#[actix_web::test]
async fn a_valid_code_comes_back_with_its_discount() {
    let mut db = MockShopDb::new();
    // The handler must normalise the code before hitting the store.
    db.expect_fetch_coupon_by_code().withf(|code| code == "SAVE10").returning(|_| Ok(Some(save10())));
    let api = CouponApi::new(db);
    let req = TestRequest::post().uri("/coupons/validate").set_json(json!({ "code": " save10 ", "subtotal": 230_000 }));
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(ValidateCouponRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    // 10% of ₹2300 is ₹230, capped at ₹150.
    assert!(body.contains("\"valid\":true"), "Unexpected body: {body}");
    assert!(body.contains("\"discount\":15000"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn an_unknown_code_is_still_a_200_with_the_verdict_inline() {
    let mut db = MockShopDb::new();
    db.expect_fetch_coupon_by_code().returning(|_| Ok(None));
    let api = CouponApi::new(db);
    let req = TestRequest::post().uri("/coupons/validate").set_json(json!({ "code": "NOPE", "subtotal": 50_000 }));
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(ValidateCouponRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"valid\":false"), "Unexpected body: {body}");
    assert!(body.contains("Coupon NOPE does not exist"), "Unexpected body: {body}");
}
