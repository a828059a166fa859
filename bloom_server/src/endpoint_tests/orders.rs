use actix_web::{http::StatusCode, test::TestRequest, web};
use bloom_engine::{
    db_types::{Order, OrderNo, OrderStatusType},
    events::EventProducers,
    traits::ShopDatabaseError,
    OrderFlowApi,
};
use serde_json::json;

use super::{
    helpers::send_request,
    mocks::{mock_with_inert_clones, MockShopDb},
};
use crate::routes::{CancelOrderRoute, PlaceOrderRoute, TrackOrderRoute};

fn order_api(db: MockShopDb) -> OrderFlowApi<MockShopDb> {
    OrderFlowApi::new(db, EventProducers::default())
}

#[actix_web::test]
async fn tracking_an_unknown_order_is_a_404() {
    let mut db = mock_with_inert_clones();
    db.expect_fetch_order_by_number().returning(|_| Ok(None));
    let api = order_api(db);
    let req = TestRequest::get().uri("/orders/BLM-20260801-NOPE01");
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(TrackOrderRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("not found"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn tracking_reports_the_timeline_and_cancellability() {
    let mut db = mock_with_inert_clones();
    db.expect_fetch_order_by_number()
        .withf(|no| no.as_str() == "BLM-20260801-TEST01")
        .returning(|_| Ok(Some(Order::default())));
    let api = order_api(db);
    let req = TestRequest::get().uri("/orders/BLM-20260801-TEST01");
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(TrackOrderRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("BLM-20260801-TEST01"), "Unexpected body: {body}");
    // A pending order can still be cancelled.
    assert!(body.contains("\"can_cancel\":true"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn cancelling_a_shipped_order_is_a_409() {
    let mut db = mock_with_inert_clones();
    db.expect_fetch_order_by_number().returning(|_| {
        let order = Order { status: OrderStatusType::Shipped, ..Order::default() };
        Ok(Some(order))
    });
    db.expect_cancel_order().returning(|no: &OrderNo| {
        Err(ShopDatabaseError::TransitionForbidden(format!("Order {no} has already shipped")))
    });
    let api = order_api(db);
    let req = TestRequest::post().uri("/orders/BLM-20260801-TEST01/cancel");
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(CancelOrderRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already shipped"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn a_malformed_checkout_reports_every_bad_field() {
    // Validation fails before any store access, so the mock needs no expectations beyond its clones.
    let api = order_api(mock_with_inert_clones());
    let payload = json!({
        "customer_name": "  ",
        "customer_phone": "123",
        "items": [],
        "delivery_option_id": 1,
        "shipping_address": "",
        "payment_method": "Card"
    });
    let req = TestRequest::post().uri("/orders").insert_header(("x-bloom-user-id", "42")).set_json(payload);
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(PlaceOrderRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["customer_name", "customer_phone", "items", "shipping_address"] {
        assert!(body.contains(field), "Expected a field error for {field}: {body}");
    }
}
