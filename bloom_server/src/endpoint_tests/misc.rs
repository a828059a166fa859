use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::send_request;
use crate::routes::{health, DeliveryStatusWebhookRoute};

#[actix_web::test]
async fn health_check() {
    let req = TestRequest::get().uri("/health");
    let (status, body) = send_request(req, |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "🌸️\n");
}

#[actix_web::test]
async fn provider_receipts_are_acknowledged() {
    let payload = json!({
        "messageId": "fake-0001",
        "status": "delivered",
        "to": "+919876543210"
    });
    let req = TestRequest::post().uri("/delivery-status").set_json(payload);
    let (status, body) = send_request(req, |cfg| {
        cfg.service(DeliveryStatusWebhookRoute::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("acknowledged"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn failed_deliveries_are_still_acknowledged() {
    let payload = json!({
        "messageId": "fake-0002",
        "status": "failed",
        "to": "+919876543210",
        "errorCode": 30003,
        "errorMessage": "Unreachable destination handset"
    });
    let req = TestRequest::post().uri("/delivery-status").set_json(payload);
    let (status, body) = send_request(req, |cfg| {
        cfg.service(DeliveryStatusWebhookRoute::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("acknowledged"), "Unexpected body: {body}");
}
