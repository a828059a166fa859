//! End-to-end placement tests against a real (in-memory) store, covering the atomicity guarantees: a successful
//! placement persists the order, bumps the coupon and clears the cart as one unit, and a rejected placement
//! leaves no trace at all.
use std::time::Duration;

use bloom_common::Rupees;
use bloom_engine::{
    db_types::*,
    events::EventProducers,
    order_objects::{CheckoutItem, CheckoutPayload},
    test_utils::{prepare_test_env, seeded_test_db},
    CartApi,
    CouponFailPolicy,
    OrderFlowError,
    OrderFlowApi,
    ShopDatabase,
    SqliteDatabase,
};

fn checkout(items: Vec<CheckoutItem>, coupon: Option<&str>) -> CheckoutPayload {
    CheckoutPayload {
        customer_name: "Asha Rao".into(),
        customer_phone: "9876543210".into(),
        customer_email: Some("asha@example.com".into()),
        items,
        delivery_option_id: 1,
        shipping_address: "12 MG Road, Bengaluru 560001".into(),
        payment_method: PaymentMethod::Card,
        coupon_code: coupon.map(String::from),
        client_total: None,
    }
}

async fn order_count(db: &SqliteDatabase) -> i64 {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.unwrap();
    n
}

#[tokio::test]
async fn placement_commits_order_coupon_and_cart_together() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let owner = CartOwner::User(1);
    // A saved cart that the placement must clear.
    let cart = CartState {
        lines: vec![CartLine { product_id: 3, name: "Orchid Pot".into(), unit_price: Rupees::from_rupees(2300), quantity: 1 }],
        ..CartState::default()
    };
    db.save_cart(&owner.key(), &cart).await.unwrap();

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    // ₹2300 subtotal, 10% capped at ₹150, ₹100 standard delivery, no card surcharge.
    let payload = checkout(vec![CheckoutItem { product_id: 3, quantity: 1 }], Some("SAVE10"));
    let order = api.place_order(&owner, &payload).await.expect("placement should succeed");

    assert_eq!(order.subtotal, Rupees::from_rupees(2300));
    assert_eq!(order.discount, Rupees::from_rupees(150));
    assert_eq!(order.delivery_charge, Rupees::from_rupees(100));
    assert_eq!(order.payment_surcharge, Rupees::from(0));
    assert_eq!(order.total, Rupees::from_rupees(2250));
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    assert_eq!(order.customer_phone, "+919876543210");
    assert_eq!(order.coupon_code.as_deref(), Some("SAVE10"));

    let coupon = db.fetch_coupon_by_code("SAVE10").await.unwrap().unwrap();
    assert_eq!(coupon.times_used, 1);
    assert!(db.load_cart(&owner.key()).await.unwrap().is_none());

    let fetched = db.fetch_order_by_number(&order.order_no).await.unwrap().unwrap();
    assert_eq!(fetched.items().len(), 1);
    assert_eq!(fetched.items()[0].name, "Orchid Pot");
}

#[tokio::test]
async fn guest_checkout_clears_the_guest_cart() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let owner = CartOwner::Guest("s-77".into());
    let carts = CartApi::new(db.clone(), Duration::from_secs(3600), CouponFailPolicy::Keep);
    carts.add_item(&owner, 1, 2).await.unwrap();

    let api = OrderFlowApi::new(db.clone(), EventProducers::default()).with_guest_carts(carts.guest_carts());
    let payload = checkout(vec![CheckoutItem { product_id: 1, quantity: 2 }], None);
    api.place_order(&owner, &payload).await.expect("placement should succeed");

    let outcome = carts.cart(&owner).await.unwrap();
    assert!(outcome.cart.lines.is_empty(), "the guest cart must not survive checkout");
    assert_eq!(outcome.totals.item_count, 0);
}

#[tokio::test]
async fn rejected_coupon_aborts_with_no_side_effects() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let owner = CartOwner::User(2);
    db.save_cart(&owner.key(), &CartState::default()).await.unwrap();

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let payload = checkout(vec![CheckoutItem { product_id: 1, quantity: 1 }], Some("NOSUCHCODE"));
    let err = api.place_order(&owner, &payload).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::BusinessRules(ref reasons) if reasons[0].contains("NOSUCHCODE")));

    assert_eq!(order_count(&db).await, 0);
    let coupon = db.fetch_coupon_by_code("SAVE10").await.unwrap().unwrap();
    assert_eq!(coupon.times_used, 0);
    assert!(db.load_cart(&owner.key()).await.unwrap().is_some());
}

#[tokio::test]
async fn insufficient_stock_is_a_business_rule_failure() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    // Only 3 orchid pots in stock.
    let payload = checkout(vec![CheckoutItem { product_id: 3, quantity: 4 }], None);
    let err = api.place_order(&CartOwner::Guest("s-1".into()), &payload).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::BusinessRules(ref reasons) if reasons[0].contains("stock")));
    assert_eq!(order_count(&db).await, 0);
}

#[tokio::test]
async fn malformed_payloads_never_reach_the_store() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let mut payload = checkout(vec![], None);
    payload.customer_phone = "555".into();
    let err = api.place_order(&CartOwner::Guest("s-2".into()), &payload).await.unwrap_err();
    let OrderFlowError::Validation(errors) = err else {
        panic!("expected a validation error");
    };
    assert!(errors.iter().any(|e| e.field == "customer_phone"));
    assert!(errors.iter().any(|e| e.field == "items"));
    assert_eq!(order_count(&db).await, 0);
}

#[tokio::test]
async fn cod_surcharge_is_added_after_the_discount() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let mut payload = checkout(vec![CheckoutItem { product_id: 1, quantity: 1 }], Some("FLAT500"));
    payload.payment_method = PaymentMethod::CashOnDelivery;
    let order = api.place_order(&CartOwner::User(3), &payload).await.unwrap();
    // ₹800 - ₹500 + ₹100 delivery + ₹50 COD.
    assert_eq!(order.total, Rupees::from_rupees(450));
    assert_eq!(order.payment_surcharge, Rupees::from_rupees(50));
}

#[tokio::test]
async fn cancellation_follows_the_state_machine() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let payload = checkout(vec![CheckoutItem { product_id: 2, quantity: 1 }], None);
    let order = api.place_order(&CartOwner::User(4), &payload).await.unwrap();

    let cancelled = api.cancel_order(&order.order_no).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);

    // A shipped order can no longer be cancelled.
    let order = api.place_order(&CartOwner::User(4), &payload).await.unwrap();
    let mut current = order.clone();
    for next in [OrderStatusType::Confirmed, OrderStatusType::Processing, OrderStatusType::Shipped] {
        current = db.advance_order_status(current.id, current.status, next).await.unwrap();
    }
    let err = api.cancel_order(&order.order_no).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::CancellationForbidden(_)));

    let missing = OrderNo("BLM-20990101-ZZZZZZ".into());
    assert!(matches!(api.cancel_order(&missing).await.unwrap_err(), OrderFlowError::OrderNotFound(_)));
}

#[tokio::test]
async fn tracking_reports_progress_and_cancellability() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let payload = checkout(vec![CheckoutItem { product_id: 1, quantity: 2 }], None);
    let order = api.place_order(&CartOwner::Guest("s-3".into()), &payload).await.unwrap();

    let tracking = api.track_order(&order.order_no).await.unwrap();
    assert_eq!(tracking.summary.status, OrderStatusType::Pending);
    assert!(tracking.can_cancel);
    assert_eq!(tracking.steps.len(), 5);
    assert!(tracking.steps[0].completed);
    assert!(!tracking.steps[1].completed);
}
