//! Scheduler sweeps against a real store. Orders are backdated by rewriting `status_updated_at` directly, which
//! is exactly what the production query sees.
use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use bloom_common::Rupees;
use bloom_engine::{
    db_types::*,
    events::{EventHandlers, EventHooks, EventProducers},
    helpers::new_order_number,
    scheduler::{ProgressionRules, StatusScheduler},
    test_utils::{prepare_test_env, seeded_test_db},
    ShopDatabase,
    SqliteDatabase,
};
use chrono::Utc;

async fn pending_order(db: &SqliteDatabase) -> Order {
    let order = NewOrder {
        order_no: new_order_number(),
        contact: CustomerContact {
            name: "Asha Rao".into(),
            phone: "+919876543210".into(),
            email: "asha@example.com".into(),
        },
        items: vec![CartLine { product_id: 1, name: "Rose Bouquet".into(), unit_price: Rupees::from_rupees(800), quantity: 1 }],
        totals: CartTotals {
            item_count: 1,
            subtotal: Rupees::from_rupees(800),
            discount: Rupees::from(0),
            delivery_charge: Rupees::from_rupees(100),
            payment_surcharge: Rupees::from(0),
            total: Rupees::from_rupees(900),
        },
        coupon_code: None,
        delivery_option: "Standard".into(),
        shipping_address: "12 MG Road, Bengaluru 560001".into(),
        payment_method: PaymentMethod::Upi,
        estimated_delivery_date: Utc::now().date_naive(),
    };
    db.place_order(order, "user:100", None).await.expect("Error inserting test order")
}

async fn backdate(db: &SqliteDatabase, order_id: i64, minutes: i64) {
    sqlx::query("UPDATE orders SET status_updated_at = datetime(CURRENT_TIMESTAMP, $1) WHERE id = $2")
        .bind(format!("-{minutes} minutes"))
        .bind(order_id)
        .execute(db.pool())
        .await
        .expect("Error backdating order");
}

#[tokio::test]
async fn fresh_orders_are_left_alone() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let order = pending_order(&db).await;
    backdate(&db, order.id, 29).await;

    let scheduler = StatusScheduler::new(db.clone(), EventProducers::default(), ProgressionRules::default());
    let summary = scheduler.trigger_once().await.expect("the sweep should run");
    assert_eq!(summary.advanced, 0);
    assert_eq!(summary.errors, 0);
    let order = db.fetch_order_by_number(&order.order_no).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
}

#[tokio::test]
async fn stale_orders_advance_one_step() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let order = pending_order(&db).await;
    backdate(&db, order.id, 31).await;

    let scheduler = StatusScheduler::new(db.clone(), EventProducers::default(), ProgressionRules::default());
    let summary = scheduler.trigger_once().await.unwrap();
    assert_eq!(summary.advanced, 1);

    let order = db.fetch_order_by_number(&order.order_no).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Confirmed);

    // The dwell clock restarts on transition, so an immediate second sweep does nothing.
    let summary = scheduler.trigger_once().await.unwrap();
    assert_eq!(summary.advanced, 0);
}

#[tokio::test]
async fn cancelled_and_delivered_orders_are_never_touched() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let order = pending_order(&db).await;
    db.cancel_order(&order.order_no).await.unwrap();
    backdate(&db, order.id, 600).await;

    let scheduler = StatusScheduler::new(db.clone(), EventProducers::default(), ProgressionRules::default());
    let summary = scheduler.trigger_once().await.unwrap();
    assert_eq!(summary.advanced, 0);
    let order = db.fetch_order_by_number(&order.order_no).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Cancelled);
}

#[tokio::test]
async fn each_advance_publishes_exactly_one_event() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let order = pending_order(&db).await;
    backdate(&db, order.id, 31).await;

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    let mut hooks = EventHooks::default();
    hooks.on_status_changed(move |event| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            assert_eq!(event.old_status, OrderStatusType::Pending);
            assert_eq!(event.order.status, OrderStatusType::Confirmed);
            counter.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let scheduler = StatusScheduler::new(db.clone(), producers, ProgressionRules::default());
    let summary = scheduler.trigger_once().await.unwrap();
    assert_eq!(summary.advanced, 1);

    // Handlers run on spawned tasks; give them a beat.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn stopping_ends_the_loop_without_a_trailing_sweep() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let scheduler = StatusScheduler::new(db, EventProducers::default(), ProgressionRules::default());

    scheduler.start(std::time::Duration::from_secs(60));
    // Spin until the immediate first sweep lands. Yielding keeps the paused clock from jumping to the next tick.
    let mut first_run = None;
    while first_run.is_none() {
        tokio::task::yield_now().await;
        first_run = scheduler.status().await.last_run;
    }

    let sweep_loop = scheduler.stop().expect("the scheduler owns its loop handle");
    // The loop must exit now, not at the next tick.
    sweep_loop.await.unwrap();

    tokio::time::advance(std::time::Duration::from_secs(180)).await;
    tokio::task::yield_now().await;
    let status = scheduler.status().await;
    assert!(!status.running);
    assert_eq!(status.last_run, first_run, "no sweep may run after stop");
}

#[tokio::test]
async fn status_reflects_the_last_sweep() {
    prepare_test_env();
    let db = seeded_test_db().await;
    let scheduler = StatusScheduler::new(db, EventProducers::default(), ProgressionRules::default());

    let status = scheduler.status().await;
    assert!(!status.running);
    assert!(status.last_run.is_none());

    scheduler.trigger_once().await.unwrap();
    let status = scheduler.status().await;
    assert!(status.last_run.is_some());
    assert_eq!(status.last_result.unwrap().advanced, 0);
}
