use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest, web, ResponseError};
use bloom_engine::{
    events::EventProducers,
    scheduler::{ProgressionRules, StatusScheduler},
};

use super::{
    helpers::send_request,
    mocks::{mock_with_inert_clones, MockShopDb},
};
use crate::routes::{trigger_sweep, SchedulerStatusRoute, TriggerSweepRoute};

#[actix_web::test]
async fn the_status_endpoint_reports_an_idle_scheduler() {
    let scheduler =
        StatusScheduler::new(mock_with_inert_clones(), EventProducers::default(), ProgressionRules::default());
    let req = TestRequest::get().uri("/status");
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(scheduler)).service(SchedulerStatusRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"running\":false"), "Unexpected body: {body}");
    assert!(body.contains("\"last_run\":null"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn a_manual_trigger_runs_a_sweep_and_reports_the_summary() {
    let mut db = mock_with_inert_clones();
    // One range query per non-terminal status; nothing is stale.
    db.expect_fetch_orders_in_status_older_than().returning(|_, _| Ok(vec![]));
    let scheduler = StatusScheduler::new(db, EventProducers::default(), ProgressionRules::default());
    let req = TestRequest::post().uri("/trigger");
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(scheduler)).service(TriggerSweepRoute::<MockShopDb>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"advanced\":0"), "Unexpected body: {body}");
    assert!(body.contains("\"errors\":0"), "Unexpected body: {body}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_trigger_during_a_running_sweep_is_rejected() {
    let mut db = mock_with_inert_clones();
    // Hold the sweep open long enough for the second trigger to land inside it.
    db.expect_fetch_orders_in_status_older_than().returning(|_, _| {
        std::thread::sleep(Duration::from_millis(250));
        Ok(vec![])
    });
    let scheduler = StatusScheduler::new(db, EventProducers::default(), ProgressionRules::default());

    // Clones share the overlap guard, so this handle observes the sweep started on the original.
    let observer = scheduler.clone();
    let sweep = tokio::spawn(async move { scheduler.trigger_once().await });
    while !observer.status().await.sweep_in_progress {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(observer.trigger_once().await.is_none(), "a concurrent trigger must be skipped");
    let err = trigger_sweep::<MockShopDb>(web::Data::new(observer))
        .await
        .expect_err("the endpoint must refuse while a sweep is running");
    assert_eq!(err.status_code(), StatusCode::CONFLICT);

    assert!(sweep.await.unwrap().is_some(), "the original sweep still completes");
}
