use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bloom_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    notify::{LoggingProvider, NotificationDispatcher},
    scheduler::StatusScheduler,
    CartApi,
    CouponApi,
    OrderFlowApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        AddCartItemRoute,
        ApplyCouponRoute,
        CancelOrderRoute,
        DeliveryOptionsRoute,
        DeliveryStatusWebhookRoute,
        MyAddressesRoute,
        NewAddressRoute,
        PlaceOrderRoute,
        RemoveCartItemRoute,
        RemoveCouponRoute,
        SchedulerStatusRoute,
        SetCartAddressRoute,
        SetCartQuantityRoute,
        SetDeliveryOptionRoute,
        SetPaymentMethodRoute,
        ShoppingCartRoute,
        TrackOrderRoute,
        TriggerSweepRoute,
        ValidateCouponRoute,
    },
};

/// How often the guest-cart sweeper runs. Eviction correctness does not depend on this; expired carts read as
/// absent either way.
const GUEST_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;

    // Notifications hang off order events, so a slow or broken messaging gateway can never delay a response.
    let dispatcher = NotificationDispatcher::new(LoggingProvider);
    let handlers = EventHandlers::new(128, notification_hooks(dispatcher));
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let scheduler = StatusScheduler::new(db.clone(), producers.clone(), config.progression);
    if config.scheduler_disabled {
        warn!("🕰️ The status scheduler is disabled. Orders will only progress via manual sweeps.");
    } else {
        scheduler.start(config.scheduler_interval);
    }

    let cart_api = CartApi::new(db.clone(), config.guest_cart_ttl, config.coupon_fail_policy);
    cart_api.start_guest_sweeper(GUEST_SWEEP_INTERVAL);

    let srv = create_server_instance(config, db, cart_api, producers, scheduler.clone())?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    if let Some(sweep_loop) = scheduler.stop() {
        let _ = sweep_loop.await;
    }
    result
}

/// Wires the notification dispatcher into the order event hooks.
pub fn notification_hooks(dispatcher: NotificationDispatcher<LoggingProvider>) -> EventHooks {
    let mut hooks = EventHooks::default();
    let on_created = dispatcher.clone();
    hooks.on_order_created(move |event| {
        let dispatcher = on_created.clone();
        Box::pin(async move {
            dispatcher.send_order_confirmation(&event.order).await;
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    hooks.on_status_changed(move |event| {
        let dispatcher = dispatcher.clone();
        Box::pin(async move {
            dispatcher.send_status_update(&event.order).await;
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    cart_api: CartApi<SqliteDatabase>,
    producers: EventProducers,
    scheduler: StatusScheduler<SqliteDatabase>,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let coupon_api = CouponApi::new(db.clone());
        let order_api = OrderFlowApi::new(db.clone(), producers.clone()).with_guest_carts(cart_api.guest_carts());
        let api_scope = web::scope("/api")
            .service(ShoppingCartRoute::<SqliteDatabase>::new())
            .service(AddCartItemRoute::<SqliteDatabase>::new())
            .service(SetCartQuantityRoute::<SqliteDatabase>::new())
            .service(RemoveCartItemRoute::<SqliteDatabase>::new())
            .service(ApplyCouponRoute::<SqliteDatabase>::new())
            .service(RemoveCouponRoute::<SqliteDatabase>::new())
            .service(SetDeliveryOptionRoute::<SqliteDatabase>::new())
            .service(SetPaymentMethodRoute::<SqliteDatabase>::new())
            .service(SetCartAddressRoute::<SqliteDatabase>::new())
            .service(DeliveryOptionsRoute::<SqliteDatabase>::new())
            .service(ValidateCouponRoute::<SqliteDatabase>::new())
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(TrackOrderRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(MyAddressesRoute::<SqliteDatabase>::new())
            .service(NewAddressRoute::<SqliteDatabase>::new());
        let scheduler_scope = web::scope("/scheduler")
            .service(SchedulerStatusRoute::<SqliteDatabase>::new())
            .service(TriggerSweepRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhooks").service(DeliveryStatusWebhookRoute::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bloom::access_log"))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(cart_api.clone()))
            .app_data(web::Data::new(coupon_api))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(scheduler.clone()))
            .service(health)
            .service(api_scope)
            .service(scheduler_scope)
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
