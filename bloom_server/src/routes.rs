//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database calls) must
//! therefore be expressed as a future or an async function so that worker threads can interleave requests.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use bloom_engine::{
    db_types::{NewAddress, OrderNo},
    helpers::mask_phone,
    order_objects::{CheckoutPayload, OrderSummary},
    CartApi,
    CouponApi,
    OrderFlowApi,
    ShopDatabase,
};
use log::*;

use crate::{
    data_objects::{
        AddItemParams,
        AddressIdParams,
        CouponParams,
        DeliveryOptionParams,
        DeliveryStatusWebhook,
        JsonResponse,
        PaymentMethodParams,
        QuantityParams,
        ValidateCouponParams,
    },
    errors::ServerError,
    helpers::cart_owner,
};

// Web-actix cannot handle generics in handlers, so the registration is implemented manually via the `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
            impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $bound:ty) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! {
            impl<B> [<$name:camel Route>]<B> {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self(core::marker::PhantomData) }
            }
        }
        paste::paste! {
            impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
            where B: $bound + 'static
            {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name::<B>);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("🌸️\n")
}

//----------------------------------------------    Cart   ----------------------------------------------------
route!(shopping_cart => Get "/cart" impl ShopDatabase);
/// The current cart with derived totals. Identity comes from the storefront headers; see [`cart_owner`].
pub async fn shopping_cart<B: ShopDatabase>(
    req: HttpRequest,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    trace!("💻️ GET cart for {owner}");
    let outcome = api.cart(&owner).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(add_cart_item => Post "/cart/items" impl ShopDatabase);
pub async fn add_cart_item<B: ShopDatabase>(
    req: HttpRequest,
    body: web::Json<AddItemParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    let params = body.into_inner();
    debug!("💻️ {owner} adds {}× product {}", params.quantity, params.product_id);
    let outcome = api.add_item(&owner, params.product_id, params.quantity).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(set_cart_quantity => Put "/cart/items/{product_id}" impl ShopDatabase);
pub async fn set_cart_quantity<B: ShopDatabase>(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<QuantityParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    let product_id = path.into_inner();
    let outcome = api.set_quantity(&owner, product_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(remove_cart_item => Delete "/cart/items/{product_id}" impl ShopDatabase);
pub async fn remove_cart_item<B: ShopDatabase>(
    req: HttpRequest,
    path: web::Path<i64>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    let outcome = api.remove_item(&owner, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(apply_coupon => Post "/cart/coupon" impl ShopDatabase);
/// Applies a coupon to the cart. A rejection comes back as 422 with the reason verbatim; the cart is unchanged.
pub async fn apply_coupon<B: ShopDatabase>(
    req: HttpRequest,
    body: web::Json<CouponParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    debug!("💻️ {owner} applies coupon");
    let outcome = api.apply_coupon(&owner, &body.code).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(remove_coupon => Delete "/cart/coupon" impl ShopDatabase);
pub async fn remove_coupon<B: ShopDatabase>(
    req: HttpRequest,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    let outcome = api.remove_coupon(&owner).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(set_delivery_option => Post "/cart/delivery-option" impl ShopDatabase);
pub async fn set_delivery_option<B: ShopDatabase>(
    req: HttpRequest,
    body: web::Json<DeliveryOptionParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    let outcome = api.set_delivery_option(&owner, body.delivery_option_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(set_payment_method => Post "/cart/payment-method" impl ShopDatabase);
pub async fn set_payment_method<B: ShopDatabase>(
    req: HttpRequest,
    body: web::Json<PaymentMethodParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    let outcome = api.set_payment_method(&owner, body.payment_method).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(set_cart_address => Post "/cart/address" impl ShopDatabase);
pub async fn set_cart_address<B: ShopDatabase>(
    req: HttpRequest,
    body: web::Json<AddressIdParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    let outcome = api.set_shipping_address(&owner, body.address_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------  Catalog  ----------------------------------------------------
route!(delivery_options => Get "/delivery-options" impl ShopDatabase);
pub async fn delivery_options<B: ShopDatabase>(db: web::Data<B>) -> Result<HttpResponse, ServerError> {
    let options = db.fetch_delivery_options().await?;
    Ok(HttpResponse::Ok().json(options))
}

//----------------------------------------------  Coupons  ----------------------------------------------------
route!(validate_coupon => Post "/coupons/validate" impl ShopDatabase);
/// Standalone coupon validation for the storefront's coupon field. Always 200; the verdict is in the body, so
/// the UI can render the rejection reason inline without special-casing error statuses.
pub async fn validate_coupon<B: ShopDatabase>(
    body: web::Json<ValidateCouponParams>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    trace!("💻️ Validating a coupon against a subtotal of {}", params.subtotal);
    let validation = api.validate_code(&params.code, params.subtotal).await?;
    Ok(HttpResponse::Ok().json(validation))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(place_order => Post "/orders" impl ShopDatabase);
/// Checkout. On success the response is 201 with the order summary; the full pricing breakdown in the response
/// is the authoritative one, whatever the client calculated.
pub async fn place_order<B: ShopDatabase>(
    req: HttpRequest,
    body: web::Json<CheckoutPayload>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    info!("💻️ Checkout request from {owner}");
    let order = api.place_order(&owner, &body.into_inner()).await?;
    Ok(HttpResponse::Created().json(OrderSummary::from(&order)))
}

route!(track_order => Get "/orders/{order_no}" impl ShopDatabase);
pub async fn track_order<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_no = OrderNo::from(path.into_inner());
    trace!("💻️ Tracking request for {order_no}");
    let tracking = api.track_order(&order_no).await?;
    Ok(HttpResponse::Ok().json(tracking))
}

route!(cancel_order => Post "/orders/{order_no}/cancel" impl ShopDatabase);
pub async fn cancel_order<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_no = OrderNo::from(path.into_inner());
    info!("💻️ Cancellation request for {order_no}");
    let order = api.cancel_order(&order_no).await?;
    Ok(HttpResponse::Ok().json(OrderSummary::from(&order)))
}

//---------------------------------------------- Addresses ----------------------------------------------------
route!(my_addresses => Get "/addresses" impl ShopDatabase);
pub async fn my_addresses<B: ShopDatabase>(req: HttpRequest, db: web::Data<B>) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    let addresses = db.fetch_addresses(&owner.key()).await?;
    Ok(HttpResponse::Ok().json(addresses))
}

route!(new_address => Post "/addresses" impl ShopDatabase);
pub async fn new_address<B: ShopDatabase>(
    req: HttpRequest,
    body: web::Json<NewAddress>,
    db: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&req)?;
    debug!("💻️ {owner} saves a new address");
    let address = db.insert_address(&owner.key(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(address))
}

//---------------------------------------------- Scheduler ----------------------------------------------------
route!(scheduler_status => Get "/status" impl ShopDatabase);
pub async fn scheduler_status<B: ShopDatabase>(
    scheduler: web::Data<bloom_engine::scheduler::StatusScheduler<B>>,
) -> Result<HttpResponse, ServerError> {
    Ok(HttpResponse::Ok().json(scheduler.status().await))
}

route!(trigger_sweep => Post "/trigger" impl ShopDatabase);
/// Runs a progression sweep immediately. A request that lands while a sweep is in flight is refused with 409,
/// just as the timer skips an overlapping tick.
pub async fn trigger_sweep<B: ShopDatabase>(
    scheduler: web::Data<bloom_engine::scheduler::StatusScheduler<B>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ Manual progression sweep requested");
    match scheduler.trigger_once().await {
        Some(summary) => Ok(HttpResponse::Ok().json(summary)),
        None => Err(ServerError::Forbidden("A sweep is already in progress".into())),
    }
}

//----------------------------------------------  Webhooks ----------------------------------------------------
route!(delivery_status_webhook => Post "/delivery-status");
/// Messaging-provider delivery receipt. Always acknowledged; receipts are logged for reconciliation and never
/// touch order state.
pub async fn delivery_status_webhook(body: web::Json<DeliveryStatusWebhook>) -> HttpResponse {
    let receipt = body.into_inner();
    info!("💻️ Message {} to {} is now '{}'", receipt.message_id, mask_phone(&receipt.to), receipt.status);
    if receipt.error_code.is_some() || receipt.error_message.is_some() {
        warn!(
            "💻️ The provider reported a problem with message {}: {} ({})",
            receipt.message_id,
            receipt.error_message.as_deref().unwrap_or("no message"),
            receipt.error_code.map(|c| c.to_string()).unwrap_or_else(|| "no code".into())
        );
    }
    HttpResponse::Ok().json(JsonResponse::success("acknowledged"))
}
