//! Bloom Order Engine
//!
//! The Bloom order engine drives the order lifecycle for the Bloom flower-shop storefront: cart pricing, coupon
//! validation, atomic order placement, time-based status progression and best-effort customer notifications.
//! It is storefront-agnostic; rendering, catalog CRUD and authentication live elsewhere.
//!
//! The library is divided into three main sections:
//! 1. Database management ([`mod@sqlite`]). SQLite is the supported backend. You should never need to access the
//!    database directly. Instead, use the public APIs in [`mod@shop_api`]. The exception is the data types used in the
//!    database. These are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@shop_api`]). Cart mutations ([`CartApi`]), authoritative coupon validation
//!    ([`CouponApi`]) and the order placement / cancellation / tracking flow ([`OrderFlowApi`]). Backends implement
//!    [`ShopDatabase`] to power these APIs.
//! 3. Background machinery: the [`scheduler::StatusScheduler`] that advances orders through the fulfilment state
//!    machine, and the [`notify`] module that pushes confirmation and status-update messages over two channels.
//!
//! The engine also emits events when orders are created or change status. A simple actor framework ([`mod@events`])
//! lets callers hook into these events; the server uses it to dispatch notifications without coupling them to the
//! request/response cycle.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod kv;
pub mod notify;
pub mod pricing;
pub mod scheduler;
pub mod shop_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use shop_api::{
    cart_api::{CartApi, CartMutationOutcome, CouponFailPolicy},
    coupon_api::{CouponApi, CouponValidation},
    errors::{CartApiError, CouponRejection, FieldError, OrderFlowError},
    order_flow_api::OrderFlowApi,
    order_objects,
};
pub use traits::{ShopDatabase, ShopDatabaseError};
