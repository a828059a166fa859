//! # Bloom storefront server
//!
//! This crate hosts the HTTP face of the Bloom order pipeline. It is responsible for:
//! * serving the cart, coupon, checkout and tracking endpoints the storefront calls,
//! * wiring order events to the notification dispatcher,
//! * running the status progression scheduler as a background task.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Identity
//! The server sits behind the storefront, which authenticates users upstream and forwards a coarse identity
//! signal: `x-bloom-user-id` for signed-in users, `x-bloom-session` for guests. The pipeline never sees
//! credentials.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
