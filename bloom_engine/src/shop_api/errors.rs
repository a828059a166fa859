use bloom_common::Rupees;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{db_types::OrderNo, traits::ShopDatabaseError};

/// Business-rule rejections for coupons. The messages are surfaced verbatim to the user; they are never silently
/// coerced into a generic failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CouponRejection {
    #[error("Coupon {0} does not exist")]
    NotFound(String),
    #[error("Coupon {0} is no longer active")]
    Inactive(String),
    #[error("Coupon {0} is not valid yet")]
    NotYetActive(String),
    #[error("Coupon {0} has expired")]
    Expired(String),
    #[error("Coupon {0} has been fully redeemed")]
    UsageLimitReached(String),
    #[error("Coupon {code} requires a minimum order of {min}")]
    MinOrderNotMet { code: String, min: Rupees },
}

/// A field-level validation failure in a checkout payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Errors from the order placement / cancellation / tracking flow, following the pipeline's error taxonomy.
/// `Validation` and `BusinessRules` are client errors; `Persistence` is safe to retry (the order is guaranteed not
/// to have been partially created); `Internal` is unexpected.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("The checkout payload is malformed")]
    Validation(Vec<FieldError>),
    #[error("The order was rejected: {}", .0.join("; "))]
    BusinessRules(Vec<String>),
    #[error("The order could not be committed. It is safe to retry. {0}")]
    Persistence(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNo),
    #[error("The order can no longer be cancelled. {0}")]
    CancellationForbidden(String),
    #[error("Unexpected error. {0}")]
    Internal(String),
}

impl From<ShopDatabaseError> for OrderFlowError {
    fn from(e: ShopDatabaseError) -> Self {
        match e {
            ShopDatabaseError::OrderNotFound(no) => OrderFlowError::OrderNotFound(no),
            ShopDatabaseError::TransitionForbidden(msg) => OrderFlowError::CancellationForbidden(msg),
            ShopDatabaseError::OrderNoConflict(no) => {
                OrderFlowError::Persistence(format!("Order number collision on {no}"))
            },
            ShopDatabaseError::DatabaseError(msg) => OrderFlowError::Persistence(msg),
            ShopDatabaseError::StaleStatusTransition(msg) => OrderFlowError::Persistence(msg),
            ShopDatabaseError::OrderIdNotFound(id) => {
                OrderFlowError::Internal(format!("Order id {id} vanished mid-flow"))
            },
        }
    }
}

/// Errors from cart mutations. Coupon rejections are recovered locally wherever the cart itself remains valid;
/// everything else surfaces to the caller.
#[derive(Debug, Clone, Error)]
pub enum CartApiError {
    #[error("{0}")]
    Coupon(#[from] CouponRejection),
    #[error("Product {0} does not exist or is unavailable")]
    ProductUnavailable(i64),
    #[error("Product {0} is not in the cart")]
    LineNotFound(i64),
    #[error("Delivery option {0} does not exist or is inactive")]
    DeliveryOptionNotFound(i64),
    #[error("Address {0} does not exist for this session")]
    AddressNotFound(i64),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Database(#[from] ShopDatabaseError),
}
