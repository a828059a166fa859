//! Request and response objects for the order flow.
//!
//! The server deserializes [`CheckoutPayload`] straight from the wire, so every field the client controls lives
//! here rather than on the storage rows. Responses are projections: internal row ids and provider message ids
//! never leave the engine.
use bloom_common::Rupees;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{CustomerContact, Order, OrderNo, OrderStatusType, PaymentMethod, PaymentStatus};

/// One requested line in a checkout payload. Quantities are re-checked against stock and unit prices are looked
/// up server-side; the client never supplies a price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: i64,
    pub quantity: u32,
}

/// Everything the client submits to place an order.
///
/// `client_total` is advisory. The engine recomputes every amount from persisted prices and only logs a mismatch;
/// the client figure is never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPayload {
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub items: Vec<CheckoutItem>,
    pub delivery_option_id: i64,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub client_total: Option<Rupees>,
}

impl CheckoutPayload {
    pub fn contact(&self) -> CustomerContact {
        CustomerContact {
            name: self.customer_name.clone(),
            phone: self.customer_phone.clone(),
            email: self.customer_email.clone().unwrap_or_default(),
        }
    }
}

/// The public view of a placed order. This is what checkout and tracking endpoints return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_no: OrderNo,
    pub status: OrderStatusType,
    pub subtotal: Rupees,
    pub discount: Rupees,
    pub delivery_charge: Rupees,
    pub payment_surcharge: Rupees,
    pub total: Rupees,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub estimated_delivery_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_no: order.order_no.clone(),
            status: order.status,
            subtotal: order.subtotal,
            discount: order.discount,
            delivery_charge: order.delivery_charge,
            payment_surcharge: order.payment_surcharge,
            total: order.total,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            estimated_delivery_date: order.estimated_delivery_date,
            created_at: order.created_at,
        }
    }
}

/// One step in the tracking timeline. Steps are emitted in progression order, with `completed` set for every
/// status the order has already reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressStep {
    pub status: OrderStatusType,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reached_at: Option<DateTime<Utc>>,
}

/// Tracking view for a single order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTracking {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub steps: Vec<ProgressStep>,
    pub can_cancel: bool,
}

impl OrderTracking {
    pub fn from_order(order: &Order) -> Self {
        let current = order.status;
        let reached = |s: OrderStatusType| -> bool {
            if current == OrderStatusType::Cancelled {
                // A cancelled order keeps only the steps it had actually passed. Without a status history we only
                // know it at least entered the pipeline.
                return s == OrderStatusType::Pending;
            }
            OrderStatusType::progression().iter().position(|p| *p == s) <=
                OrderStatusType::progression().iter().position(|p| *p == current)
        };
        let steps = OrderStatusType::progression()
            .iter()
            .map(|&status| {
                let completed = reached(status);
                // Only the most recent transition carries a timestamp.
                let reached_at = (status == current).then_some(order.status_updated_at);
                ProgressStep { status, completed, reached_at }
            })
            .collect();
        Self { summary: OrderSummary::from(order), steps, can_cancel: current.can_cancel() }
    }
}
