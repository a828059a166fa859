use std::fmt::Display;

use bloom_common::Rupees;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemParams {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityParams {
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponParams {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOptionParams {
    pub delivery_option_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodParams {
    pub payment_method: bloom_engine::db_types::PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressIdParams {
    pub address_id: i64,
}

/// Standalone coupon validation request: a code plus the subtotal (in paise) to validate it against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateCouponParams {
    pub code: String,
    pub subtotal: Rupees,
}

/// Delivery receipt from the messaging provider for a previously sent message. Accepted and logged for
/// reconciliation; receipts carry no authority over order state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatusWebhook {
    pub message_id: String,
    pub status: String,
    /// The recipient's phone address. Only ever logged masked.
    pub to: String,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}
