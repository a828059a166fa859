use std::{fmt::Display, str::FromStr};

use bloom_common::Rupees;
use chrono::{DateTime, NaiveDate, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// The fulfilment state machine. Orders move strictly forward through
/// `Pending → Confirmed → Processing → Shipped → Delivered`; `Cancelled` is terminal and reachable only from the
/// first three states, and only via an explicit cancellation, never by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed, but fulfilment has not begun.
    Pending,
    /// The shop has confirmed the order.
    Confirmed,
    /// The arrangement is being prepared.
    Processing,
    /// The order has been handed to the courier.
    Shipped,
    /// The order has reached the customer. Terminal.
    Delivered,
    /// The order was cancelled by the customer or an operator. Terminal.
    Cancelled,
}

impl OrderStatusType {
    /// The next status in the linear progression, or `None` for terminal states.
    pub fn next(&self) -> Option<OrderStatusType> {
        use OrderStatusType::*;
        match self {
            Pending => Some(Confirmed),
            Confirmed => Some(Processing),
            Processing => Some(Shipped),
            Shipped => Some(Delivered),
            Delivered | Cancelled => None,
        }
    }

    /// Cancellation is only allowed before the order ships.
    pub fn can_cancel(&self) -> bool {
        use OrderStatusType::*;
        matches!(self, Pending | Confirmed | Processing)
    }

    /// The fixed, ordered list of progress steps shown on the tracking page.
    pub fn progression() -> [OrderStatusType; 5] {
        use OrderStatusType::*;
        [Pending, Confirmed, Processing, Shipped, Delivered]
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Confirmed => write!(f, "Confirmed"),
            OrderStatusType::Processing => write!(f, "Processing"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        OrderNo        -------------------------------------------------------
/// The human-readable, unique order number, e.g. `BLM-20260823-4F7A`.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderNo(pub String);

impl FromStr for OrderNo {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNo {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNo {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     PaymentMethod     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    CashOnDelivery,
    Card,
    Upi,
}

impl PaymentMethod {
    /// The per-method surcharge added on top of the discounted subtotal and delivery charge.
    /// Payment methods are recorded, not processed; the surcharge is the only pricing effect they have.
    pub fn surcharge(&self) -> Rupees {
        match self {
            PaymentMethod::CashOnDelivery => Rupees::from_rupees(50),
            PaymentMethod::Card | PaymentMethod::Upi => Rupees::from(0),
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::CashOnDelivery => write!(f, "CashOnDelivery"),
            PaymentMethod::Card => write!(f, "Card"),
            PaymentMethod::Upi => write!(f, "Upi"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CashOnDelivery" => Ok(Self::CashOnDelivery),
            "Card" => Ok(Self::Card),
            "Upi" => Ok(Self::Upi),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

impl From<String> for PaymentMethod {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment method: {value}. But this conversion cannot fail. Defaulting to CashOnDelivery");
            PaymentMethod::CashOnDelivery
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "Unpaid"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Unpaid" => Self::Unpaid,
            "Paid" => Self::Paid,
            "Refunded" => Self::Refunded,
            _ => {
                error!("Invalid payment status: {value}. Defaulting to Unpaid");
                Self::Unpaid
            },
        }
    }
}

//--------------------------------------      DiscountKind     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DiscountKind {
    Fixed,
    Percentage,
}

impl Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountKind::Fixed => write!(f, "Fixed"),
            DiscountKind::Percentage => write!(f, "Percentage"),
        }
    }
}

impl From<String> for DiscountKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Fixed" => Self::Fixed,
            "Percentage" => Self::Percentage,
            _ => {
                error!("Invalid discount kind: {value}. Defaulting to Fixed");
                Self::Fixed
            },
        }
    }
}

//--------------------------------------        Coupon          ------------------------------------------------------
/// The persisted coupon record. Codes are stored normalised to upper-case and matched case-insensitively.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub kind: DiscountKind,
    /// Fixed: the discount amount in paise. Percentage: the percentage (0-100).
    pub value: i64,
    pub max_discount: Option<Rupees>,
    pub min_order_amount: Rupees,
    pub description: Option<String>,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i64>,
    pub times_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The coupon snapshot owned by the active cart. At most one coupon is applied at a time; applying a new one
/// replaces the old.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub max_discount: Option<Rupees>,
    pub description: Option<String>,
    /// The discount realised against the subtotal the coupon was last validated with.
    pub discount: Rupees,
}

impl AppliedCoupon {
    pub fn from_coupon(coupon: &Coupon, discount: Rupees) -> Self {
        Self {
            code: coupon.code.clone(),
            kind: coupon.kind,
            value: coupon.value,
            max_discount: coupon.max_discount,
            description: coupon.description.clone(),
            discount,
        }
    }
}

//--------------------------------------       CartLine         ------------------------------------------------------
/// A single cart line. `quantity >= 1` always holds; setting a quantity to zero removes the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Rupees,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Rupees {
        self.unit_price * i64::from(self.quantity)
    }
}

//--------------------------------------       CartState        ------------------------------------------------------
/// The mutable cart owned by a session. For authenticated users this round-trips through the store on every
/// mutation; for guests it lives in the expiring session cache until checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartState {
    pub lines: Vec<CartLine>,
    pub coupon: Option<AppliedCoupon>,
    pub delivery_option_id: Option<i64>,
    pub address_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
}

impl CartState {
    pub fn subtotal(&self) -> Rupees {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

//--------------------------------------      CartTotals        ------------------------------------------------------
/// Derived totals, recomputed on every cart mutation by [`crate::pricing::recompute_totals`].
/// Invariant: `total = max(0, subtotal - discount) + delivery_charge + payment_surcharge`, and
/// `discount <= subtotal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub item_count: u32,
    pub subtotal: Rupees,
    pub discount: Rupees,
    pub delivery_charge: Rupees,
    pub payment_surcharge: Rupees,
    pub total: Rupees,
}

//--------------------------------------    DeliveryOption      ------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryOption {
    pub id: i64,
    pub name: String,
    /// Human-readable estimate, e.g. "3-5 business days".
    pub estimate: String,
    pub price: Rupees,
    /// The stated delivery window in days; feeds the order's estimated delivery date.
    pub delivery_days: i64,
    pub is_active: bool,
    pub sort_order: i64,
}

//--------------------------------------        Product         ------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub unit_price: Rupees,
    pub stock: i64,
    pub is_active: bool,
}

//--------------------------------------        Address         ------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    /// Owner key: `user:{id}` or `guest:{session}`.
    pub owner: String,
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postcode: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAddress {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postcode: String,
    pub is_default: bool,
}

//--------------------------------------    CustomerContact     ------------------------------------------------------
/// Contact details copied onto the order at placement time. A snapshot, not a live link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

//--------------------------------------         Order          ------------------------------------------------------
/// The durable record of a completed cart. Created once by the placement transaction; mutated only by status
/// transitions; never deleted, only marked cancelled. The pricing snapshot is immutable and independent of later
/// catalog or coupon changes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_no: OrderNo,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    /// JSON snapshot of the order's cart lines.
    pub items_json: String,
    pub subtotal: Rupees,
    pub discount: Rupees,
    pub delivery_charge: Rupees,
    pub payment_surcharge: Rupees,
    pub total: Rupees,
    pub coupon_code: Option<String>,
    pub delivery_option: String,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatusType,
    pub status_updated_at: DateTime<Utc>,
    pub estimated_delivery_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(any(test, feature = "test_utils"))]
impl Default for Order {
    fn default() -> Self {
        Self {
            id: 1,
            order_no: OrderNo("BLM-20260801-TEST01".into()),
            customer_name: "Asha Rao".into(),
            customer_phone: "+919876543210".into(),
            customer_email: "asha@example.com".into(),
            items_json: "[]".into(),
            subtotal: Rupees::default(),
            discount: Rupees::default(),
            delivery_charge: Rupees::default(),
            payment_surcharge: Rupees::default(),
            total: Rupees::default(),
            coupon_code: None,
            delivery_option: "Standard".into(),
            shipping_address: "12 MG Road, Bengaluru 560001".into(),
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Unpaid,
            status: OrderStatusType::Pending,
            status_updated_at: DateTime::<Utc>::MIN_UTC,
            estimated_delivery_date: NaiveDate::MIN,
            created_at: DateTime::<Utc>::MIN_UTC,
            updated_at: DateTime::<Utc>::MIN_UTC,
        }
    }
}

impl Order {
    pub fn items(&self) -> Vec<CartLine> {
        serde_json::from_str(&self.items_json).unwrap_or_else(|e| {
            error!("Order {} carries an unreadable items snapshot: {e}", self.order_no);
            Vec::new()
        })
    }

    pub fn contact(&self) -> CustomerContact {
        CustomerContact {
            name: self.customer_name.clone(),
            phone: self.customer_phone.clone(),
            email: self.customer_email.clone(),
        }
    }
}

//--------------------------------------       NewOrder         ------------------------------------------------------
/// A fully validated, server-side-repriced order, ready to be persisted atomically.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_no: OrderNo,
    pub contact: CustomerContact,
    pub items: Vec<CartLine>,
    pub totals: CartTotals,
    pub coupon_code: Option<String>,
    pub delivery_option: String,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub estimated_delivery_date: NaiveDate,
}

//--------------------------------------      CartOwner         ------------------------------------------------------
/// The coarse identity signal consumed by the pipeline: an authenticated user id, or a guest session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartOwner {
    User(i64),
    Guest(String),
}

impl CartOwner {
    /// Storage key for carts and addresses.
    pub fn key(&self) -> String {
        match self {
            CartOwner::User(id) => format!("user:{id}"),
            CartOwner::Guest(session) => format!("guest:{session}"),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, CartOwner::User(_))
    }
}

impl Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

//--------------------------------------  NotificationResult    ------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationChannel {
    TextMessage,
    ChatMessage,
}

impl Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationChannel::TextMessage => write!(f, "text"),
            NotificationChannel::ChatMessage => write!(f, "chat"),
        }
    }
}

/// The outcome of a single channel send. Ephemeral; logged, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub channel: NotificationChannel,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn sent(channel: NotificationChannel, message_id: String) -> Self {
        Self { channel, success: true, message_id: Some(message_id), error: None }
    }

    pub fn failed(channel: NotificationChannel, error: String) -> Self {
        Self { channel, success: false, message_id: None, error: Some(error) }
    }
}
