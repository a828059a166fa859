use chrono::Duration;
use thiserror::Error;

use crate::db_types::{
    Address,
    CartState,
    Coupon,
    DeliveryOption,
    NewAddress,
    NewOrder,
    Order,
    OrderNo,
    OrderStatusType,
    Product,
};

/// The single persistence capability consumed by the order pipeline.
///
/// There is exactly one conforming implementation ([`crate::SqliteDatabase`]); the trait exists so that tests can
/// supply a double. The behaviour it covers:
/// * Catalog reads (products, delivery options) used for server-side re-pricing.
/// * Coupon lookup by normalised code.
/// * Cart persistence for authenticated owners.
/// * Address book writes and reads.
/// * The atomic order placement write, and the status/range queries the scheduler needs.
#[allow(async_fn_in_trait)]
pub trait ShopDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, ShopDatabaseError>;

    async fn fetch_delivery_option(&self, option_id: i64) -> Result<Option<DeliveryOption>, ShopDatabaseError>;

    /// Active delivery options in display order.
    async fn fetch_delivery_options(&self) -> Result<Vec<DeliveryOption>, ShopDatabaseError>;

    /// Fetches a coupon by its upper-case normalised code.
    async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, ShopDatabaseError>;

    /// Loads the stored cart for the given owner key, or `None` if the owner has no cart yet.
    async fn load_cart(&self, owner_key: &str) -> Result<Option<CartState>, ShopDatabaseError>;

    /// Persists the cart for the given owner key, replacing any previous state.
    async fn save_cart(&self, owner_key: &str, cart: &CartState) -> Result<(), ShopDatabaseError>;

    /// Stores a new address for the owner. If `is_default` is set, any previous default for the owner is cleared
    /// in the same transaction.
    async fn insert_address(&self, owner_key: &str, address: NewAddress) -> Result<Address, ShopDatabaseError>;

    /// Fetches an address, scoped to its owner so one session can never read another's address book.
    async fn fetch_address(&self, address_id: i64, owner_key: &str) -> Result<Option<Address>, ShopDatabaseError>;

    async fn fetch_addresses(&self, owner_key: &str) -> Result<Vec<Address>, ShopDatabaseError>;

    /// Persists a placed order in a single atomic transaction:
    /// * the order row is inserted,
    /// * the coupon usage counter is incremented (when a coupon was applied),
    /// * the owner's stored cart is cleared.
    ///
    /// Partial application must never be observable: an order with no matching cart clear, or a usage increment
    /// without an order, cannot occur.
    async fn place_order(
        &self,
        order: NewOrder,
        owner_key: &str,
        coupon_id: Option<i64>,
    ) -> Result<Order, ShopDatabaseError>;

    async fn fetch_order_by_number(&self, order_no: &OrderNo) -> Result<Option<Order>, ShopDatabaseError>;

    /// Orders that have been sitting in `status` for at least `min_age`. Range query used by the status
    /// progression scheduler.
    async fn fetch_orders_in_status_older_than(
        &self,
        status: OrderStatusType,
        min_age: Duration,
    ) -> Result<Vec<Order>, ShopDatabaseError>;

    /// Advances a single order from `from` to `to`, updating `status_updated_at`. The update is guarded on the
    /// current status so a concurrent transition makes this a no-op error rather than a skipped state.
    async fn advance_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Order, ShopDatabaseError>;

    /// Marks an order cancelled. Only orders in `Pending`, `Confirmed` or `Processing` may be cancelled; the guard
    /// is enforced in the same statement as the update.
    async fn cancel_order(&self, order_no: &OrderNo) -> Result<Order, ShopDatabaseError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ShopDatabaseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ShopDatabaseError {
    #[error("We have an internal database engine issue (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, an order already exists with number {0}")]
    OrderNoConflict(OrderNo),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNo),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("The order is no longer in the expected status. {0}")]
    StaleStatusTransition(String),
    #[error("The requested order change is forbidden. {0}")]
    TransitionForbidden(String),
}

impl From<sqlx::Error> for ShopDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        ShopDatabaseError::DatabaseError(e.to_string())
    }
}
