use chrono::Duration;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderNo, OrderStatusType},
    traits::ShopDatabaseError,
};

/// Inserts a new order into the database using the given connection. This is not atomic on its own. Embed this call
/// inside a transaction alongside the coupon usage increment and the cart clear, passing `&mut *tx` as the
/// connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, ShopDatabaseError> {
    let items_json = serde_json::to_string(&order.items)
        .map_err(|e| ShopDatabaseError::DatabaseError(format!("Could not serialize order items: {e}")))?;
    let result: Result<Order, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_no,
                customer_name,
                customer_phone,
                customer_email,
                items_json,
                subtotal,
                discount,
                delivery_charge,
                payment_surcharge,
                total,
                coupon_code,
                delivery_option,
                shipping_address,
                payment_method,
                estimated_delivery_date
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *;
        "#,
    )
    .bind(order.order_no.as_str())
    .bind(order.contact.name)
    .bind(order.contact.phone)
    .bind(order.contact.email)
    .bind(items_json)
    .bind(order.totals.subtotal)
    .bind(order.totals.discount)
    .bind(order.totals.delivery_charge)
    .bind(order.totals.payment_surcharge)
    .bind(order.totals.total)
    .bind(order.coupon_code)
    .bind(order.delivery_option)
    .bind(order.shipping_address)
    .bind(order.payment_method.to_string())
    .bind(order.estimated_delivery_date)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => {
            debug!("📝️ Order {} inserted with id {}", order.order_no, order.id);
            Ok(order)
        },
        Err(sqlx::Error::Database(de)) if matches!(de.kind(), sqlx::error::ErrorKind::UniqueViolation) => {
            Err(ShopDatabaseError::OrderNoConflict(order.order_no))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_number(
    order_no: &OrderNo,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_no = $1")
        .bind(order_no.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Orders sitting in `status` for longer than `min_age`, oldest first. This is the scheduler's range query;
/// the age comparison uses unix epochs so it is independent of the timestamp text format.
pub async fn fetch_stale_orders(
    status: OrderStatusType,
    min_age: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE status = $1
          AND (unixepoch(CURRENT_TIMESTAMP) - unixepoch(status_updated_at)) >= $2
        ORDER BY status_updated_at ASC
        "#,
    )
    .bind(status.to_string())
    .bind(min_age.num_seconds())
    .fetch_all(conn)
    .await?;
    trace!("📝️ {} orders in status {status} older than {}s", orders.len(), min_age.num_seconds());
    Ok(orders)
}

/// Advances an order from `from` to `to`. The `WHERE status = from` guard makes a lost race a
/// [`ShopDatabaseError::StaleStatusTransition`] instead of a skipped state.
pub async fn advance_status(
    order_id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, ShopDatabaseError> {
    let result: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = $1, status_updated_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = $3
        RETURNING *
        "#,
    )
    .bind(to.to_string())
    .bind(order_id)
    .bind(from.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    match result {
        Some(order) => Ok(order),
        None => {
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
            match exists {
                Some(_) => Err(ShopDatabaseError::StaleStatusTransition(format!(
                    "Order id {order_id} is no longer in status {from}"
                ))),
                None => Err(ShopDatabaseError::OrderIdNotFound(order_id)),
            }
        },
    }
}

/// Cancels an order. The status guard lives in the statement itself so that a delivered or shipped order can never
/// slip through to `Cancelled`.
pub async fn cancel_order(order_no: &OrderNo, conn: &mut SqliteConnection) -> Result<Order, ShopDatabaseError> {
    let result: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = 'Cancelled', status_updated_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE order_no = $1 AND status IN ('Pending', 'Confirmed', 'Processing')
        RETURNING *
        "#,
    )
    .bind(order_no.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match result {
        Some(order) => Ok(order),
        None => match fetch_order_by_number(order_no, conn).await? {
            Some(order) => Err(ShopDatabaseError::TransitionForbidden(format!(
                "Order {order_no} is {} and can no longer be cancelled",
                order.status
            ))),
            None => Err(ShopDatabaseError::OrderNotFound(order_no.clone())),
        },
    }
}
