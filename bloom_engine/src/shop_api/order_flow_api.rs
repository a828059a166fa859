//! Atomic order placement, cancellation and tracking.
//!
//! Placement is the pipeline's critical section. The payload is validated field by field, every amount is
//! recomputed from persisted prices, the coupon is re-validated, and only then does the whole thing commit in a
//! single storage transaction. Side effects (notifications) hang off events published after the commit; a
//! notification failure can never roll an order back.
use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{CartLine, CartOwner, CartState, NewOrder, Order, OrderNo, OrderStatusType},
    events::{EventProducers, OrderCreatedEvent, OrderStatusChangedEvent},
    helpers::{new_order_number, normalize_phone},
    kv::ExpiringCache,
    pricing,
    shop_api::{
        coupon_api::CouponApi,
        errors::{FieldError, OrderFlowError},
        order_objects::{CheckoutPayload, OrderTracking},
    },
    traits::{ShopDatabase, ShopDatabaseError},
};

/// How long a placement commit may take before the client is told to retry.
const PLACEMENT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
/// Order number collisions are vanishingly rare; one regeneration is plenty.
const ORDER_NO_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct OrderFlowApi<B> {
    db: B,
    coupons: CouponApi<B>,
    producers: EventProducers,
    guest_carts: Option<ExpiringCache<String, CartState>>,
}

impl<B> OrderFlowApi<B>
where B: ShopDatabase
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        let coupons = CouponApi::new(db.clone());
        Self { db, coupons, producers, guest_carts: None }
    }

    /// Shares the guest-cart store with this API so guest checkouts clear the session's cart. Without it only
    /// stored (authenticated) carts are cleared.
    pub fn with_guest_carts(mut self, carts: ExpiringCache<String, CartState>) -> Self {
        self.guest_carts = Some(carts);
        self
    }

    /// Places an order for `owner` from `payload`.
    ///
    /// Everything the client sent is re-derived server-side: prices come from the catalog, the discount from a
    /// fresh coupon validation, the delivery charge from the selected option. A payload that fails any business
    /// rule aborts with no side effects whatsoever.
    pub async fn place_order(&self, owner: &CartOwner, payload: &CheckoutPayload) -> Result<Order, OrderFlowError> {
        let phone = validate_payload(payload)?;
        let mut rejections = Vec::new();

        let lines = self.reprice_items(payload, &mut rejections).await?;

        let delivery_option = match self.db.fetch_delivery_option(payload.delivery_option_id).await? {
            Some(option) if option.is_active => Some(option),
            _ => {
                rejections.push(format!("Delivery option {} is not available", payload.delivery_option_id));
                None
            },
        };

        let coupon = match &payload.coupon_code {
            Some(code) => {
                let subtotal = lines.iter().map(CartLine::line_total).sum();
                match self.coupons.check_code(code, subtotal).await.map_err(OrderFlowError::from)? {
                    Ok(found) => Some(found),
                    Err(rejection) => {
                        rejections.push(rejection.to_string());
                        None
                    },
                }
            },
            None => None,
        };

        if !rejections.is_empty() {
            debug!("💐️ Order rejected for {owner}: {}", rejections.join("; "));
            return Err(OrderFlowError::BusinessRules(rejections));
        }
        // Guarded by the rejection check above.
        let delivery_option =
            delivery_option.ok_or_else(|| OrderFlowError::Internal("delivery option resolution".into()))?;

        let applied = coupon.as_ref().map(|(c, discount)| crate::db_types::AppliedCoupon::from_coupon(c, *discount));
        let totals = pricing::recompute_totals(
            &lines,
            applied.as_ref(),
            delivery_option.price,
            payload.payment_method.surcharge(),
        );
        if matches!(payload.client_total, Some(client) if client != totals.total) {
            // Advisory only. The server figure is authoritative.
            warn!(
                "💐️ Client-side total {} disagrees with the server total {} for {owner}",
                payload.client_total.unwrap_or_default(),
                totals.total
            );
        }

        let mut contact = payload.contact();
        contact.phone = phone;
        let estimated_delivery_date = (Utc::now() + Duration::days(delivery_option.delivery_days)).date_naive();
        let coupon_id = coupon.as_ref().map(|(c, _)| c.id);
        let coupon_code = coupon.as_ref().map(|(c, _)| c.code.clone());

        let mut last_err = None;
        for _ in 0..ORDER_NO_ATTEMPTS {
            let order = NewOrder {
                order_no: new_order_number(),
                contact: contact.clone(),
                items: lines.clone(),
                totals,
                coupon_code: coupon_code.clone(),
                delivery_option: delivery_option.name.clone(),
                shipping_address: payload.shipping_address.clone(),
                payment_method: payload.payment_method,
                estimated_delivery_date,
            };
            match tokio::time::timeout(PLACEMENT_TIMEOUT, self.db.place_order(order, &owner.key(), coupon_id)).await {
                Err(_) => {
                    return Err(OrderFlowError::Persistence("The order store did not respond in time".into()));
                },
                Ok(Err(ShopDatabaseError::OrderNoConflict(no))) => {
                    warn!("💐️ Order number {no} collided. Regenerating.");
                    last_err = Some(ShopDatabaseError::OrderNoConflict(no));
                },
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(order)) => {
                    info!("💐️ Order {} placed for {owner}. Total {}", order.order_no, order.total);
                    self.clear_guest_cart(owner).await;
                    self.publish_order_created(order.clone()).await;
                    return Ok(order);
                },
            }
        }
        Err(last_err.map(OrderFlowError::from).unwrap_or_else(|| OrderFlowError::Internal("unreachable".into())))
    }

    /// Cancels an order by number. Only orders that have not shipped can be cancelled.
    pub async fn cancel_order(&self, order_no: &OrderNo) -> Result<Order, OrderFlowError> {
        let old_status = self
            .db
            .fetch_order_by_number(order_no)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_no.clone()))?
            .status;
        let order = self.db.cancel_order(order_no).await?;
        info!("💐️ Order {order_no} cancelled (was {old_status})");
        self.publish_status_changed(order.clone(), old_status).await;
        Ok(order)
    }

    /// The tracking view for an order.
    pub async fn track_order(&self, order_no: &OrderNo) -> Result<OrderTracking, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_no)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_no.clone()))?;
        Ok(OrderTracking::from_order(&order))
    }

    /// Advances `order` one step along the progression, guarded against concurrent transitions. Used by the
    /// status scheduler; publishes the change on success.
    pub async fn advance_order(&self, order: &Order) -> Result<Option<Order>, OrderFlowError> {
        let Some(next) = order.status.next() else {
            return Ok(None);
        };
        match self.db.advance_order_status(order.id, order.status, next).await {
            Ok(updated) => {
                self.publish_status_changed(updated.clone(), order.status).await;
                Ok(Some(updated))
            },
            Err(ShopDatabaseError::StaleStatusTransition(msg)) => {
                debug!("💐️ Skipping stale transition for {}: {msg}", order.order_no);
                Ok(None)
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn reprice_items(
        &self,
        payload: &CheckoutPayload,
        rejections: &mut Vec<String>,
    ) -> Result<Vec<CartLine>, OrderFlowError> {
        let mut lines = Vec::with_capacity(payload.items.len());
        for item in &payload.items {
            match self.db.fetch_product(item.product_id).await? {
                Some(p) if p.is_active && p.stock >= i64::from(item.quantity) => {
                    lines.push(CartLine {
                        product_id: p.id,
                        name: p.name,
                        unit_price: p.unit_price,
                        quantity: item.quantity,
                    });
                },
                Some(p) if p.is_active => {
                    rejections.push(format!("Not enough stock for {}: {} requested, {} left", p.name, item.quantity, p.stock));
                },
                _ => rejections.push(format!("Product {} is not available", item.product_id)),
            }
        }
        Ok(lines)
    }

    /// The placement transaction clears stored carts; guest carts live in process, so they are evicted here,
    /// immediately after the commit.
    async fn clear_guest_cart(&self, owner: &CartOwner) {
        if let (CartOwner::Guest(_), Some(carts)) = (owner, &self.guest_carts) {
            carts.remove(&owner.key()).await;
        }
    }

    async fn publish_order_created(&self, order: Order) {
        for producer in &self.producers.order_created_producer {
            producer.publish_event(OrderCreatedEvent::new(order.clone())).await;
        }
    }

    async fn publish_status_changed(&self, order: Order, old_status: OrderStatusType) {
        for producer in &self.producers.status_changed_producer {
            producer.publish_event(OrderStatusChangedEvent::new(order.clone(), old_status)).await;
        }
    }
}

/// Field-level schema validation. Returns the normalised phone number on success, since every later consumer
/// (the order record, the text-message channel) wants the canonical form.
fn validate_payload(payload: &CheckoutPayload) -> Result<String, OrderFlowError> {
    let mut errors = Vec::new();
    if payload.customer_name.trim().is_empty() {
        errors.push(FieldError::new("customer_name", "Name is required"));
    }
    let phone = match normalize_phone(&payload.customer_phone) {
        Ok(p) => p,
        Err(e) => {
            errors.push(FieldError::new("customer_phone", e.to_string()));
            String::new()
        },
    };
    if matches!(&payload.customer_email, Some(email) if !email.contains('@')) {
        errors.push(FieldError::new("customer_email", "Email address is malformed"));
    }
    if payload.items.is_empty() {
        errors.push(FieldError::new("items", "The order has no items"));
    }
    if payload.items.iter().any(|i| i.quantity == 0) {
        errors.push(FieldError::new("items", "Item quantities must be at least 1"));
    }
    if payload.shipping_address.trim().is_empty() {
        errors.push(FieldError::new("shipping_address", "A shipping address is required"));
    }
    if errors.is_empty() {
        Ok(phone)
    } else {
        Err(OrderFlowError::Validation(errors))
    }
}
