//! Message bodies for the notification channels. Pure functions over the order record, so they can be eyeballed
//! in tests without a provider in the loop.
use crate::db_types::{Order, OrderStatusType};

pub fn order_confirmation_text(order: &Order) -> String {
    format!(
        "Bloom & Bud: your order {} for {} is confirmed! Estimated delivery {}. Track it any time with your order \
         number.",
        order.order_no,
        order.total,
        order.estimated_delivery_date.format("%d %b %Y")
    )
}

pub fn order_confirmation_chat(order: &Order) -> String {
    let items = order
        .items()
        .iter()
        .map(|l| format!("• {} × {}", l.name, l.quantity))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "🌸 Thank you for your order, {}!\n\nOrder {}\n{items}\n\nTotal: {}\nEstimated delivery: {}",
        order.customer_name,
        order.order_no,
        order.total,
        order.estimated_delivery_date.format("%d %b %Y")
    )
}

pub fn status_update_text(order: &Order) -> String {
    let line = match order.status {
        OrderStatusType::Pending => "has been received and is awaiting confirmation",
        OrderStatusType::Confirmed => "has been confirmed by the shop",
        OrderStatusType::Processing => "is being arranged by our florists",
        OrderStatusType::Shipped => "is out for delivery",
        OrderStatusType::Delivered => "has been delivered. Enjoy!",
        OrderStatusType::Cancelled => "has been cancelled",
    };
    format!("Bloom & Bud: your order {} {line}.", order.order_no)
}

pub fn status_update_chat(order: &Order) -> String {
    let emoji = match order.status {
        OrderStatusType::Pending => "🕰️",
        OrderStatusType::Confirmed => "✅",
        OrderStatusType::Processing => "💐",
        OrderStatusType::Shipped => "🚚",
        OrderStatusType::Delivered => "🏡",
        OrderStatusType::Cancelled => "❌",
    };
    format!("{emoji} {}", status_update_text(order))
}
