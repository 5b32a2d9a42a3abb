//! Order decision notifications.
//!
//! The feed is derived on demand from the buyer's orders rather than
//! stored: every order a farmer has accepted or rejected yields exactly
//! one notification with a fixed message.

use chrono::{DateTime, Utc};
use farmart_core::{OrderId, OrderStatus};

use crate::api::OrderOut;

/// A single entry in the notification feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub message: String,
    pub decided_order_created_at: DateTime<Utc>,
}

fn decision_message(order_id: OrderId, status: OrderStatus) -> Option<String> {
    match status {
        OrderStatus::Accepted => Some(format!(
            "Order {order_id} was accepted. Your order will be processed for delivery."
        )),
        OrderStatus::Rejected => Some(format!(
            "Order {order_id} was rejected. This order will not be delivered."
        )),
        OrderStatus::Pending => None,
    }
}

/// Derive the notification feed for a buyer from their orders.
///
/// Only orders addressed to `buyer_email` (compared case-insensitively)
/// that have been decided contribute; pending orders are silent. One
/// notification per decided order.
#[must_use]
pub fn derive_notifications(orders: &[OrderOut], buyer_email: &str) -> Vec<Notification> {
    orders
        .iter()
        .filter(|order| order.buyer_email.eq_ignore_ascii_case(buyer_email))
        .filter_map(|order| {
            decision_message(order.id, order.status).map(|message| Notification {
                order_id: order.id,
                status: order.status,
                message,
                decided_order_created_at: order.created_at,
            })
        })
        .collect()
}

/// Number of decided orders for the badge count.
#[must_use]
pub fn decision_count(orders: &[OrderOut], buyer_email: &str) -> usize {
    derive_notifications(orders, buyer_email).len()
}
