//! Order history and the decision notification feed.

use farmart_client::AppContext;
use farmart_client::notifications::{decision_count, derive_notifications};

use super::{CommandError, require_session};

/// List the caller's orders with payment state.
pub async fn list(ctx: &AppContext) -> Result<(), CommandError> {
    let session = require_session(ctx)?;
    let orders = ctx.api().orders(Some(&session)).await?;
    if orders.is_empty() {
        println!("No orders yet");
        return Ok(());
    }
    for order in &orders {
        let method = order
            .payment_method
            .map_or("-", |m| m.as_str());
        println!(
            "#{:<4} {:10} KSh {:<10} {:?} / {:?} ({})",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.total,
            order.status,
            order.payment_status,
            method
        );
        if let Some(desc) = &order.result_desc {
            println!("      {desc}");
        }
    }
    let decided = decision_count(&orders, session.email());
    if decided > 0 {
        println!("{decided} order decision(s), see `farmart notifications`");
    }
    Ok(())
}

/// Show the buyer's decision notifications.
pub async fn notifications(ctx: &AppContext) -> Result<(), CommandError> {
    let session = require_session(ctx)?;
    let orders = ctx.api().orders(Some(&session)).await?;
    let feed = derive_notifications(&orders, session.email());
    if feed.is_empty() {
        println!("No notifications");
        return Ok(());
    }
    for entry in feed {
        println!("{}", entry.message);
    }
    Ok(())
}
