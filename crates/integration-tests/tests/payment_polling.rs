//! End-to-end tests for the M-Pesa confirmation poll: terminal states,
//! the attempt budget, cancellation, and superseded attempts.

#![allow(clippy::unwrap_used)]

use farmart_client::AppContext;
use farmart_client::checkout::{CheckoutSession, DeliveryAddress};
use farmart_client::payment::{
    MpesaFlow, PaymentOutcome, TIMED_OUT_MESSAGE, UNCONFIRMED_MESSAGE,
};
use farmart_client::pricing;
use farmart_client::store::CartItem;
use farmart_core::{Email, ListingId};
use farmart_integration_tests::{MockMarket, PollStep, fast_polling};

fn cart_item() -> CartItem {
    let mut item = CartItem::new(
        ListingId::new(1),
        "Boran heifer".to_owned(),
        "KSh 45,000".into(),
    );
    item.owner_email = Email::parse("kamau@example.com").ok();
    item
}

fn address() -> DeliveryAddress {
    DeliveryAddress {
        line1: "12 Ngong Rd".to_owned(),
        line2: None,
        city: "Nairobi".to_owned(),
        county: "Nairobi".to_owned(),
        postal_code: None,
        phone: "0712345678".to_owned(),
    }
}

/// Set up a context with one item in the cart and a saved address.
fn seeded_context(market: &MockMarket, dir: &std::path::Path, max_attempts: u32) -> AppContext {
    let ctx = AppContext::new(market.config(dir, fast_polling(max_attempts)));
    ctx.cart().add_item(cart_item()).unwrap();
    let mut checkout = CheckoutSession::new(ctx.store().clone());
    checkout.to_shipping().unwrap();
    checkout.submit_address(&address()).unwrap();
    ctx
}

async fn start_mpesa(ctx: &AppContext) -> MpesaFlow {
    let items = ctx.cart().items();
    let totals = pricing::compute_totals(&items);
    ctx.payments()
        .pay_mpesa(None, &items, &totals, Some(&address()), "0712345678")
        .await
        .unwrap()
}

fn awaiting(flow: MpesaFlow) -> farmart_client::payment::PollHandle {
    match flow {
        MpesaFlow::AwaitingConfirmation { poll, .. } => poll,
        MpesaFlow::AlreadyConfirmed { .. } => panic!("expected a pending confirmation"),
    }
}

// =============================================================================
// Terminal states
// =============================================================================

#[tokio::test]
async fn test_poll_reaches_success_and_order_places() {
    let market = MockMarket::spawn().await;
    market.script_polls(vec![
        PollStep::Pending,
        PollStep::Pending,
        PollStep::Success {
            receipt: Some("QRX9"),
        },
    ]);
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 24);

    let poll = awaiting(start_mpesa(&ctx).await);
    let outcome = poll.outcome().await;
    assert_eq!(
        outcome,
        PaymentOutcome::Confirmed {
            receipt: Some("QRX9".to_owned())
        }
    );
    assert_eq!(market.poll_count(), 3);

    // Success hands off to checkout: placing clears the cart.
    let mut checkout = CheckoutSession::new(ctx.store().clone());
    checkout.to_shipping().unwrap();
    checkout.submit_address(&address()).unwrap();
    let delay = checkout.place(ctx.cart()).unwrap();
    assert_eq!(delay, farmart_client::checkout::PLACED_REDIRECT_DELAY);
    assert!(ctx.cart().items().is_empty());
}

#[tokio::test]
async fn test_failed_status_ends_poll_with_reason() {
    let market = MockMarket::spawn().await;
    market.script_polls(vec![
        PollStep::Pending,
        PollStep::Failed {
            desc: "Insufficient funds",
        },
    ]);
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 24);

    let poll = awaiting(start_mpesa(&ctx).await);
    let outcome = poll.outcome().await;
    assert_eq!(
        outcome,
        PaymentOutcome::Failed {
            reason: "Insufficient funds".to_owned()
        }
    );
    // Terminal on the failing poll, not after the full budget.
    assert_eq!(market.poll_count(), 2);
}

#[tokio::test]
async fn test_inline_success_skips_polling() {
    let market = MockMarket::spawn().await;
    market.set_inline_success(true);
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 24);

    match start_mpesa(&ctx).await {
        MpesaFlow::AlreadyConfirmed { receipt, .. } => {
            assert_eq!(receipt.as_deref(), Some("QATX12345"));
        }
        MpesaFlow::AwaitingConfirmation { .. } => panic!("expected inline confirmation"),
    }
    assert_eq!(market.poll_count(), 0);
}

// =============================================================================
// Budget exhaustion
// =============================================================================

#[tokio::test]
async fn test_times_out_with_cart_intact() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 4);

    let poll = awaiting(start_mpesa(&ctx).await);
    let outcome = poll.outcome().await;
    assert_eq!(
        outcome,
        PaymentOutcome::TimedOut {
            message: TIMED_OUT_MESSAGE.to_owned()
        }
    );
    assert_eq!(market.poll_count(), 4);
    // Timing out is not success; nothing may touch the cart.
    assert_eq!(ctx.cart().items().len(), 1);
}

#[tokio::test]
async fn test_server_errors_are_retried_within_budget() {
    let market = MockMarket::spawn().await;
    market.script_polls(vec![
        PollStep::ServerError,
        PollStep::ServerError,
        PollStep::Success { receipt: None },
    ]);
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 24);

    let poll = awaiting(start_mpesa(&ctx).await);
    assert_eq!(
        poll.outcome().await,
        PaymentOutcome::Confirmed { receipt: None }
    );
    assert_eq!(market.poll_count(), 3);
}

#[tokio::test]
async fn test_unreachable_api_reports_unconfirmed() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 3);

    let poll = awaiting(start_mpesa(&ctx).await);
    // Every poll from here on fails at the transport level.
    market.shutdown();
    let outcome = poll.outcome().await;
    assert_eq!(
        outcome,
        PaymentOutcome::TimedOut {
            message: UNCONFIRMED_MESSAGE.to_owned()
        }
    );
}

// =============================================================================
// Cancellation and supersession
// =============================================================================

#[tokio::test]
async fn test_cancel_resolves_cancelled_without_mutation() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 100);

    let poll = awaiting(start_mpesa(&ctx).await);
    poll.cancel();
    assert!(poll.is_cancelled());
    assert_eq!(poll.outcome().await, PaymentOutcome::Cancelled);
    assert_eq!(ctx.cart().items().len(), 1);
}

#[tokio::test]
async fn test_cancel_during_inflight_request_discards_confirmation() {
    let market = MockMarket::spawn().await;
    market.script_polls(vec![PollStep::Success {
        receipt: Some("QRX1"),
    }]);
    // Hold the status response long enough for the cancel to land while
    // the request is in flight.
    market.set_poll_delay(std::time::Duration::from_millis(300));
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 100);

    let poll = awaiting(start_mpesa(&ctx).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    poll.cancel();

    // The SUCCESS the gateway eventually returns must not win.
    assert_eq!(poll.outcome().await, PaymentOutcome::Cancelled);
    assert_eq!(ctx.cart().items().len(), 1);
}

#[tokio::test]
async fn test_newer_attempt_supersedes_older_poll() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 2);

    let first = awaiting(start_mpesa(&ctx).await);
    let second = awaiting(start_mpesa(&ctx).await);

    // The older poll may finish however it likes; it must still resolve
    // as cancelled once a newer attempt exists.
    assert_eq!(first.outcome().await, PaymentOutcome::Cancelled);

    // The newer attempt is live and settles on its own merits.
    assert!(matches!(
        second.outcome().await,
        PaymentOutcome::TimedOut { .. }
    ));
}

#[tokio::test]
async fn test_retry_restarts_the_budget() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = seeded_context(&market, dir.path(), 2);

    let flow = start_mpesa(&ctx).await;
    let order_id = match &flow {
        MpesaFlow::AwaitingConfirmation { order, .. } => order.id,
        MpesaFlow::AlreadyConfirmed { .. } => panic!("expected a pending confirmation"),
    };
    let poll = awaiting(flow);
    assert!(matches!(
        poll.outcome().await,
        PaymentOutcome::TimedOut { .. }
    ));

    // A retry gets a full fresh window.
    market.script_polls(vec![PollStep::Pending, PollStep::Success { receipt: None }]);
    let retry = ctx
        .payments()
        .retry_mpesa(None, order_id, Some("0712345678"))
        .await
        .unwrap();
    let poll = awaiting(retry);
    assert_eq!(
        poll.outcome().await,
        PaymentOutcome::Confirmed { receipt: None }
    );
}
