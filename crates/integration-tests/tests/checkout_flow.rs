//! The cart-to-order pipeline: auth, validation, card checkout, and the
//! order list afterwards.

#![allow(clippy::unwrap_used)]

use farmart_client::AppContext;
use farmart_client::api::{ApiError, CreateOrderRequest};
use farmart_client::checkout::{CheckoutSession, DeliveryAddress, Stage};
use farmart_client::notifications::derive_notifications;
use farmart_client::payment::{CardDetails, PaymentError, single_farmer_email};
use farmart_client::pricing;
use farmart_client::session::Session;
use farmart_client::store::CartItem;
use farmart_core::{Email, ListingId, OrderStatus, PaymentMethod, PaymentStatus};
use farmart_integration_tests::{MockMarket, fast_polling};
use serde_json::json;

fn cart_item() -> CartItem {
    let mut item = CartItem::new(
        ListingId::new(1),
        "Boran heifer".to_owned(),
        "KSh 45,000".to_owned().into(),
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

fn card() -> CardDetails {
    CardDetails {
        number: "4242424242424242".to_owned(),
        expiry: "12/27".to_owned(),
        cvv: "123".to_owned(),
    }
}

fn context(market: &MockMarket, dir: &std::path::Path) -> AppContext {
    AppContext::new(market.config(dir, fast_polling(24)))
}

async fn login(ctx: &AppContext) -> Session {
    let auth = ctx.api().login("wanjiku@example.com", "secret").await.unwrap();
    let session = Session::from(auth);
    ctx.sessions().save(&session).unwrap();
    session
}

#[tokio::test]
async fn test_card_checkout_end_to_end() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&market, dir.path());
    let session = login(&ctx).await;

    // Cart and shipping stages.
    ctx.cart().add_item(cart_item()).unwrap();
    let mut checkout = CheckoutSession::new(ctx.store().clone());
    checkout.to_shipping().unwrap();
    checkout.submit_address(&address()).unwrap();
    assert_eq!(checkout.stage(), Stage::Payment);

    // Payment settles in one round trip.
    let items = ctx.cart().items();
    let totals = pricing::compute_totals(&items);
    let receipt = ctx
        .payments()
        .pay_card(
            Some(&session),
            &items,
            &totals,
            checkout.saved_address().as_ref(),
            &card(),
        )
        .await
        .unwrap();
    assert_eq!(receipt.message, "Card payment successful");
    assert_eq!(receipt.receipt.as_deref(), Some("CARD-0001"));

    // Placing clears the cart and flags the confirmation.
    checkout.place(ctx.cart()).unwrap();
    assert!(ctx.cart().items().is_empty());
    assert!(checkout.payment_confirmed());

    // The order shows up in history with payment settled.
    let orders = ctx.api().orders(Some(&session)).await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = orders.first().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Success);
    assert_eq!(order.payment_method, Some(PaymentMethod::Card));
}

#[tokio::test]
async fn test_order_created_from_cart_without_payment() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&market, dir.path());
    let session = login(&ctx).await;

    ctx.cart().add_item(cart_item()).unwrap();
    let items = ctx.cart().items();
    let totals = pricing::compute_totals(&items);
    let order = ctx
        .api()
        .create_order(
            Some(&session),
            &CreateOrderRequest {
                items: items.clone(),
                total: totals.total,
                farmer_email: single_farmer_email(&items),
                delivery_address: Some(address()),
            },
        )
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::NotInitiated);
    assert_eq!(order.payment_method, None);
    assert_eq!(order.items.first().unwrap().title, "Boran heifer");

    // The order is in history, ready for payment later.
    let orders = ctx.api().orders(Some(&session)).await.unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
async fn test_missing_card_fields_reported_in_one_message() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&market, dir.path());
    ctx.cart().add_item(cart_item()).unwrap();

    let items = ctx.cart().items();
    let totals = pricing::compute_totals(&items);
    let empty = CardDetails {
        number: String::new(),
        expiry: String::new(),
        cvv: String::new(),
    };
    let err = ctx
        .payments()
        .pay_card(None, &items, &totals, None, &empty)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Please enter: card number, MM/YY, CVV, delivery address, delivery city, delivery county, delivery phone"
    );
}

#[tokio::test]
async fn test_invalid_phone_rejected_before_push() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&market, dir.path());
    ctx.cart().add_item(cart_item()).unwrap();

    let items = ctx.cart().items();
    let totals = pricing::compute_totals(&items);
    let err = ctx
        .payments()
        .pay_mpesa(None, &items, &totals, Some(&address()), "12345")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidPhone));
    assert_eq!(err.to_string(), "Invalid M-Pesa phone number format");
}

#[tokio::test]
async fn test_card_decline_surfaces_server_message() {
    let market = MockMarket::spawn().await;
    market.fail_card(400, json!({"error": "Card declined"}));
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&market, dir.path());
    ctx.cart().add_item(cart_item()).unwrap();

    let items = ctx.cart().items();
    let totals = pricing::compute_totals(&items);
    let err = ctx
        .payments()
        .pay_card(None, &items, &totals, Some(&address()), &card())
        .await
        .unwrap_err();
    match err {
        PaymentError::Api(ApiError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Card declined");
        }
        other => panic!("unexpected error: {other}"),
    }
    // The decline never touches the cart.
    assert_eq!(ctx.cart().items().len(), 1);
}

#[tokio::test]
async fn test_farmer_decision_feeds_notifications() {
    let market = MockMarket::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&market, dir.path());
    let session = login(&ctx).await;

    ctx.cart().add_item(cart_item()).unwrap();
    let items = ctx.cart().items();
    let totals = pricing::compute_totals(&items);
    ctx.payments()
        .pay_card(Some(&session), &items, &totals, Some(&address()), &card())
        .await
        .unwrap();

    let orders = ctx.api().orders(Some(&session)).await.unwrap();
    let order_id = orders.first().unwrap().id;
    assert!(derive_notifications(&orders, session.email()).is_empty());

    let decided = ctx
        .api()
        .update_order_status(&session, order_id, OrderStatus::Accepted)
        .await
        .unwrap();
    assert_eq!(decided.status, OrderStatus::Accepted);

    let orders = ctx.api().orders(Some(&session)).await.unwrap();
    let feed = derive_notifications(&orders, session.email());
    assert_eq!(feed.len(), 1);
    assert_eq!(
        feed.first().unwrap().message,
        format!("Order {order_id} was accepted. Your order will be processed for delivery.")
    );
}
