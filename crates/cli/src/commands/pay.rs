//! Payment commands: M-Pesa, card, and retry.

use farmart_client::AppContext;
use farmart_client::checkout::CheckoutSession;
use farmart_client::payment::{CardDetails, MpesaFlow, PaymentOutcome};
use farmart_client::pricing;
use farmart_core::OrderId;

use super::CommandError;

/// Pay for the cart with M-Pesa: send the STK push, then wait for the
/// confirmation poll to settle.
pub async fn mpesa(ctx: &AppContext, phone: &str) -> Result<(), CommandError> {
    let session = ctx.sessions().current();
    let items = ctx.cart().items();
    let totals = pricing::compute_totals(&items);
    let mut checkout = payment_stage(ctx)?;
    let address = checkout.saved_address();

    let flow = ctx
        .payments()
        .pay_mpesa(session.as_ref(), &items, &totals, address.as_ref(), phone)
        .await?;
    settle_mpesa(ctx, Some(&mut checkout), flow).await
}

/// Re-send the M-Pesa prompt for an existing order and wait again. The
/// confirmation window restarts from zero. Runs against the order list,
/// not the cart, so nothing local is touched.
pub async fn retry(ctx: &AppContext, order_id: i64, phone: Option<&str>) -> Result<(), CommandError> {
    let session = ctx.sessions().current();
    let flow = ctx
        .payments()
        .retry_mpesa(session.as_ref(), OrderId::new(order_id), phone)
        .await?;
    settle_mpesa(ctx, None, flow).await
}

/// Walk a fresh session up to the payment stage, reusing the saved
/// address when it is complete. An incomplete address leaves the session
/// in shipping so payment validation can name the missing fields.
fn payment_stage(ctx: &AppContext) -> Result<CheckoutSession, CommandError> {
    let mut checkout = CheckoutSession::new(ctx.store().clone());
    checkout.to_shipping()?;
    if let Some(address) = checkout.saved_address().filter(|a| a.is_complete()) {
        checkout.submit_address(&address)?;
    }
    Ok(checkout)
}

async fn settle_mpesa(
    ctx: &AppContext,
    checkout: Option<&mut CheckoutSession>,
    flow: MpesaFlow,
) -> Result<(), CommandError> {
    match flow {
        MpesaFlow::AlreadyConfirmed {
            message,
            order,
            receipt,
        } => {
            println!("{message}");
            finalize(ctx, checkout, order.id, receipt).await
        }
        MpesaFlow::AwaitingConfirmation {
            message,
            order,
            poll,
        } => {
            println!("{message}");
            println!("Waiting for confirmation of order {}...", order.id);
            match poll.outcome().await {
                PaymentOutcome::Confirmed { receipt } => {
                    finalize(ctx, checkout, order.id, receipt).await
                }
                PaymentOutcome::Failed { reason } => Err(reason.into()),
                PaymentOutcome::TimedOut { message } => {
                    println!("{message}");
                    println!("Run `farmart retry {}` to try again.", order.id);
                    Ok(())
                }
                PaymentOutcome::Cancelled => {
                    println!("Payment attempt cancelled");
                    Ok(())
                }
            }
        }
    }
}

/// Pay for the cart by card. Settles in one round trip.
pub async fn card(
    ctx: &AppContext,
    number: String,
    expiry: String,
    cvv: String,
) -> Result<(), CommandError> {
    let session = ctx.sessions().current();
    let items = ctx.cart().items();
    let totals = pricing::compute_totals(&items);
    let mut checkout = payment_stage(ctx)?;
    let address = checkout.saved_address();

    let receipt = ctx
        .payments()
        .pay_card(
            session.as_ref(),
            &items,
            &totals,
            address.as_ref(),
            &CardDetails {
                number,
                expiry,
                cvv,
            },
        )
        .await?;
    println!("{}", receipt.message);
    finalize(ctx, Some(&mut checkout), receipt.order.id, receipt.receipt).await
}

/// Report the confirmation. A checkout session (cart flow) is placed,
/// clearing the cart and pausing briefly; a retry from the order list
/// has no cart to place.
async fn finalize(
    ctx: &AppContext,
    checkout: Option<&mut CheckoutSession>,
    order_id: OrderId,
    receipt: Option<String>,
) -> Result<(), CommandError> {
    println!("Payment confirmed.");
    if let Some(receipt) = receipt {
        println!("Receipt: {receipt}");
    }
    if let Some(checkout) = checkout {
        let delay = checkout.place(ctx.cart())?;
        tokio::time::sleep(delay).await;
    }
    println!("Order {order_id} placed. See `farmart orders`.");
    Ok(())
}
