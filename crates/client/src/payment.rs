//! Payment orchestration.
//!
//! Two flows against the marketplace API:
//!
//! * **M-Pesa**: an STK push is sent to the customer's phone, then the
//!   client polls the order's payment status on a fixed schedule until
//!   it reaches a terminal state or the attempt budget runs out. The
//!   push response itself can already report `SUCCESS` (simulated
//!   gateways confirm inline), in which case no polling happens.
//! * **Card**: a single synchronous call that settles immediately.
//!
//! Polling runs on a spawned task behind a [`PollHandle`]. Cancelling
//! the handle, or starting a newer payment attempt, makes the old poll
//! resolve to [`PaymentOutcome::Cancelled`] so a stale confirmation can
//! never act on the current checkout.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use farmart_core::{OrderId, PaymentStatus};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::api::{
    ApiClient, ApiError, CardCheckoutRequest, CheckoutResponse, MpesaCheckoutRequest, OrderOut,
    RetryMpesaRequest,
};
use crate::checkout::{CheckoutError, DeliveryAddress};
use crate::config::PollingConfig;
use crate::pricing::Totals;
use crate::session::Session;
use crate::store::CartItem;

/// Shown when polling exhausts its budget on pending statuses.
pub const TIMED_OUT_MESSAGE: &str = "Payment confirmation timed out. Check again in Orders.";
/// Shown when polling exhausts its budget without ever reaching the server.
pub const UNCONFIRMED_MESSAGE: &str = "Could not confirm payment. Check your order status.";

const DEFAULT_PUSH_MESSAGE: &str = "M-Pesa prompt sent. Confirm on your phone.";
const DEFAULT_CARD_MESSAGE: &str = "Card payment successful";
const DEFAULT_FAILED_REASON: &str = "Payment failed. Please try again.";

/// Errors raised before a payment reaches the server.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("Invalid M-Pesa phone number format")]
    InvalidPhone,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Terminal result of a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The gateway confirmed the payment.
    Confirmed { receipt: Option<String> },
    /// The gateway rejected the payment.
    Failed { reason: String },
    /// The attempt budget ran out before a terminal status was seen.
    TimedOut { message: String },
    /// The poll was cancelled or superseded by a newer attempt.
    Cancelled,
}

/// Result of initiating an M-Pesa payment.
#[derive(Debug)]
pub enum MpesaFlow {
    /// The push response already reported success; nothing to poll.
    AlreadyConfirmed {
        message: String,
        order: OrderOut,
        receipt: Option<String>,
    },
    /// The prompt is on the customer's phone; await the poll.
    AwaitingConfirmation {
        message: String,
        order: OrderOut,
        poll: PollHandle,
    },
}

/// Result of a synchronous card checkout.
#[derive(Debug, Clone)]
pub struct CardReceipt {
    pub message: String,
    pub order: OrderOut,
    pub receipt: Option<String>,
}

/// Card form input.
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    pub cvv: String,
}

/// Normalize a Kenyan phone number to MSISDN form (`2547XXXXXXXX`).
///
/// Mirrors the server's rule: strip everything but digits, then accept
/// `254` + 9 digits as-is, rewrite a leading `0` or a bare `7XXXXXXXX`,
/// and reject everything else.
#[must_use]
pub fn normalize_msisdn(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 12 && digits.starts_with("254") {
        Some(digits)
    } else if digits.len() == 10 && digits.starts_with('0') {
        Some(format!("254{}", &digits[1..]))
    } else if digits.len() == 9 && digits.starts_with('7') {
        Some(format!("254{digits}"))
    } else {
        None
    }
}

/// The single farmer the cart belongs to, when it does.
///
/// Orders are routed to a farmer only when every cart line that carries
/// an owner email carries the same one.
#[must_use]
pub fn single_farmer_email(items: &[CartItem]) -> Option<String> {
    let distinct: BTreeSet<&str> = items
        .iter()
        .filter_map(|item| item.owner_email.as_ref())
        .map(farmart_core::Email::as_str)
        .collect();
    if distinct.len() == 1 {
        distinct.into_iter().next().map(str::to_owned)
    } else {
        None
    }
}

fn address_missing_fields(address: Option<&DeliveryAddress>, missing: &mut Vec<&'static str>) {
    let blank = |s: Option<&str>| s.is_none_or(|v| v.trim().is_empty());
    let line1 = address.map(|a| a.line1.as_str());
    let city = address.map(|a| a.city.as_str());
    let county = address.map(|a| a.county.as_str());
    let phone = address.map(|a| a.phone.as_str());
    if blank(line1) {
        missing.push("delivery address");
    }
    if blank(city) {
        missing.push("delivery city");
    }
    if blank(county) {
        missing.push("delivery county");
    }
    if blank(phone) {
        missing.push("delivery phone");
    }
}

/// Handle to an in-flight payment status poll.
#[derive(Debug)]
pub struct PollHandle {
    cancelled: Arc<AtomicBool>,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    task: JoinHandle<PaymentOutcome>,
}

impl PollHandle {
    /// Stop the poll. The handle will resolve to
    /// [`PaymentOutcome::Cancelled`].
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for the poll to finish. A poll that was cancelled or
    /// superseded by a newer payment attempt resolves to
    /// [`PaymentOutcome::Cancelled`] regardless of what the gateway
    /// eventually said.
    pub async fn outcome(self) -> PaymentOutcome {
        let outcome = match self.task.await {
            Ok(outcome) => outcome,
            Err(join) => {
                warn!(error = %join, "payment poll task aborted");
                PaymentOutcome::Cancelled
            }
        };
        if self.cancelled.load(Ordering::SeqCst)
            || self.current_generation.load(Ordering::SeqCst) != self.generation
        {
            return PaymentOutcome::Cancelled;
        }
        outcome
    }
}

/// Drives M-Pesa and card payments for the current checkout.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    api: ApiClient,
    polling: PollingConfig,
    generation: Arc<AtomicU64>,
}

impl PaymentOrchestrator {
    #[must_use]
    pub fn new(api: ApiClient, polling: PollingConfig) -> Self {
        Self {
            api,
            polling,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start an M-Pesa payment for the cart.
    ///
    /// Validates the phone number and delivery address, sends the STK
    /// push, and either reports inline success or hands back a poll for
    /// the pending confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Checkout`] naming the missing fields,
    /// [`PaymentError::InvalidPhone`] for an unusable number, or an API
    /// error from the push itself.
    #[instrument(skip_all, fields(lines = items.len()))]
    pub async fn pay_mpesa(
        &self,
        session: Option<&Session>,
        items: &[CartItem],
        totals: &Totals,
        address: Option<&DeliveryAddress>,
        phone: &str,
    ) -> Result<MpesaFlow, PaymentError> {
        let mut missing = Vec::new();
        if phone.trim().is_empty() {
            missing.push("M-Pesa phone number");
        }
        address_missing_fields(address, &mut missing);
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing).into());
        }
        if items.is_empty() {
            return Err(PaymentError::EmptyCart);
        }
        let msisdn = normalize_msisdn(phone).ok_or(PaymentError::InvalidPhone)?;
        let Some(address) = address else {
            // a missing address was reported as missing fields above
            return Err(CheckoutError::MissingFields(vec!["delivery address"]).into());
        };

        let request = MpesaCheckoutRequest {
            items: items.to_vec(),
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            total: totals.total,
            farmer_email: single_farmer_email(items),
            delivery_address: address.clone(),
            phone_number: msisdn,
        };

        let response = self.api.mpesa_stk_push(session, &request).await?;
        Ok(self.mpesa_flow(session, response))
    }

    /// Re-initiate the M-Pesa push for an order whose payment did not go
    /// through. The polling budget restarts from zero.
    ///
    /// # Errors
    ///
    /// Returns an API error if the retry request fails.
    #[instrument(skip(self, session), fields(order_id = %order_id))]
    pub async fn retry_mpesa(
        &self,
        session: Option<&Session>,
        order_id: OrderId,
        phone: Option<&str>,
    ) -> Result<MpesaFlow, PaymentError> {
        let phone_number = match phone {
            Some(raw) if !raw.trim().is_empty() => {
                Some(normalize_msisdn(raw).ok_or(PaymentError::InvalidPhone)?)
            }
            _ => None,
        };
        let response = self
            .api
            .mpesa_retry(
                session,
                &RetryMpesaRequest {
                    order_id,
                    phone_number,
                },
            )
            .await?;
        Ok(self.mpesa_flow(session, response))
    }

    fn mpesa_flow(&self, session: Option<&Session>, response: CheckoutResponse) -> MpesaFlow {
        let message = response
            .message
            .unwrap_or_else(|| DEFAULT_PUSH_MESSAGE.to_owned());
        if response.payment.status == PaymentStatus::Success {
            info!(order_id = %response.order.id, "payment confirmed inline");
            return MpesaFlow::AlreadyConfirmed {
                message,
                receipt: response.payment.receipt,
                order: response.order,
            };
        }
        let poll = self.start_poll(session.cloned(), response.order.id);
        MpesaFlow::AwaitingConfirmation {
            message,
            order: response.order,
            poll,
        }
    }

    /// Pay for the cart by card. Settles synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Checkout`] naming the missing fields, or
    /// an API error carrying the gateway's rejection reason.
    #[instrument(skip_all, fields(lines = items.len()))]
    pub async fn pay_card(
        &self,
        session: Option<&Session>,
        items: &[CartItem],
        totals: &Totals,
        address: Option<&DeliveryAddress>,
        card: &CardDetails,
    ) -> Result<CardReceipt, PaymentError> {
        let mut missing = Vec::new();
        if card.number.trim().is_empty() {
            missing.push("card number");
        }
        if card.expiry.trim().is_empty() {
            missing.push("MM/YY");
        }
        if card.cvv.trim().is_empty() {
            missing.push("CVV");
        }
        address_missing_fields(address, &mut missing);
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing).into());
        }
        if items.is_empty() {
            return Err(PaymentError::EmptyCart);
        }
        let Some(address) = address else {
            return Err(CheckoutError::MissingFields(vec!["delivery address"]).into());
        };

        let request = CardCheckoutRequest {
            items: items.to_vec(),
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            total: totals.total,
            farmer_email: single_farmer_email(items),
            delivery_address: address.clone(),
            card_number: card.number.clone(),
            expiry: card.expiry.clone(),
            cvv: card.cvv.clone(),
        };

        let response = self.api.card_checkout(session, &request).await?;
        Ok(CardReceipt {
            message: response
                .message
                .unwrap_or_else(|| DEFAULT_CARD_MESSAGE.to_owned()),
            receipt: response.payment.receipt,
            order: response.order,
        })
    }

    /// Spawn a status poll for `order_id`. Bumping the generation makes
    /// any still-running older poll resolve as cancelled.
    fn start_poll(&self, session: Option<Session>, order_id: OrderId) -> PollHandle {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(poll_until_terminal(
            self.api.clone(),
            session,
            order_id,
            self.polling,
            Arc::clone(&cancelled),
        ));
        PollHandle {
            cancelled,
            generation,
            current_generation: Arc::clone(&self.generation),
            task,
        }
    }
}

async fn poll_until_terminal(
    api: ApiClient,
    session: Option<Session>,
    order_id: OrderId,
    polling: PollingConfig,
    cancelled: Arc<AtomicBool>,
) -> PaymentOutcome {
    let mut attempts: u32 = 0;
    let mut transport_only = true;
    loop {
        tokio::time::sleep(polling.interval).await;
        if cancelled.load(Ordering::SeqCst) {
            return PaymentOutcome::Cancelled;
        }
        attempts += 1;
        let result = api.payment_status(session.as_ref(), order_id).await;
        // a cancel that landed while the request was in flight must win
        // over whatever the gateway answered
        if cancelled.load(Ordering::SeqCst) {
            return PaymentOutcome::Cancelled;
        }
        match result {
            Ok(status) => {
                transport_only = false;
                match status.status {
                    PaymentStatus::Success => {
                        info!(order_id = %order_id, attempts, "payment confirmed");
                        return PaymentOutcome::Confirmed {
                            receipt: status.receipt,
                        };
                    }
                    PaymentStatus::Failed => {
                        return PaymentOutcome::Failed {
                            reason: status
                                .result_desc
                                .unwrap_or_else(|| DEFAULT_FAILED_REASON.to_owned()),
                        };
                    }
                    PaymentStatus::Pending | PaymentStatus::NotInitiated => {
                        debug!(order_id = %order_id, attempts, "payment still pending");
                    }
                }
            }
            Err(ApiError::Api { status, .. }) => {
                transport_only = false;
                debug!(order_id = %order_id, attempts, status, "status poll rejected");
            }
            Err(error) => {
                debug!(order_id = %order_id, attempts, error = %error, "status poll failed");
            }
        }
        if attempts >= polling.max_attempts {
            let message = if transport_only {
                UNCONFIRMED_MESSAGE
            } else {
                TIMED_OUT_MESSAGE
            };
            warn!(order_id = %order_id, attempts, "payment confirmation timed out");
            return PaymentOutcome::TimedOut {
                message: message.to_owned(),
            };
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use farmart_core::Email;

    #[test]
    fn test_normalize_msisdn_accepts_canonical() {
        assert_eq!(
            normalize_msisdn("254712345678").as_deref(),
            Some("254712345678")
        );
    }

    #[test]
    fn test_normalize_msisdn_rewrites_local_prefix() {
        assert_eq!(
            normalize_msisdn("0712 345 678").as_deref(),
            Some("254712345678")
        );
        assert_eq!(
            normalize_msisdn("712345678").as_deref(),
            Some("254712345678")
        );
        // any 10-digit leading-zero number is rewritten; the server does
        // not range-check the operator prefix
        assert_eq!(
            normalize_msisdn("0812345678").as_deref(),
            Some("254812345678")
        );
    }

    #[test]
    fn test_normalize_msisdn_strips_punctuation() {
        assert_eq!(
            normalize_msisdn("+254-712-345-678").as_deref(),
            Some("254712345678")
        );
    }

    #[test]
    fn test_normalize_msisdn_rejects_garbage() {
        assert!(normalize_msisdn("12345").is_none());
        assert!(normalize_msisdn("254712345").is_none());
        assert!(normalize_msisdn("").is_none());
    }

    fn item(owner: Option<&str>) -> CartItem {
        CartItem {
            id: farmart_core::ListingId::new(1),
            title: "Boran heifer".to_owned(),
            price: "KSh 45,000".into(),
            qty: 1,
            weight: None,
            owner_email: owner.map(|o| Email::parse(o).unwrap()),
        }
    }

    #[test]
    fn test_single_farmer_email() {
        let items = vec![item(Some("kamau@example.com")), item(Some("kamau@example.com"))];
        assert_eq!(
            single_farmer_email(&items).as_deref(),
            Some("kamau@example.com")
        );
    }

    #[test]
    fn test_mixed_farmers_yield_none() {
        let items = vec![item(Some("kamau@example.com")), item(Some("njeri@example.com"))];
        assert!(single_farmer_email(&items).is_none());
    }

    #[test]
    fn test_missing_owner_emails_are_ignored() {
        let items = vec![item(Some("kamau@example.com")), item(None)];
        assert_eq!(
            single_farmer_email(&items).as_deref(),
            Some("kamau@example.com")
        );
    }

    #[test]
    fn test_missing_field_labels() {
        let mut missing = vec!["M-Pesa phone number"];
        address_missing_fields(None, &mut missing);
        let err = CheckoutError::MissingFields(missing);
        assert_eq!(
            err.to_string(),
            "Please enter: M-Pesa phone number, delivery address, delivery city, delivery county, delivery phone"
        );
    }

    #[test]
    fn test_partial_address_reports_only_blank_fields() {
        let address = DeliveryAddress {
            line1: "12 Ngong Rd".to_owned(),
            line2: None,
            city: String::new(),
            county: "Nairobi".to_owned(),
            postal_code: None,
            phone: "0712345678".to_owned(),
        };
        let mut missing = Vec::new();
        address_missing_fields(Some(&address), &mut missing);
        assert_eq!(missing, vec!["delivery city"]);
    }
}
