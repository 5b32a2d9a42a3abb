//! Checkout session: Cart -> Shipping -> Payment -> Placed.
//!
//! Each stage gates entry to the next. The shipping step captures the
//! delivery address and persists it; the payment step is driven by
//! [`crate::payment`]; entry into `Placed` clears the cart and reports the
//! fixed confirmation delay before the caller should navigate to orders.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{CartStore, LocalStore, StorageError, keys};

/// How long the payment-confirmed affordance stays up before navigating to
/// the order list.
pub const PLACED_REDIRECT_DELAY: Duration = Duration::from_millis(1200);

/// Where a buyer receives their animals.
///
/// `line1`, `city`, `county`, and `phone` are required before the session
/// may advance to payment; the rest are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub county: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub phone: String,
}

impl DeliveryAddress {
    /// Labels of required fields that are empty or whitespace.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.line1.trim().is_empty() {
            missing.push("address line 1");
        }
        if self.city.trim().is_empty() {
            missing.push("city");
        }
        if self.county.trim().is_empty() {
            missing.push("county");
        }
        if self.phone.trim().is_empty() {
            missing.push("phone");
        }
        missing
    }

    /// Whether every required field is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Stages of the checkout flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cart,
    Shipping,
    Payment,
    Placed,
}

/// Errors raised by checkout transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// One combined message naming every missing field, never one per field.
    #[error("Please enter: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("cannot {action} while in the {stage:?} stage")]
    WrongStage { action: &'static str, stage: Stage },
}

/// A single buyer's progress through checkout.
///
/// The session is purely client-side until the payment step submits an
/// order; abandoning it at any earlier point creates nothing server-side.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    stage: Stage,
    store: LocalStore,
    payment_confirmed: bool,
}

impl CheckoutSession {
    /// Start a session at the cart stage.
    #[must_use]
    pub const fn new(store: LocalStore) -> Self {
        Self {
            stage: Stage::Cart,
            store,
            payment_confirmed: false,
        }
    }

    /// The current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether a payment has been confirmed in this session.
    #[must_use]
    pub const fn payment_confirmed(&self) -> bool {
        self.payment_confirmed
    }

    /// The previously-saved address, used to seed the shipping form.
    #[must_use]
    pub fn saved_address(&self) -> Option<DeliveryAddress> {
        self.store.read(keys::DELIVERY_ADDRESS)
    }

    /// Move from the cart to the shipping step. No validation beyond the
    /// cart being navigable.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::WrongStage`] outside the cart stage.
    pub fn to_shipping(&mut self) -> Result<(), CheckoutError> {
        if self.stage != Stage::Cart {
            return Err(CheckoutError::WrongStage {
                action: "enter shipping",
                stage: self.stage,
            });
        }
        self.stage = Stage::Shipping;
        Ok(())
    }

    /// Validate and persist the delivery address, advancing to payment.
    ///
    /// On validation failure the session stays in shipping and the error
    /// carries one aggregated message naming every missing field.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::MissingFields`] when required fields are empty;
    /// [`CheckoutError::WrongStage`] outside the shipping stage. Storage
    /// failures surface as [`StorageError`] via [`CheckoutStepError`].
    pub fn submit_address(&mut self, address: &DeliveryAddress) -> Result<(), CheckoutStepError> {
        if self.stage != Stage::Shipping {
            return Err(CheckoutError::WrongStage {
                action: "submit address",
                stage: self.stage,
            }
            .into());
        }
        let missing = address.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing).into());
        }
        self.store.write(keys::DELIVERY_ADDRESS, address)?;
        self.stage = Stage::Payment;
        Ok(())
    }

    /// Step back from payment to shipping. An already-confirmed payment is
    /// not invalidated.
    pub fn back_to_shipping(&mut self) {
        if self.stage == Stage::Payment {
            self.stage = Stage::Shipping;
        }
    }

    /// Enter the placed stage after a successful payment: the cart is
    /// cleared and the caller should navigate to the order list after
    /// [`PLACED_REDIRECT_DELAY`].
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::WrongStage`] outside the payment stage,
    /// or [`StorageError`] if clearing the cart fails.
    pub fn place(&mut self, cart: &CartStore) -> Result<Duration, CheckoutStepError> {
        if self.stage != Stage::Payment {
            return Err(CheckoutError::WrongStage {
                action: "place the order",
                stage: self.stage,
            }
            .into());
        }
        cart.clear()?;
        self.payment_confirmed = true;
        self.stage = Stage::Placed;
        Ok(PLACED_REDIRECT_DELAY)
    }

    /// Forget the saved delivery address (the cart-icon reset).
    pub fn clear_saved_address(&self) {
        self.store.remove(keys::DELIVERY_ADDRESS);
    }
}

/// Errors from the gated transitions, [`CheckoutSession::submit_address`]
/// and [`CheckoutSession::place`].
#[derive(Debug, Error)]
pub enum CheckoutStepError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session() -> (tempfile::TempDir, CheckoutSession, CartStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let cart = CartStore::new(store.clone());
        (dir, CheckoutSession::new(store), cart)
    }

    fn full_address() -> DeliveryAddress {
        DeliveryAddress {
            line1: "12 Ridge Rd".to_owned(),
            line2: None,
            city: "Nakuru".to_owned(),
            county: "Nakuru".to_owned(),
            postal_code: Some("20100".to_owned()),
            phone: "0712345678".to_owned(),
        }
    }

    #[test]
    fn test_happy_path_stages() {
        let (_dir, mut session, cart) = session();
        assert_eq!(session.stage(), Stage::Cart);

        session.to_shipping().unwrap();
        assert_eq!(session.stage(), Stage::Shipping);

        session.submit_address(&full_address()).unwrap();
        assert_eq!(session.stage(), Stage::Payment);

        let delay = session.place(&cart).unwrap();
        assert_eq!(session.stage(), Stage::Placed);
        assert_eq!(delay, PLACED_REDIRECT_DELAY);
    }

    #[test]
    fn test_missing_city_blocks_and_names_field() {
        let (_dir, mut session, _cart) = session();
        session.to_shipping().unwrap();

        let mut address = full_address();
        address.city = "  ".to_owned();
        let err = session.submit_address(&address).unwrap_err();

        assert!(err.to_string().contains("city"));
        assert_eq!(session.stage(), Stage::Shipping);
        assert!(session.saved_address().is_none());
    }

    #[test]
    fn test_all_missing_fields_in_one_message() {
        let (_dir, mut session, _cart) = session();
        session.to_shipping().unwrap();

        let err = session.submit_address(&DeliveryAddress::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please enter: address line 1, city, county, phone"
        );
    }

    #[test]
    fn test_saved_address_seeds_next_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let mut first = CheckoutSession::new(store.clone());
        first.to_shipping().unwrap();
        first.submit_address(&full_address()).unwrap();

        let second = CheckoutSession::new(store);
        assert_eq!(second.saved_address(), Some(full_address()));
    }

    #[test]
    fn test_back_does_not_invalidate_confirmed_payment() {
        let (_dir, mut session, cart) = session();
        session.to_shipping().unwrap();
        session.submit_address(&full_address()).unwrap();
        session.place(&cart).unwrap();

        session.back_to_shipping();
        assert!(session.payment_confirmed());
        assert_eq!(session.stage(), Stage::Placed);
    }

    #[test]
    fn test_cannot_submit_address_from_cart() {
        let (_dir, mut session, _cart) = session();
        let err = session.submit_address(&full_address()).unwrap_err();
        assert!(matches!(
            err,
            CheckoutStepError::Checkout(CheckoutError::WrongStage { .. })
        ));
    }

    #[test]
    fn test_cannot_place_before_payment_stage() {
        let (_dir, mut session, cart) = session();
        cart.add_item(crate::store::CartItem::new(
            farmart_core::ListingId::new(1),
            "Boran heifer".to_owned(),
            "KSh 45,000".into(),
        ))
        .unwrap();

        let err = session.place(&cart).unwrap_err();
        assert!(matches!(
            err,
            CheckoutStepError::Checkout(CheckoutError::WrongStage { .. })
        ));
        assert_eq!(session.stage(), Stage::Cart);
        assert!(!session.payment_confirmed());
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_clear_saved_address() {
        let (_dir, mut session, _cart) = session();
        session.to_shipping().unwrap();
        session.submit_address(&full_address()).unwrap();
        session.clear_saved_address();
        assert!(session.saved_address().is_none());
    }
}
