//! Pricing calculator for the cart.
//!
//! Pure and side-effect-free so it can be evaluated on every render of the
//! checkout flow. All arithmetic is decimal; price strings go through
//! [`farmart_core::RawPrice::normalized`], the single normalization point.

use rust_decimal::Decimal;

use crate::store::CartItem;

/// Flat shipping fee in KSh, charged once per non-empty cart.
pub const SHIPPING_FEE_KSH: i64 = 450;

/// Derived totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Unit price x quantity for one line.
#[must_use]
pub fn line_total(item: &CartItem) -> Decimal {
    item.price.normalized() * Decimal::from(item.qty.max(1))
}

/// Compute subtotal, shipping, and total for the cart.
///
/// Shipping is a flat [`SHIPPING_FEE_KSH`] applied once when the cart is
/// non-empty; it is not itemized per line.
#[must_use]
pub fn compute_totals(cart: &[CartItem]) -> Totals {
    let subtotal: Decimal = cart.iter().map(line_total).sum();
    let shipping = if cart.is_empty() {
        Decimal::ZERO
    } else {
        Decimal::from(SHIPPING_FEE_KSH)
    };
    Totals {
        subtotal,
        shipping,
        total: subtotal + shipping,
    }
}
