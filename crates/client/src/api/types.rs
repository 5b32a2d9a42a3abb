//! Wire types for the marketplace REST API.
//!
//! Field names follow the server's camelCase JSON. Money totals travel as
//! JSON numbers; listing and line-item prices travel raw ([`RawPrice`]).

use chrono::{DateTime, Utc};
use farmart_core::{
    ListingId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, RawPrice, UserId, UserRole,
};
use serde::{Deserialize, Serialize};

use crate::checkout::DeliveryAddress;
use crate::store::CartItem;

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// The authenticated user as the server reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOut {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl UserOut {
    /// Whether this user sells rather than buys.
    #[must_use]
    pub fn is_farmer(&self) -> bool {
        self.role == UserRole::Farmer
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub user: UserOut,
}

// =============================================================================
// Listings
// =============================================================================

/// A farmer-created catalog entry describing an animal for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingOut {
    pub id: ListingId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub price: RawPrice,
    #[serde(default)]
    pub max_price: Option<RawPrice>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: String,
    #[serde(default)]
    pub health: Option<String>,
    pub owner_email: String,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingsResponse {
    pub items: Vec<ListingOut>,
}

/// Payload for creating or updating a listing (farmer CRUD).
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListingInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// One line of a server-side order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemOut {
    pub id: i64,
    #[serde(default)]
    pub listing_id: Option<ListingId>,
    pub title: String,
    #[serde(default)]
    pub name: String,
    pub qty: u32,
    pub price: RawPrice,
    #[serde(default)]
    pub weight: Option<String>,
}

/// A server-owned order observed by the client.
///
/// `status` (farmer decision) and `payment_status` move independently; the
/// client never recomputes `total` after submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOut {
    pub id: OrderId,
    #[serde(default)]
    pub buyer_name: Option<String>,
    pub buyer_email: String,
    #[serde(default)]
    pub farmer_email: Option<String>,
    pub items: Vec<OrderItemOut>,
    pub total: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_receipt: Option<String>,
    #[serde(default)]
    pub result_desc: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub delivery_address: Option<DeliveryAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrdersResponse {
    pub items: Vec<OrderOut>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderEnvelope {
    pub order: OrderOut,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<CartItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: rust_decimal::Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<DeliveryAddress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MpesaCheckoutRequest {
    pub items: Vec<CartItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: rust_decimal::Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: rust_decimal::Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: rust_decimal::Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_email: Option<String>,
    pub delivery_address: DeliveryAddress,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCheckoutRequest {
    pub items: Vec<CartItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: rust_decimal::Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: rust_decimal::Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: rust_decimal::Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_email: Option<String>,
    pub delivery_address: DeliveryAddress,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryMpesaRequest {
    pub order_id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// The payment fragment of a checkout/retry response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentState {
    pub status: PaymentStatus,
    #[serde(default)]
    pub result_desc: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
}

/// Response to STK push, retry, and card checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub order: OrderOut,
    pub payment: PaymentState,
}

/// Response to a payment-status poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub order_id: OrderId,
    pub status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub result_desc: Option<String>,
}

/// Aggregate payment metrics for the farmer dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSummaryResponse {
    pub total: u64,
    pub success: u64,
    pub pending: u64,
    pub failed: u64,
    pub revenue: f64,
}
