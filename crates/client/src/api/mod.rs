//! Marketplace REST API client.
//!
//! Plain JSON over `reqwest`. Authenticated calls attach a bearer token
//! from the session when one is present; anonymous calls are tolerated
//! rather than blocked (demo mode). Listing reads are cached with `moka`
//! (5-minute TTL) and invalidated by farmer CRUD.

pub mod types;

pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use farmart_core::{ListingId, OrderId, OrderStatus};
use moka::future::Cache;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::session::Session;

/// Errors that can occur when calling the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// The server-provided message for a non-success response, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Error body shapes the server emits: `{"error": ...}` or `{"detail": ...}`.
#[derive(Debug, serde::Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

const LISTINGS_CACHE_KEY: &str = "listings";

/// Client for the marketplace REST API.
///
/// Cheaply cloneable; all methods take the caller's [`Session`] explicitly
/// rather than reading ambient authentication state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base: String,
    listings_cache: Cache<&'static str, Arc<Vec<ListingOut>>>,
}

impl ApiClient {
    /// Create a new API client from configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let listings_cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base: config.api_base.trim_end_matches('/').to_owned(),
                listings_cache,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base)
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        session: Option<&Session>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self.inner.client.request(method, self.url(path));
        if let Some(token) = session.and_then(Session::bearer_token) {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send a request and decode a JSON success body, mapping non-success
    /// statuses to [`ApiError::Api`] with the server's message.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Self::status_error(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            debug!(error = %e, body = %text.chars().take(300).collect::<String>(),
                "failed to decode API response");
            ApiError::Parse(e.to_string())
        })
    }

    fn status_error(status: StatusCode, body: &str) -> ApiError {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .error
            .or(parsed.detail)
            .unwrap_or_else(|| body.chars().take(200).collect());
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        session: Option<&Session>,
    ) -> Result<T, ApiError> {
        self.send(self.request(reqwest::Method::GET, path, session))
            .await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        session: Option<&Session>,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(self.request(reqwest::Method::POST, path, session).json(body))
            .await
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Log in and obtain a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid credentials or transport failure.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.post_json(
            "/auth/login",
            None,
            &LoginRequest {
                email: email.to_owned(),
                password: password.to_owned(),
            },
        )
        .await
    }

    /// Register a new account. The server returns the created user; log in
    /// afterwards for a token.
    ///
    /// # Errors
    ///
    /// Returns an error if registration is rejected or transport fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserOut, ApiError> {
        self.post_json("/auth/register", None, request).await
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Fetch the catalog. Results are cached for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn listings(&self) -> Result<Arc<Vec<ListingOut>>, ApiError> {
        if let Some(cached) = self.inner.listings_cache.get(LISTINGS_CACHE_KEY).await {
            debug!("cache hit for listings");
            return Ok(cached);
        }

        let response: ListingsResponse = self.get_json("/listings", None).await?;
        let listings = Arc::new(response.items);
        self.inner
            .listings_cache
            .insert(LISTINGS_CACHE_KEY, Arc::clone(&listings))
            .await;
        Ok(listings)
    }

    /// Create a listing (farmer only).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, input), fields(title = %input.title))]
    pub async fn create_listing(
        &self,
        session: &Session,
        input: &ListingInput,
    ) -> Result<ListingOut, ApiError> {
        let listing = self.post_json("/listings", Some(session), input).await?;
        self.invalidate_listings().await;
        Ok(listing)
    }

    /// Update a listing (farmer only).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, input), fields(listing_id = %id))]
    pub async fn update_listing(
        &self,
        session: &Session,
        id: ListingId,
        input: &ListingInput,
    ) -> Result<ListingOut, ApiError> {
        let builder = self
            .request(reqwest::Method::PUT, &format!("/listings/{id}"), Some(session))
            .json(input);
        let listing = self.send(builder).await?;
        self.invalidate_listings().await;
        Ok(listing)
    }

    /// Delete a listing (farmer only).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(listing_id = %id))]
    pub async fn delete_listing(&self, session: &Session, id: ListingId) -> Result<(), ApiError> {
        let builder = self.request(
            reqwest::Method::DELETE,
            &format!("/listings/{id}"),
            Some(session),
        );
        let _: serde_json::Value = self.send(builder).await?;
        self.invalidate_listings().await;
        Ok(())
    }

    async fn invalidate_listings(&self) {
        self.inner.listings_cache.invalidate(LISTINGS_CACHE_KEY).await;
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// List the caller's orders (server filters by bearer identity: buyers
    /// see their purchases, farmers their incoming orders).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn orders(&self, session: Option<&Session>) -> Result<Vec<OrderOut>, ApiError> {
        let response: OrdersResponse = self.get_json("/orders", session).await?;
        Ok(response.items)
    }

    /// Create an order from cart contents without initiating payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, request))]
    pub async fn create_order(
        &self,
        session: Option<&Session>,
        request: &CreateOrderRequest,
    ) -> Result<OrderOut, ApiError> {
        let envelope: OrderEnvelope = self.post_json("/orders", session, request).await?;
        Ok(envelope.order)
    }

    /// Accept or reject an order (farmer only).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(order_id = %id, status = ?status))]
    pub async fn update_order_status(
        &self,
        session: &Session,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<OrderOut, ApiError> {
        let builder = self
            .request(
                reqwest::Method::PATCH,
                &format!("/orders/{id}/status"),
                Some(session),
            )
            .json(&UpdateOrderStatusRequest { status });
        let envelope: OrderEnvelope = self.send(builder).await?;
        Ok(envelope.order)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Initiate an M-Pesa STK push for the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, request), fields(total = %request.total))]
    pub async fn mpesa_stk_push(
        &self,
        session: Option<&Session>,
        request: &MpesaCheckoutRequest,
    ) -> Result<CheckoutResponse, ApiError> {
        self.post_json("/payments/mpesa/stk-push", session, request)
            .await
    }

    /// Re-initiate an M-Pesa push for an existing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, request), fields(order_id = %request.order_id))]
    pub async fn mpesa_retry(
        &self,
        session: Option<&Session>,
        request: &RetryMpesaRequest,
    ) -> Result<CheckoutResponse, ApiError> {
        self.post_json("/payments/mpesa/retry", session, request)
            .await
    }

    /// Synchronous card checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, request), fields(total = %request.total))]
    pub async fn card_checkout(
        &self,
        session: Option<&Session>,
        request: &CardCheckoutRequest,
    ) -> Result<CheckoutResponse, ApiError> {
        self.post_json("/payments/card/checkout", session, request)
            .await
    }

    /// Poll payment status for an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(order_id = %order_id))]
    pub async fn payment_status(
        &self,
        session: Option<&Session>,
        order_id: OrderId,
    ) -> Result<PaymentStatusResponse, ApiError> {
        self.get_json(&format!("/payments/{order_id}/status"), session)
            .await
    }

    /// Aggregate payment metrics for the farmer dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn payment_summary(
        &self,
        session: &Session,
    ) -> Result<PaymentSummaryResponse, ApiError> {
        self.get_json("/payments/summary", Some(session)).await
    }
}
