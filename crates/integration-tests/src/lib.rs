//! Test harness: an in-process mock of the marketplace API.
//!
//! [`MockMarket`] serves the endpoints the client talks to - auth,
//! listings, orders, and payments - over a real HTTP listener on an
//! ephemeral port, with scripted payment-status sequences so the polling
//! loop can be driven through every terminal state.
//!
//! ```rust,ignore
//! let market = MockMarket::spawn().await;
//! market.script_polls(vec![PollStep::Pending, PollStep::Success { receipt: None }]);
//! let config = market.config(dir.path(), fast_polling());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use farmart_client::config::{ClientConfig, PollingConfig};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// One scripted answer to a payment-status poll. Steps are consumed in
/// order; when the script runs out, further polls read `PENDING`.
#[derive(Debug, Clone)]
pub enum PollStep {
    Pending,
    Success { receipt: Option<&'static str> },
    Failed { desc: &'static str },
    ServerError,
}

#[derive(Default)]
struct MockState {
    inline_success: bool,
    card_override: Option<(u16, Value)>,
    poll_script: Vec<PollStep>,
    poll_delay: Duration,
    poll_count: usize,
    listings_requests: usize,
    listings: Vec<Value>,
    orders: Vec<Value>,
    next_id: i64,
}

type Shared = Arc<Mutex<MockState>>;

/// A running mock marketplace server.
pub struct MockMarket {
    base_url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockMarket {
    /// Bind an ephemeral port and start serving. Comes seeded with one
    /// listing (id 1).
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState {
            listings: vec![seed_listing()],
            next_id: 2,
            ..MockState::default()
        }));

        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/listings", get(list_listings).post(create_listing))
            .route("/listings/{id}", put(update_listing).delete(delete_listing))
            .route("/orders", get(list_orders).post(create_order))
            .route("/orders/{id}/status", patch(decide_order))
            .route("/payments/mpesa/stk-push", post(stk_push))
            .route("/payments/mpesa/retry", post(retry_push))
            .route("/payments/card/checkout", post(card_checkout))
            .route("/payments/{id}/status", get(payment_status))
            .route("/payments/summary", get(payment_summary))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock listener");
        let addr = listener.local_addr().expect("mock listener addr");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            server,
        }
    }

    /// Stop serving. Requests from here on fail at the transport level,
    /// which is how tests simulate an unreachable API.
    pub fn shutdown(&self) {
        self.server.abort();
    }

    /// Make STK-push responses report `SUCCESS` inline instead of
    /// `PENDING`.
    pub fn set_inline_success(&self, inline: bool) {
        self.lock().inline_success = inline;
    }

    /// Replace the card-checkout response with an error.
    pub fn fail_card(&self, status: u16, body: Value) {
        self.lock().card_override = Some((status, body));
    }

    /// Queue the answers for upcoming status polls.
    pub fn script_polls(&self, steps: Vec<PollStep>) {
        self.lock().poll_script = steps;
    }

    /// Hold every status-poll response for `delay` before answering, so
    /// tests can act while a request is in flight.
    pub fn set_poll_delay(&self, delay: Duration) {
        self.lock().poll_delay = delay;
    }

    /// How many status polls the server has answered.
    #[must_use]
    pub fn poll_count(&self) -> usize {
        self.lock().poll_count
    }

    /// How many times `GET /listings` actually hit the server (cache
    /// hits on the client do not count).
    #[must_use]
    pub fn listings_requests(&self) -> usize {
        self.lock().listings_requests
    }

    /// A client configuration pointing at this server.
    #[must_use]
    pub fn config(&self, data_dir: &Path, polling: PollingConfig) -> ClientConfig {
        ClientConfig {
            api_base: self.base_url.clone(),
            data_dir: data_dir.to_path_buf(),
            polling,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }
}

impl Drop for MockMarket {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A polling configuration that runs the full loop in milliseconds.
#[must_use]
pub fn fast_polling(max_attempts: u32) -> PollingConfig {
    PollingConfig {
        interval: std::time::Duration::from_millis(5),
        max_attempts,
    }
}

fn seed_listing() -> Value {
    json!({
        "id": 1,
        "title": "Boran heifer",
        "category": "Cattle",
        "breed": "Boran",
        "location": "Nakuru",
        "price": "KSh 45,000",
        "weight": "320kg",
        "status": "available",
        "ownerEmail": "kamau@example.com",
        "ownerName": "Kamau Mwangi",
        "createdAt": "2026-08-01T08:00:00Z"
    })
}

fn test_user() -> Value {
    json!({
        "id": 7,
        "name": "Wanjiku Kamau",
        "email": "wanjiku@example.com",
        "role": "buyer"
    })
}

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().expect("mock state poisoned")
}

async fn login(State(_state): State<Shared>, Json(_body): Json<Value>) -> Json<Value> {
    Json(json!({
        "access_token": "test-token",
        "token_type": "bearer",
        "user": test_user()
    }))
}

async fn register(State(_state): State<Shared>, Json(body): Json<Value>) -> Response {
    let user = json!({
        "id": 8,
        "name": body["name"],
        "email": body["email"],
        "role": body["role"]
    });
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn list_listings(State(state): State<Shared>) -> Json<Value> {
    let mut s = lock(&state);
    s.listings_requests += 1;
    Json(json!({ "items": s.listings }))
}

async fn create_listing(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut s = lock(&state);
    let id = s.next_id;
    s.next_id += 1;
    let mut listing = seed_listing();
    merge(&mut listing, &body);
    listing["id"] = json!(id);
    s.listings.push(listing.clone());
    (StatusCode::CREATED, Json(listing)).into_response()
}

async fn update_listing(
    State(state): State<Shared>,
    UrlPath(id): UrlPath<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = lock(&state);
    let Some(listing) = s
        .listings
        .iter_mut()
        .find(|listing| listing["id"] == json!(id))
    else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Listing not found"})))
            .into_response();
    };
    merge(listing, &body);
    Json(listing.clone()).into_response()
}

async fn delete_listing(State(state): State<Shared>, UrlPath(id): UrlPath<i64>) -> Json<Value> {
    let mut s = lock(&state);
    s.listings.retain(|listing| listing["id"] != json!(id));
    Json(json!({"ok": true}))
}

async fn list_orders(State(state): State<Shared>) -> Json<Value> {
    Json(json!({ "items": lock(&state).orders }))
}

async fn create_order(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut s = lock(&state);
    let order = make_order(&mut s, &body, "NOT_INITIATED", None);
    (StatusCode::CREATED, Json(json!({ "order": order }))).into_response()
}

async fn decide_order(
    State(state): State<Shared>,
    UrlPath(id): UrlPath<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = lock(&state);
    let Some(order) = s.orders.iter_mut().find(|order| order["id"] == json!(id)) else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Order not found"})))
            .into_response();
    };
    order["status"] = body["status"].clone();
    Json(json!({ "order": order.clone() })).into_response()
}

fn make_order(s: &mut MockState, body: &Value, payment_status: &str, method: Option<&str>) -> Value {
    let id = s.next_id;
    s.next_id += 1;
    let order = json!({
        "id": id,
        "buyerEmail": "wanjiku@example.com",
        "items": body["items"],
        "total": body["total"],
        "status": "Pending",
        "paymentStatus": payment_status,
        "paymentMethod": method,
        "createdAt": "2026-08-20T10:00:00Z",
        "deliveryAddress": body["deliveryAddress"]
    });
    s.orders.push(order.clone());
    order
}

async fn stk_push(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut s = lock(&state);
    let status = if s.inline_success { "SUCCESS" } else { "PENDING" };
    let order = make_order(&mut s, &body, status, Some("mpesa"));
    let receipt = s.inline_success.then(|| json!("QATX12345"));
    Json(json!({
        "message": "M-Pesa prompt sent. Confirm on your phone.",
        "order": order,
        "payment": {
            "status": status,
            "receipt": receipt
        }
    }))
}

async fn retry_push(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let s = lock(&state);
    let Some(order) = s
        .orders
        .iter()
        .find(|order| order["id"] == body["orderId"])
        .cloned()
    else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Order not found"})))
            .into_response();
    };
    Json(json!({
        "message": "M-Pesa prompt re-sent. Confirm on your phone.",
        "order": order,
        "payment": { "status": "PENDING" }
    }))
    .into_response()
}

async fn card_checkout(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut s = lock(&state);
    if let Some((status, error)) = s.card_override.clone() {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
        return (code, Json(error)).into_response();
    }
    let order = make_order(&mut s, &body, "SUCCESS", Some("card"));
    Json(json!({
        "message": "Card payment successful",
        "order": order,
        "payment": { "status": "SUCCESS", "receipt": "CARD-0001" }
    }))
    .into_response()
}

async fn payment_status(State(state): State<Shared>, UrlPath(id): UrlPath<i64>) -> Response {
    // the guard cannot be held across the sleep
    let (step, delay) = {
        let mut s = lock(&state);
        s.poll_count += 1;
        let step = if s.poll_script.is_empty() {
            PollStep::Pending
        } else {
            s.poll_script.remove(0)
        };
        (step, s.poll_delay)
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    match step {
        PollStep::Pending => Json(json!({"orderId": id, "status": "PENDING"})).into_response(),
        PollStep::Success { receipt } => Json(json!({
            "orderId": id,
            "status": "SUCCESS",
            "receipt": receipt
        }))
        .into_response(),
        PollStep::Failed { desc } => Json(json!({
            "orderId": id,
            "status": "FAILED",
            "resultDesc": desc
        }))
        .into_response(),
        PollStep::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "gateway hiccup"})),
        )
            .into_response(),
    }
}

async fn payment_summary(State(state): State<Shared>) -> Json<Value> {
    let s = lock(&state);
    let total = s.orders.len();
    let success = s
        .orders
        .iter()
        .filter(|order| order["paymentStatus"] == "SUCCESS")
        .count();
    Json(json!({
        "total": total,
        "success": success,
        "pending": total - success,
        "failed": 0,
        "revenue": 0.0
    }))
}

/// Shallow-merge request fields into a listing template.
fn merge(target: &mut Value, body: &Value) {
    if let (Some(target), Some(body)) = (target.as_object_mut(), body.as_object()) {
        for (key, value) in body {
            target.insert(key.clone(), value.clone());
        }
    }
}
