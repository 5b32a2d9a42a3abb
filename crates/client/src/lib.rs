//! Farmart client library.
//!
//! Implements the buyer-side cart-to-order-to-payment pipeline of the
//! Farmart livestock marketplace, plus the farmer-side order and listing
//! operations, against the marketplace REST API.
//!
//! # Architecture
//!
//! Data flows one direction on the happy path:
//!
//! ```text
//! cart store -> pricing -> checkout session -> payment orchestrator -> API
//! ```
//!
//! and status flows back from the API through the payment orchestrator and
//! the notification feed. The cart, the delivery address, and the search
//! query live in a durable local store ([`store::LocalStore`]); the server
//! owns orders and payment state, observed only through [`api::ApiClient`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod context;
pub mod error;
pub mod notifications;
pub mod payment;
pub mod pricing;
pub mod session;
pub mod store;

pub use context::AppContext;
pub use error::{AppError, Result};
