//! Farmart Core - Shared types library.
//!
//! This crate provides common types used across all Farmart client components:
//! - `client` - Cart, checkout, and payment orchestration library
//! - `cli` - Command-line flows for buyers and farmers
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients,
//! no storage. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
