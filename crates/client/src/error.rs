//! Top-level error type for the client crate.

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::store::StorageError;

/// Any error the client surfaces to callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// A message fit for showing to the user, preferring what the server
    /// said over transport noise.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(api) => api
                .server_message()
                .map_or_else(|| "Something went wrong. Please try again.".to_owned(), str::to_owned),
            other => other.to_string(),
        }
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
