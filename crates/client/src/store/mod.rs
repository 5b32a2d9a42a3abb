//! Durable local storage for client-side state.
//!
//! The browser client keeps the cart, the delivery address, and the search
//! query in per-origin storage; here each key is one JSON document under the
//! configured data directory. Every writer persists the *entire* value for
//! its key - never a delta - so independent screens working from stale
//! in-memory copies cannot lose each other's updates.
//!
//! Decode policy: a missing, unreadable, or malformed value reads back as
//! the type's default. Corruption is recovered by reset-to-empty, logged at
//! debug, and never surfaced to the caller.

mod cart;
pub mod keys;

pub use cart::{AddPolicy, CartItem, CartStore};

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors writing to the durable store.
///
/// Reads deliberately have no error type - see the module docs.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error writing {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A JSON-per-key durable store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `dir`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read the value stored under `key`, or the default when the key is
    /// absent or its contents fail to decode.
    #[must_use]
    pub fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        read_json_or_default(&self.path_for(key), key)
    }

    /// Read the value stored under `key`, or `None` when absent/corrupt.
    #[must_use]
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "discarding corrupt stored value");
                None
            }
        }
    }

    /// Persist `value` under `key`, replacing the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if serialization or the filesystem write
    /// fails.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            key: key.to_owned(),
            source,
        })?;
        let json = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.to_owned(),
            source,
        })?;
        fs::write(self.path_for(key), json).map_err(|source| StorageError::Io {
            key: key.to_owned(),
            source,
        })
    }

    /// Remove the value stored under `key`, if any.
    pub fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path, key: &str) -> T {
    let Ok(raw) = fs::read_to_string(path) else {
        return T::default();
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(key, error = %e, "resetting corrupt stored value to default");
            T::default()
        }
    }
}
