//! Authenticated session handling.
//!
//! The session record (bearer token + user profile) lives in the local
//! store under a single key. [`SessionStore`] is the only reader and
//! writer of that key; everything else receives a [`Session`] value.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::api::{AuthResponse, UserOut};
use crate::store::{LocalStore, StorageError, keys};

/// An authenticated session: the logged-in user plus their bearer token.
///
/// The token is wrapped in [`SecretString`] so it never shows up in
/// `Debug` output or log lines.
#[derive(Clone)]
pub struct Session {
    user: UserOut,
    token: SecretString,
}

impl Session {
    #[must_use]
    pub fn new(user: UserOut, token: SecretString) -> Self {
        Self { user, token }
    }

    /// The logged-in user's profile.
    #[must_use]
    pub fn user(&self) -> &UserOut {
        &self.user
    }

    /// The user's email, for matching orders and notifications.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.user.email
    }

    /// Whether the logged-in user is a farmer.
    #[must_use]
    pub fn is_farmer(&self) -> bool {
        self.user.is_farmer()
    }

    /// The bearer token for API calls.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        Some(self.token.expose_secret())
    }
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Self::new(auth.user, SecretString::from(auth.access_token))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.email)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// On-disk shape of the session record. `SecretString` intentionally has
/// no `Serialize` impl, so persistence goes through this plain struct.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    user: UserOut,
}

/// Sole reader and writer of the persisted session record.
#[derive(Clone)]
pub struct SessionStore {
    store: LocalStore,
}

impl SessionStore {
    #[must_use]
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Load the current session, if one is saved. A corrupt record reads
    /// as logged out.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        let stored: StoredSession = self.store.read(keys::SESSION)?;
        Some(Session::new(stored.user, SecretString::from(stored.token)))
    }

    /// Persist a session after login.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        self.store.write(
            keys::SESSION,
            &StoredSession {
                token: session.token.expose_secret().to_owned(),
                user: session.user.clone(),
            },
        )
    }

    /// Discard the saved session (logout).
    pub fn clear(&self) {
        self.store.remove(keys::SESSION);
    }
}
