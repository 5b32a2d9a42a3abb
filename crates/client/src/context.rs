//! Shared application context.
//!
//! One [`AppContext`] is built at startup and cloned wherever the app
//! needs API access or local state. Cloning is cheap (`Arc` inside).

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::payment::PaymentOrchestrator;
use crate::session::SessionStore;
use crate::store::{CartStore, LocalStore, StorageError, keys};

#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

struct AppContextInner {
    config: ClientConfig,
    store: LocalStore,
    cart: CartStore,
    sessions: SessionStore,
    api: ApiClient,
    payments: PaymentOrchestrator,
}

impl AppContext {
    /// Wire up the context from configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let store = LocalStore::new(&config.data_dir);
        let api = ApiClient::new(&config);
        let payments = PaymentOrchestrator::new(api.clone(), config.polling);
        Self {
            inner: Arc::new(AppContextInner {
                store: store.clone(),
                cart: CartStore::new(store.clone()),
                sessions: SessionStore::new(store),
                api,
                payments,
                config,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn payments(&self) -> &PaymentOrchestrator {
        &self.inner.payments
    }

    /// The market search box text, restored across launches.
    #[must_use]
    pub fn search_query(&self) -> String {
        self.inner.store.read_or_default(keys::SEARCH_QUERY)
    }

    /// Persist the market search box text.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be written.
    pub fn set_search_query(&self, query: &str) -> Result<(), StorageError> {
        self.inner.store.write(keys::SEARCH_QUERY, &query)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PollingConfig;
    use std::path::PathBuf;

    fn test_config(dir: &std::path::Path) -> ClientConfig {
        ClientConfig {
            api_base: "http://localhost:5002".to_owned(),
            data_dir: PathBuf::from(dir),
            polling: PollingConfig::default(),
        }
    }

    #[test]
    fn test_search_query_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::new(test_config(dir.path()));
        assert_eq!(ctx.search_query(), "");
        ctx.set_search_query("boran heifer").unwrap();
        assert_eq!(ctx.search_query(), "boran heifer");
    }

    #[test]
    fn test_context_clones_share_state() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::new(test_config(dir.path()));
        let other = ctx.clone();
        other.set_search_query("kienyeji").unwrap();
        assert_eq!(ctx.search_query(), "kienyeji");
    }
}
