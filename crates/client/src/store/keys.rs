//! Keys for durable client-side state.
//!
//! Multiple independent flows read and write these keys; each key is owned
//! by the whole-document write discipline in [`super::LocalStore`].

/// Key for the buyer's cart (sequence of cart items).
pub const CART: &str = "cart";

/// Key for the saved delivery address (single object).
pub const DELIVERY_ADDRESS: &str = "delivery_address";

/// Key for the persisted search query (string).
pub const SEARCH_QUERY: &str = "search_query";

/// Key for the logged-in session (user + token).
pub const SESSION: &str = "session";
