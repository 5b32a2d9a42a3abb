//! Command implementations.

pub mod auth;
pub mod cart;
pub mod farmer;
pub mod market;
pub mod orders;
pub mod pay;

use farmart_client::AppContext;
use farmart_client::session::Session;

/// The uniform command result: errors bubble to `main` for reporting.
pub type CommandError = Box<dyn std::error::Error>;

/// The saved session, or a login hint if there is none.
pub(crate) fn require_session(ctx: &AppContext) -> Result<Session, CommandError> {
    ctx.sessions()
        .current()
        .ok_or_else(|| "Not logged in. Run `farmart login` first.".into())
}
