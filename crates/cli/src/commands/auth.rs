//! Account commands: login, register, logout.

use farmart_client::AppContext;
use farmart_client::api::RegisterRequest;
use farmart_core::UserRole;
use farmart_client::session::Session;

use super::CommandError;

/// Log in and persist the session.
pub async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<(), CommandError> {
    let auth = ctx.api().login(email, password).await?;
    let session = Session::from(auth);
    ctx.sessions().save(&session)?;
    println!(
        "Logged in as {} ({})",
        session.user().name,
        session.user().role
    );
    Ok(())
}

/// Register an account, then log in with the same credentials.
pub async fn register(
    ctx: &AppContext,
    name: &str,
    email: &str,
    password: &str,
    farmer: bool,
) -> Result<(), CommandError> {
    let role = if farmer { UserRole::Farmer } else { UserRole::Buyer };
    let user = ctx
        .api()
        .register(&RegisterRequest {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            role,
        })
        .await?;
    println!("Registered {} as {}", user.email, user.role);
    login(ctx, email, password).await
}

/// Forget the saved session.
pub fn logout(ctx: &AppContext) {
    ctx.sessions().clear();
    println!("Logged out");
}
