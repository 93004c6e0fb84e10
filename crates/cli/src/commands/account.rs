//! Session commands.

use boutique_core::Role;
use boutique_storefront::config::StorefrontConfig;
use boutique_storefront::state::AppState;
use secrecy::SecretString;

use super::{CommandError, connect, require_user};
use crate::output;

/// Log in and save the session.
pub async fn login(
    config: StorefrontConfig,
    email: &str,
    password: &SecretString,
) -> Result<(), CommandError> {
    let state = AppState::new(config)?;
    let user = state.auth().login(email, password).await?;
    state.cart().bind_session(Some(user.id)).await?;

    output::user(&user);
    output::cart(&state.cart().snapshot());
    Ok(())
}

/// Create an account and save the session.
pub async fn signup(
    config: StorefrontConfig,
    name: &str,
    email: &str,
    password: &SecretString,
    role: Role,
) -> Result<(), CommandError> {
    let state = AppState::new(config)?;
    let user = state.auth().signup(name, email, password, role).await?;
    output::user(&user);
    Ok(())
}

/// Forget the saved session.
pub async fn logout(config: StorefrontConfig) -> Result<(), CommandError> {
    let state = AppState::new(config)?;
    state.auth().restore().await;
    state.auth().logout().await?;
    state.cart().bind_session(None).await?;
    output::message("Logged out.");
    Ok(())
}

/// Show the logged-in user.
pub async fn whoami(config: StorefrontConfig) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;
    if let Some(user) = state.session().user() {
        output::user(&user);
    }
    Ok(())
}
