//! Command implementations.
//!
//! Every command builds an [`AppState`], restores the saved session, binds
//! the cart to it, runs, and waits for its cart syncs before returning.

pub mod account;
pub mod cart;
pub mod carts;
pub mod catalog;

use boutique_core::{ProductId, UserId};
use boutique_storefront::api::ApiError;
use boutique_storefront::auth::AuthError;
use boutique_storefront::cart::{CartError, SessionBinding, SyncHandle, SyncOutcome};
use boutique_storefront::config::{ConfigError, StorefrontConfig};
use boutique_storefront::error::StorefrontError;
use boutique_storefront::state::AppState;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors reported by a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command needs a saved session.
    #[error("Not logged in. Run `boutique login` first.")]
    NotLoggedIn,

    /// The product does not exist in the catalogue.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    /// The server rejected a cart change and it was undone locally.
    #[error("Could not {operation} on the server ({outcome:?})")]
    NotSynced {
        operation: &'static str,
        outcome: SyncOutcome,
    },

    /// Storefront library error.
    #[error(transparent)]
    Storefront(#[from] StorefrontError),
}

macro_rules! storefront_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for CommandError {
                fn from(e: $source) -> Self {
                    Self::Storefront(e.into())
                }
            }
        )+
    };
}

storefront_error_from!(ApiError, AuthError, CartError, ConfigError);

impl CommandError {
    /// Report faults to Sentry.
    pub fn capture(&self) {
        if let Self::Storefront(e) = self {
            e.capture();
        }
    }
}

/// State with the saved session restored and the cart bound to it.
pub async fn connect(config: StorefrontConfig) -> Result<AppState, CommandError> {
    let state = AppState::new(config)?;

    if state.auth().restore().await.is_some() {
        state.auth().refresh().await;
    }

    let user = state.session().user_id();
    match state.cart().bind_session(user).await? {
        SessionBinding::Snapshot => warn!("API unreachable, showing the saved cart"),
        SessionBinding::Empty => warn!("API unreachable and no saved cart"),
        binding => debug!(?binding, "Cart bound"),
    }
    Ok(state)
}

/// The logged-in user.
pub fn require_user(state: &AppState) -> Result<UserId, CommandError> {
    state.session().user_id().ok_or(CommandError::NotLoggedIn)
}

/// Wait for a cart sync and turn a failed one into an error.
pub async fn settled(handle: SyncHandle, operation: &'static str) -> Result<(), CommandError> {
    let outcome = handle.outcome().await;
    if outcome.is_applied() {
        Ok(())
    } else {
        Err(CommandError::NotSynced { operation, outcome })
    }
}
