//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::SnapshotError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] boutique_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password too short or missing.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Display name too short.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The operation needs a logged-in user.
    #[error("not logged in")]
    NotAuthenticated,

    /// The backend answered with an identity that could not be used.
    #[error("unexpected authentication response")]
    InvalidResponse,

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Reading or writing the saved session failed.
    #[error("session store error: {0}")]
    Store(#[from] SnapshotError),
}
