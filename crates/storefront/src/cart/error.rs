//! Cart error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors surfaced by the cart operations that propagate failures.
#[derive(Debug, Error)]
pub enum CartError {
    /// The operation needs a logged-in user.
    #[error("not logged in")]
    NotAuthenticated,

    /// The operation needs a current cart and there is none.
    #[error("no active cart")]
    NoActiveCart,

    /// A newer switch or session change started before this one finished.
    /// State was left to the newer request.
    #[error("superseded by a newer cart request")]
    Superseded,

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}
