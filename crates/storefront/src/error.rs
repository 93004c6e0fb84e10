//! Unified error handling with Sentry integration.
//!
//! Each concern has its own error enum; [`StorefrontError`] wraps them for
//! consumers (such as the CLI) that drive several at once.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::cart::CartError;
use crate::config::ConfigError;
use crate::storage::SnapshotError;

/// Library-level error type.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Local snapshot could not be read or written.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl StorefrontError {
    /// Report the error to Sentry if it indicates a fault rather than a
    /// user mistake, returning whether it was captured.
    pub fn capture(&self) -> bool {
        let reportable = match self {
            Self::Config(_) | Self::Snapshot(_) => true,
            Self::Api(e) => is_reportable_api_error(e),
            Self::Auth(AuthError::Api(e)) => is_reportable_api_error(e),
            Self::Auth(AuthError::InvalidResponse | AuthError::Store(_)) => true,
            Self::Auth(_) => false,
            Self::Cart(CartError::Api(e)) => is_reportable_api_error(e),
            Self::Cart(_) => false,
        };

        if reportable {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
        reportable
    }
}

/// Server faults and malformed responses are reported; auth, not-found and
/// rate limiting are expected outcomes.
const fn is_reportable_api_error(error: &ApiError) -> bool {
    match error {
        ApiError::Status { status, .. } => *status >= 500,
        ApiError::Parse(_) => true,
        ApiError::Http(_)
        | ApiError::Unauthorized(_)
        | ApiError::NotFound(_)
        | ApiError::RateLimited(_) => false,
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_error_display() {
        let err = StorefrontError::from(ApiError::NotFound("cart 4".to_string()));
        assert_eq!(err.to_string(), "API error: Not found: cart 4");

        let err = StorefrontError::from(CartError::NoActiveCart);
        assert!(err.to_string().starts_with("Cart error:"));
    }

    #[test]
    fn test_reportable_api_errors() {
        assert!(is_reportable_api_error(&ApiError::Status {
            status: 502,
            body: String::new()
        }));
        assert!(!is_reportable_api_error(&ApiError::Status {
            status: 409,
            body: String::new()
        }));
        assert!(!is_reportable_api_error(&ApiError::Unauthorized(
            "expired".to_string()
        )));
        assert!(!is_reportable_api_error(&ApiError::RateLimited(3)));
    }

    #[test]
    fn test_user_errors_are_not_captured() {
        assert!(!StorefrontError::from(AuthError::InvalidCredentials).capture());
        assert!(!StorefrontError::from(CartError::NoActiveCart).capture());
    }
}
