//! User domain types.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use boutique_core::{Email, Role, UserId};

/// The authenticated shopper (identity issued by the backend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: Email,
    /// Account role.
    pub role: Role,
}

impl User {
    /// Whether the user may use the back office.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// A user together with the bearer token authenticating their requests.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct AuthUser {
    pub user: User,
    pub token: SecretString,
}

impl AuthUser {
    /// Create a new authenticated user.
    #[must_use]
    pub const fn new(user: User, token: SecretString) -> Self {
        Self { user, token }
    }
}

impl PartialEq for AuthUser {
    fn eq(&self, other: &Self) -> bool {
        self.user == other.user && self.token.expose_secret() == other.token.expose_secret()
    }
}

impl std::fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthUser")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_user_debug_redacts_token() {
        let auth = AuthUser::new(
            User {
                id: UserId::new(1),
                name: "Camille".to_string(),
                email: Email::parse("camille@boutique.fr").unwrap(),
                role: Role::Client,
            },
            SecretString::from("eyJhbGciOiJIUzI1NiJ9.super-secret"),
        );

        let debug_output = format!("{auth:?}");
        assert!(debug_output.contains("camille@boutique.fr"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret"));
    }
}
