//! Authentication and the shared session.
//!
//! [`Session`] is the single source of truth for "who is logged in". The API
//! client reads the bearer token from it and the cart service watches it to
//! rebind on account switches. [`AuthService`] is the only writer.

mod error;
mod store;

pub use error::AuthError;
pub use store::SessionStore;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use boutique_core::{Email, Role, UserId};

use crate::api::{ApiClient, ApiError, convert_auth_user};
use crate::api::types::AuthResponse;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{AuthUser, User};

/// Minimum password length accepted at signup.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum display name length accepted at signup.
pub const MIN_NAME_LENGTH: usize = 2;

// =============================================================================
// Session
// =============================================================================

/// Handle on the current authentication state.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Clone)]
pub struct Session {
    tx: Arc<watch::Sender<Option<AuthUser>>>,
}

impl Session {
    /// Create an anonymous session.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Create a session already holding `auth`.
    #[must_use]
    pub fn with_user(auth: AuthUser) -> Self {
        let session = Self::new();
        session.set(auth);
        session
    }

    /// The logged-in user and token.
    #[must_use]
    pub fn current(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    /// The logged-in user.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.tx.borrow().as_ref().map(|auth| auth.user.clone())
    }

    /// ID of the logged-in user.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.tx.borrow().as_ref().map(|auth| auth.user.id)
    }

    /// Bearer token of the logged-in user.
    #[must_use]
    pub fn bearer_token(&self) -> Option<SecretString> {
        self.tx.borrow().as_ref().map(|auth| auth.token.clone())
    }

    /// Whether someone is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.tx.subscribe()
    }

    /// Replace the logged-in user.
    pub fn set(&self, auth: AuthUser) {
        self.tx.send_replace(Some(auth));
    }

    /// Log out.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Update the user record, keeping the token.
    ///
    /// Does nothing when logged out or when the record is unchanged.
    pub fn update_user(&self, user: User) {
        self.tx.send_if_modified(|current| match current {
            Some(auth) if auth.user != user => {
                auth.user = user;
                true
            }
            _ => false,
        });
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id())
            .finish()
    }
}

// =============================================================================
// AuthService
// =============================================================================

/// Login, signup and logout against the backend.
///
/// On success the session is updated, saved to the [`SessionStore`] when one
/// is configured, and the Sentry user context is set.
#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
    session: Session,
    store: Option<SessionStore>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(api: ApiClient, session: Session, store: Option<SessionStore>) -> Self {
        Self {
            api,
            session,
            store,
        }
    }

    /// The session this service writes to.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Load the saved session into memory.
    ///
    /// A corrupt session file is logged and ignored.
    pub async fn restore(&self) -> Option<User> {
        let store = self.store.as_ref()?;
        match store.load().await {
            Ok(Some(auth)) => {
                let user = auth.user.clone();
                set_sentry_user(&user.id, Some(user.email.as_str()));
                self.session.set(auth);
                Some(user)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session file");
                None
            }
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the backend rejects the credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::WeakPassword("password is required".to_string()));
        }

        let response = self
            .api
            .login(&email, password)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(_) => AuthError::InvalidCredentials,
                other => AuthError::Api(other),
            })?;

        self.adopt(response).await
    }

    /// Register a new account and log into it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::InvalidName` if the name is too short.
    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        validate_password(password.expose_secret())?;

        let response = self.api.signup(name, &email, password, role).await?;
        self.adopt(response).await
    }

    /// Re-validate the token with `GET /auth/me` and refresh the user record.
    ///
    /// A failed validation never logs the user out: the error is logged and
    /// the current user is returned unchanged.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Option<User> {
        if !self.session.is_authenticated() {
            return None;
        }

        match self.api.me().await {
            Ok(Some(user)) => {
                self.session.update_user(user);
                self.persist().await;
            }
            Ok(None) => warn!("Ignoring unusable /auth/me response"),
            Err(e) => warn!(error = %e, "Session validation failed, keeping session"),
        }
        self.session.user()
    }

    /// Log out and forget the saved session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the session file cannot be removed.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(user_id) = self.session.user_id() {
            info!(user_id = %user_id, "Logging out");
        }
        self.session.clear();
        clear_sentry_user();
        if let Some(store) = &self.store {
            store.clear().await?;
        }
        Ok(())
    }

    async fn adopt(&self, response: AuthResponse) -> Result<User, AuthError> {
        let user = convert_auth_user(&response).ok_or(AuthError::InvalidResponse)?;
        let auth = AuthUser::new(user.clone(), SecretString::from(response.access_token));

        self.session.set(auth);
        self.persist().await;
        set_sentry_user(&user.id, Some(user.email.as_str()));
        info!(user_id = %user.id, role = %user.role, "Logged in");
        Ok(user)
    }

    /// Save the current session; failures only lose persistence.
    async fn persist(&self) {
        let (Some(store), Some(auth)) = (&self.store, self.session.current()) else {
            return;
        };
        if let Err(e) = store.save(&auth).await {
            warn!(error = %e, "Failed to save session");
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(AuthError::InvalidName(format!(
            "name must be at least {MIN_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}
