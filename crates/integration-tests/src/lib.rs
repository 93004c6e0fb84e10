//! Integration tests for the Boutique storefront client.
//!
//! # Running Tests
//!
//! The tests talk to a running Boutique API and are ignored by default.
//!
//! ```bash
//! BOUTIQUE_API_URL=http://localhost:8000 cargo test -p boutique-integration-tests -- --ignored
//! ```
//!
//! Every test signs up a throwaway account, so the API must allow signup.

use boutique_core::Role;
use boutique_storefront::config::StorefrontConfig;
use boutique_storefront::models::User;
use boutique_storefront::state::AppState;
use secrecy::SecretString;
use tempfile::TempDir;
use uuid::Uuid;

/// Base URL of the API under test.
#[must_use]
pub fn api_url() -> String {
    std::env::var("BOUTIQUE_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// A fresh client with its own state directory.
pub struct TestContext {
    pub state: AppState,
    pub state_dir: TempDir,
}

impl TestContext {
    /// Build a context against [`api_url`].
    ///
    /// # Panics
    ///
    /// Panics if the configuration or the state directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let state_dir = tempfile::tempdir().expect("Failed to create state directory");
        let state = Self::state_in(&state_dir);
        Self { state, state_dir }
    }

    /// Another client sharing this context's state directory, as a second
    /// CLI invocation would.
    #[must_use]
    pub fn reopen(&self) -> AppState {
        Self::state_in(&self.state_dir)
    }

    fn state_in(dir: &TempDir) -> AppState {
        let mut config = StorefrontConfig::for_api(&api_url()).expect("Invalid BOUTIQUE_API_URL");
        config.state_dir = Some(dir.path().to_path_buf());
        AppState::new(config).expect("Failed to build application state")
    }

    /// Sign up a throwaway client account and bind the cart to it.
    ///
    /// # Panics
    ///
    /// Panics if signup or the cart bind fails.
    pub async fn signup(&self) -> User {
        let email = format!("it-{}@boutique.test", Uuid::new_v4().simple());
        let password = SecretString::from("integration-secret");
        let user = self
            .state
            .auth()
            .signup("Integration", &email, &password, Role::Client)
            .await
            .expect("Signup failed");
        self.state
            .cart()
            .bind_session(Some(user.id))
            .await
            .expect("Cart bind failed");
        user
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
