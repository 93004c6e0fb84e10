//! Application state shared by every front end.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiError};
use crate::auth::{AuthService, Session, SessionStore};
use crate::cart::{CartService, SnapshotStore};
use crate::catalog::Catalog;
use crate::config::StorefrontConfig;

/// Wired-up storefront services.
///
/// This struct is cheaply cloneable via `Arc`. Every clone shares the same
/// session, catalogue cache and cart state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    auth: AuthService,
    catalog: Catalog,
    cart: CartService,
}

impl AppState {
    /// Create the application state.
    ///
    /// Persistence of the session and cart snapshots is enabled when
    /// `config.state_dir` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let session = Session::new();
        let api = ApiClient::new(&config, session.clone())?;

        let session_store = config.state_dir.as_deref().map(SessionStore::new);
        let snapshots = config.state_dir.as_deref().map(SnapshotStore::new);

        let auth = AuthService::new(api.clone(), session, session_store);
        let catalog = Catalog::new(Arc::new(api.clone()), config.catalog_ttl);
        let cart = CartService::new(Arc::new(api.clone()), catalog.clone(), snapshots);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                auth,
                catalog,
                cart,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the REST API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the logged-in user handle.
    #[must_use]
    pub fn session(&self) -> &Session {
        self.inner.auth.session()
    }

    /// Get a reference to the product catalogue.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Keep the cart bound to the session for the lifetime of the task.
    pub fn bind_cart_to_session(&self) -> JoinHandle<()> {
        self.inner.cart.watch_session(self.session())
    }
}
