//! Boutique REST API client.
//!
//! Thin `reqwest` wrapper over the backend's JSON endpoints. Authenticated
//! calls read the bearer token from the shared [`Session`] at send time, so
//! a login or logout is picked up by every clone of the client.
//!
//! Every request carries a fresh `x-request-id` header for correlating
//! client logs with backend logs.

mod conversions;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use boutique_core::{CartId, Email, ProductId, Role};

use crate::auth::Session;
use crate::config::StorefrontConfig;
use crate::models::{Brand, CartSummary, Category, Order, Product, User};

pub(crate) use conversions::convert_auth_user;
use conversions::{
    convert_brand, convert_cart, convert_category, convert_me, convert_order, convert_product,
};
use types::{
    AddItemRequest, ApiBrand, ApiCart, ApiCategory, ApiOrder, ApiProduct, AuthResponse,
    LoginRequest, MeResponse, SetQuantityRequest, SignupRequest,
};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Errors that can occur when calling the Boutique API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing, expired or insufficient credentials (401/403).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404), e.g. a stale cart id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether the error means the session is no longer accepted.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether the error means the backend could not be reached at all.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Boutique REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client bound to `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig, session: Session) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_base().to_string(),
                session,
            }),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The session whose token authenticates requests.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}{path}", self.inner.base_url))
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string())
    }

    /// Build a request carrying the session's bearer token.
    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token: SecretString = self
            .inner
            .session
            .bearer_token()
            .ok_or_else(|| ApiError::Unauthorized("not logged in".to_string()))?;
        Ok(self.request(method, path).bearer_auth(token.expose_secret()))
    }

    /// Send a request and return the body of a successful response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }
        Err(map_status(status, retry_after.as_deref(), &body))
    }

    /// Send a request and decode the JSON body.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Boutique API response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for wrong credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        self.execute_json(self.request(Method::POST, "/auth/login").json(&body))
            .await
    }

    /// Create an account and return its bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` when the backend refuses the account
    /// (e.g. the email is already registered).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn signup(
        &self,
        name: &str,
        email: &Email,
        password: &SecretString,
        role: Role,
    ) -> Result<AuthResponse, ApiError> {
        let role = role.to_string();
        let body = SignupRequest {
            nom: name,
            email: email.as_str(),
            password: password.expose_secret(),
            role: &role,
        };
        self.execute_json(self.request(Method::POST, "/auth/signup").json(&body))
            .await
    }

    /// Fetch the identity behind the session token.
    ///
    /// Returns `Ok(None)` if the backend answered with an unusable identity.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is missing or expired.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<Option<User>, ApiError> {
        let me: MeResponse = self
            .execute_json(self.authorized(Method::GET, "/auth/me")?)
            .await?;
        Ok(convert_me(me))
    }

    // =========================================================================
    // Catalogue
    // =========================================================================

    /// Fetch the full product list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let products: Vec<ApiProduct> = self
            .execute_json(self.request(Method::GET, "/products"))
            .await?;
        debug!(count = products.len(), "Fetched products");
        Ok(products.into_iter().map(convert_product).collect())
    }

    /// Fetch all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let categories: Vec<ApiCategory> = self
            .execute_json(self.request(Method::GET, "/categories"))
            .await?;
        Ok(categories.into_iter().map(convert_category).collect())
    }

    /// Fetch all brands.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_brands(&self) -> Result<Vec<Brand>, ApiError> {
        let brands: Vec<ApiBrand> = self
            .execute_json(self.request(Method::GET, "/brands"))
            .await?;
        Ok(brands.into_iter().map(convert_brand).collect())
    }

    // =========================================================================
    // Carts
    // =========================================================================

    /// List the carts owned by the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_my_carts(&self) -> Result<Vec<CartSummary>, ApiError> {
        let carts: Vec<ApiCart> = self
            .execute_json(self.authorized(Method::GET, "/carts/me")?)
            .await?;
        Ok(carts.into_iter().map(convert_cart).collect())
    }

    /// Fetch one cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the cart no longer exists.
    #[instrument(skip(self), fields(cart_id = %id))]
    pub async fn get_cart(&self, id: CartId) -> Result<CartSummary, ApiError> {
        let cart: ApiCart = self
            .execute_json(self.authorized(Method::GET, &format!("/carts/{id}"))?)
            .await?;
        Ok(convert_cart(cart))
    }

    /// Add to whichever cart the backend considers active for the user.
    ///
    /// Returns the cart when the backend echoes it back; older backends
    /// only acknowledge the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_active_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartSummary>, ApiError> {
        let body = AddItemRequest {
            id_produit: product_id,
            quantite: quantity,
        };
        let response = self
            .execute(self.authorized(Method::POST, "/cart/add")?.json(&body))
            .await?;
        Ok(serde_json::from_str::<ApiCart>(&response)
            .ok()
            .map(convert_cart))
    }

    /// Add `quantity` units of a product to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSummary, ApiError> {
        let body = AddItemRequest {
            id_produit: product_id,
            quantite: quantity,
        };
        let cart: ApiCart = self
            .execute_json(
                self.authorized(Method::POST, &format!("/carts/{cart_id}/items"))?
                    .json(&body),
            )
            .await?;
        Ok(convert_cart(cart))
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSummary, ApiError> {
        let body = SetQuantityRequest { quantite: quantity };
        let cart: ApiCart = self
            .execute_json(
                self.authorized(
                    Method::PUT,
                    &format!("/carts/{cart_id}/items/{product_id}"),
                )?
                .json(&body),
            )
            .await?;
        Ok(convert_cart(cart))
    }

    /// Remove a line from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        self.execute(self.authorized(
            Method::DELETE,
            &format!("/carts/{cart_id}/items/{product_id}"),
        )?)
        .await?;
        Ok(())
    }

    /// Empty a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn clear_cart(&self, cart_id: CartId) -> Result<(), ApiError> {
        self.execute(self.authorized(Method::POST, &format!("/carts/{cart_id}/clear"))?)
            .await?;
        Ok(())
    }

    /// Create an empty cart for the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<CartSummary, ApiError> {
        let cart: ApiCart = self
            .execute_json(self.authorized(Method::POST, "/carts")?)
            .await?;
        Ok(convert_cart(cart))
    }

    /// Delete a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn delete_cart(&self, cart_id: CartId) -> Result<(), ApiError> {
        self.execute(self.authorized(Method::DELETE, &format!("/carts/{cart_id}"))?)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Turn a cart into an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn create_order_from_cart(&self, cart_id: CartId) -> Result<Order, ApiError> {
        let order: ApiOrder = self
            .execute_json(self.authorized(Method::POST, &format!("/orders/from-cart/{cart_id}"))?)
            .await?;
        if order.items.is_empty() {
            warn!(cart_id = %cart_id, "Order created without lines");
        }
        Ok(convert_order(order))
    }
}

/// Error for a non-success `status`. Rate limits wait for the Retry-After
/// seconds, defaulting to 1.
fn map_status(status: StatusCode, retry_after: Option<&str>, body: &str) -> ApiError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let seconds = retry_after
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(1);
        return ApiError::RateLimited(seconds);
    }

    let detail = error_detail(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            debug!(status = %status, detail = %detail, "Request rejected");
            ApiError::Unauthorized(detail)
        }
        StatusCode::NOT_FOUND => ApiError::NotFound(detail),
        _ => {
            error!(status = %status, body = %detail, "Boutique API returned non-success status");
            ApiError::Status {
                status: status.as_u16(),
                body: detail,
            }
        }
    }
}

/// Extract a readable message from an error body.
///
/// The backend wraps errors as `{"detail": "..."}`; anything else is
/// truncated to 200 characters.
fn error_detail(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Detail {
        detail: serde_json::Value,
    }

    match serde_json::from_str::<Detail>(body) {
        Ok(Detail {
            detail: serde_json::Value::String(message),
        }) => message,
        Ok(Detail { detail }) => detail.to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_string() {
        assert_eq!(
            error_detail(r#"{"detail": "Invalid credentials"}"#),
            "Invalid credentials"
        );
    }

    #[test]
    fn test_error_detail_validation_list() {
        let detail = error_detail(r#"{"detail": [{"loc": ["body", "email"]}]}"#);
        assert!(detail.contains("email"));
    }

    #[test]
    fn test_error_detail_plain_text_truncated() {
        let body = "x".repeat(500);
        assert_eq!(error_detail(&body).len(), 200);
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_rate_limit_uses_retry_after() {
        let err = map_status(StatusCode::TOO_MANY_REQUESTS, Some("30"), "");
        assert!(matches!(err, ApiError::RateLimited(30)));

        for header in [None, Some("soon")] {
            let err = map_status(StatusCode::TOO_MANY_REQUESTS, header, "");
            assert!(matches!(err, ApiError::RateLimited(1)));
        }
    }

    #[test]
    fn test_auth_statuses_are_unauthorized() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = map_status(status, None, r#"{"detail": "Token expired"}"#);
            assert!(matches!(err, ApiError::Unauthorized(ref d) if d == "Token expired"));
        }
    }

    #[test]
    fn test_not_found_status() {
        let err = map_status(StatusCode::NOT_FOUND, None, r#"{"detail": "Panier introuvable"}"#);
        assert!(matches!(err, ApiError::NotFound(ref d) if d == "Panier introuvable"));
    }

    #[test]
    fn test_other_statuses_keep_code() {
        let err = map_status(StatusCode::BAD_GATEWAY, Some("5"), "Bad Gateway");
        assert!(matches!(
            err,
            ApiError::Status { status: 502, ref body } if body == "Bad Gateway"
        ));
    }

    #[test]
    fn test_error_predicates() {
        assert!(ApiError::Unauthorized("expired".to_string()).is_unauthorized());
        assert!(
            !ApiError::Status {
                status: 500,
                body: String::new()
            }
            .is_unauthorized()
        );
        assert!(!ApiError::NotFound("cart".to_string()).is_unreachable());
    }

    #[test]
    fn test_client_debug_hides_session() {
        let config = StorefrontConfig::for_api("http://localhost:8000/").unwrap();
        let client = ApiClient::new(&config, Session::new()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert!(format!("{client:?}").contains("localhost:8000"));
    }

    #[tokio::test]
    async fn test_authorized_call_without_session() {
        let config = StorefrontConfig::for_api("http://localhost:8000").unwrap();
        let client = ApiClient::new(&config, Session::new()).unwrap();
        let err = client.list_my_carts().await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
