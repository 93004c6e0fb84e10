//! Remote cart operations consumed by the cart service.

use async_trait::async_trait;

use boutique_core::{CartId, ProductId};

use crate::api::{ApiClient, ApiError};
use crate::models::{CartSummary, Order};

/// Server-side cart resource.
///
/// Implemented by [`ApiClient`]; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Carts owned by the logged-in user.
    async fn list_carts(&self) -> Result<Vec<CartSummary>, ApiError>;

    /// One cart with its product/quantity pairs.
    async fn get_cart(&self, cart_id: CartId) -> Result<CartSummary, ApiError>;

    /// Add to the user's active cart when the client has none selected.
    /// Returns the cart if the backend reports it.
    async fn add_to_active_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartSummary>, ApiError>;

    /// Add `quantity` units to a cart.
    async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// Set the quantity of a line (always positive).
    async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// Remove a line.
    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), ApiError>;

    /// Empty a cart.
    async fn clear_cart(&self, cart_id: CartId) -> Result<(), ApiError>;

    /// Allocate a new, empty cart.
    async fn create_cart(&self) -> Result<CartSummary, ApiError>;

    /// Delete a cart.
    async fn delete_cart(&self, cart_id: CartId) -> Result<(), ApiError>;

    /// Turn a cart into an order.
    async fn create_order(&self, cart_id: CartId) -> Result<Order, ApiError>;
}

#[async_trait]
impl CartBackend for ApiClient {
    async fn list_carts(&self) -> Result<Vec<CartSummary>, ApiError> {
        self.list_my_carts().await
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<CartSummary, ApiError> {
        Self::get_cart(self, cart_id).await
    }

    async fn add_to_active_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartSummary>, ApiError> {
        Self::add_to_active_cart(self, product_id, quantity).await
    }

    async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.add_to_cart(cart_id, product_id, quantity).await?;
        Ok(())
    }

    async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        Self::set_quantity(self, cart_id, product_id, quantity).await?;
        Ok(())
    }

    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), ApiError> {
        self.remove_from_cart(cart_id, product_id).await
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<(), ApiError> {
        Self::clear_cart(self, cart_id).await
    }

    async fn create_cart(&self) -> Result<CartSummary, ApiError> {
        Self::create_cart(self).await
    }

    async fn delete_cart(&self, cart_id: CartId) -> Result<(), ApiError> {
        Self::delete_cart(self, cart_id).await
    }

    async fn create_order(&self, cart_id: CartId) -> Result<Order, ApiError> {
        self.create_order_from_cart(cart_id).await
    }
}
