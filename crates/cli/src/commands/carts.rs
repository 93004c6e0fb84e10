//! Multi-cart commands and checkout.

use boutique_core::CartId;
use boutique_storefront::cart::{CartOverview, CartSort};
use boutique_storefront::config::StorefrontConfig;
use tracing::warn;

use super::{CommandError, connect, require_user};
use crate::output;

/// List all carts with their totals.
pub async fn list(
    config: StorefrontConfig,
    sort: CartSort,
    hide_empty: bool,
) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;

    let carts = state.cart().load_all_carts().await?;
    let products = match state.catalog().products().await {
        Ok(products) => products.to_vec(),
        Err(e) => {
            warn!(error = %e, "Catalogue unavailable, cart values shown as zero");
            Vec::new()
        }
    };

    let overview = CartOverview::new(&carts, &products);
    let current = state.cart().snapshot().current_cart_id;
    output::carts(&overview, sort, hide_empty, current);
    Ok(())
}

/// Make another cart current.
pub async fn switch(config: StorefrontConfig, cart_id: CartId) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;

    state.cart().switch_to_cart(cart_id).await?;
    output::cart(&state.cart().snapshot());
    Ok(())
}

/// Create an empty cart and make it current.
pub async fn create(config: StorefrontConfig) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;

    let cart_id = state.cart().create_new_cart().await?;
    output::message(&format!("Created cart #{cart_id}."));
    Ok(())
}

/// Delete a cart.
pub async fn delete(config: StorefrontConfig, cart_id: CartId) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;

    state.cart().delete_cart(cart_id).await?;
    output::message(&format!("Deleted cart #{cart_id}."));
    output::cart(&state.cart().snapshot());
    Ok(())
}

/// Order the current cart.
pub async fn checkout(config: StorefrontConfig) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;

    let order = state.cart().create_order_from_current_cart().await?;
    output::order(&order);
    output::cart(&state.cart().snapshot());
    Ok(())
}
