//! Current-cart commands.

use std::num::NonZeroU32;

use boutique_core::ProductId;
use boutique_storefront::config::StorefrontConfig;

use super::{CommandError, connect, require_user, settled};
use crate::output;

/// Show the current cart.
pub async fn show(config: StorefrontConfig) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;
    output::cart(&state.cart().snapshot());
    Ok(())
}

/// Add `quantity` units of a product.
pub async fn add(
    config: StorefrontConfig,
    product_id: ProductId,
    quantity: u32,
) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;

    let product = state
        .catalog()
        .product(product_id)
        .await?
        .ok_or(CommandError::UnknownProduct(product_id))?;
    let Some(quantity) = NonZeroU32::new(quantity) else {
        output::cart(&state.cart().snapshot());
        return Ok(());
    };

    settled(state.cart().add_items(product, quantity), "add the product").await?;
    output::cart(&state.cart().snapshot());
    Ok(())
}

/// Remove a product.
pub async fn remove(config: StorefrontConfig, product_id: ProductId) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;

    settled(state.cart().remove_item(product_id), "remove the product").await?;
    output::cart(&state.cart().snapshot());
    Ok(())
}

/// Set the quantity of a product.
pub async fn set(
    config: StorefrontConfig,
    product_id: ProductId,
    quantity: i64,
) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;

    settled(
        state.cart().update_quantity(product_id, quantity),
        "update the quantity",
    )
    .await?;
    output::cart(&state.cart().snapshot());
    Ok(())
}

/// Empty the current cart.
pub async fn clear(config: StorefrontConfig) -> Result<(), CommandError> {
    let state = connect(config).await?;
    require_user(&state)?;

    settled(state.cart().clear_cart(), "clear the cart").await?;
    output::cart(&state.cart().snapshot());
    Ok(())
}
