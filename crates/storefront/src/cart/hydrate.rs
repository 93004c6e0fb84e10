//! Turn server cart lines into displayable items.
//!
//! The backend stores only product id and quantity per line, so every
//! loaded cart is joined against a freshly fetched catalogue. A failed
//! fetch or an unknown product degrades to a placeholder instead of
//! failing the load.

use std::collections::HashMap;

use tracing::warn;

use boutique_core::ProductId;

use crate::catalog::Catalog;
use crate::models::{CartEntry, CartItem, CartSummary, Product};

/// Join cart lines with `catalogue`.
///
/// Lines for the same product are merged and non-positive quantities are
/// dropped. With `catalogue == None` every item is a placeholder.
#[must_use]
pub fn hydrate(entries: &[CartEntry], catalogue: Option<&[Product]>) -> Vec<CartItem> {
    let by_id: HashMap<ProductId, &Product> = catalogue
        .unwrap_or_default()
        .iter()
        .map(|p| (p.id, p))
        .collect();

    let mut items: Vec<CartItem> = Vec::with_capacity(entries.len());
    for entry in entries.iter().filter(|e| e.quantity > 0) {
        if let Some(item) = items.iter_mut().find(|i| i.product.id == entry.product_id) {
            item.quantity = item.quantity.saturating_add(entry.quantity);
            continue;
        }
        let product = by_id.get(&entry.product_id).map_or_else(
            || {
                if catalogue.is_some() {
                    warn!(product_id = %entry.product_id, "Cart references unknown product");
                }
                Product::placeholder(entry.product_id)
            },
            |p| (*p).clone(),
        );
        items.push(CartItem::new(product, entry.quantity));
    }
    items
}

/// Hydrate `cart` against a fresh catalogue fetch.
pub async fn hydrate_cart(catalog: &Catalog, cart: &CartSummary) -> Vec<CartItem> {
    if cart.entries.is_empty() {
        return Vec::new();
    }
    match catalog.products_fresh().await {
        Ok(products) => hydrate(&cart.entries, Some(products.as_slice())),
        Err(e) => {
            warn!(
                cart_id = %cart.id,
                error = %e,
                "Catalogue unavailable, showing placeholder items"
            );
            hydrate(&cart.entries, None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::{CurrencyCode, Price};

    use crate::models::product::{UNKNOWN_BRAND_NAME, UNKNOWN_PRODUCT_NAME};

    use super::*;

    fn entry(product: i32, quantity: u32) -> CartEntry {
        CartEntry {
            product_id: ProductId::new(product),
            quantity,
        }
    }

    fn product(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: "Enceinte".to_string(),
            brand: "Sonor".to_string(),
            category: "Audio".to_string(),
            price: Price::from_cents(4_500, CurrencyCode::EUR),
            stock: 2,
            description: None,
            image_path: None,
        }
    }

    #[test]
    fn test_hydrate_joins_catalogue() {
        let items = hydrate(&[entry(1, 2)], Some(&[product(1), product(2)]));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product.name, "Enceinte");
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn test_unknown_product_becomes_placeholder() {
        let items = hydrate(&[entry(1, 1), entry(7, 3)], Some(&[product(1)]));
        assert_eq!(items.len(), 2);
        let missing = &items[1];
        assert!(missing.product.is_placeholder());
        assert_eq!(missing.product.name, UNKNOWN_PRODUCT_NAME);
        assert_eq!(missing.product.brand, UNKNOWN_BRAND_NAME);
        assert!(missing.product.price.is_zero());
        assert_eq!(missing.product.stock, 0);
        assert_eq!(missing.quantity, 3);
    }

    #[test]
    fn test_without_catalogue_everything_is_placeholder() {
        let items = hydrate(&[entry(1, 1), entry(2, 1)], None);
        assert!(items.iter().all(|i| i.product.is_placeholder()));
    }

    #[test]
    fn test_duplicate_lines_merge_and_zero_lines_drop() {
        let items = hydrate(
            &[entry(1, 1), entry(2, 0), entry(1, 4)],
            Some(&[product(1), product(2)]),
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
    }
}
