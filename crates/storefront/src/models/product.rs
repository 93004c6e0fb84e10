//! Catalogue domain types.

use serde::{Deserialize, Serialize};

use boutique_core::{BrandId, CategoryId, Price, ProductId};

/// Name shown for a cart item whose product could not be found.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown product";

/// Brand shown for a cart item whose product could not be found.
pub const UNKNOWN_BRAND_NAME: &str = "Unknown";

/// A product as displayed in the catalogue and in carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Brand name.
    pub brand: String,
    /// Category name.
    pub category: String,
    /// Unit price.
    pub price: Price,
    /// Units in stock.
    pub stock: u32,
    /// Long description, if any.
    pub description: Option<String>,
    /// Path of the product image (QR code or photo) on the API host.
    pub image_path: Option<String>,
}

impl Product {
    /// Build the degraded display entry used when hydration cannot join a
    /// cart line with the catalogue.
    #[must_use]
    pub fn placeholder(id: ProductId) -> Self {
        Self {
            id,
            name: UNKNOWN_PRODUCT_NAME.to_string(),
            brand: UNKNOWN_BRAND_NAME.to_string(),
            category: String::new(),
            price: Price::zero(),
            stock: 0,
            description: None,
            image_path: None,
        }
    }

    /// Whether this is a hydration placeholder rather than catalogue data.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.name == UNKNOWN_PRODUCT_NAME && self.price.is_zero() && self.stock == 0
    }

    /// Whether at least one unit is in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let product = Product::placeholder(ProductId::new(9));
        assert_eq!(product.id, ProductId::new(9));
        assert!(product.is_placeholder());
        assert!(!product.in_stock());
        assert!(product.price.is_zero());
    }
}
