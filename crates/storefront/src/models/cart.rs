//! Cart domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boutique_core::{CartId, Price, ProductId, UserId};

use super::product::Product;

/// Largest quantity a cart line can hold; the backend stores it as `i32`.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// A line of the displayed cart: a hydrated product and a positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Create a new cart item.
    #[must_use]
    pub const fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }

    /// Unit price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// A line of a server-side cart. The backend only stores the product id
/// and the quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A cart owned by the current user, as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    /// Backend cart ID.
    pub id: CartId,
    /// Owning user.
    pub owner: UserId,
    /// Product/quantity pairs.
    pub entries: Vec<CartEntry>,
    /// When the cart was created, if the backend reports it.
    pub created_at: Option<DateTime<Utc>>,
}

impl CartSummary {
    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.entries
            .iter()
            .fold(0, |count, e| count.saturating_add(e.quantity))
    }

    /// Whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.quantity == 0)
    }

    /// Value of the cart given a unit price lookup. Products the lookup
    /// does not know count as zero.
    pub fn value<F>(&self, price_of: F) -> Price
    where
        F: Fn(ProductId) -> Option<Price>,
    {
        self.entries
            .iter()
            .filter_map(|e| price_of(e.product_id).map(|p| p.times(e.quantity)))
            .sum()
    }

    /// Ordering key for "most recent": creation time first (undated carts
    /// sort before dated ones), then id.
    #[must_use]
    pub fn recency_key(&self) -> (Option<DateTime<Utc>>, CartId) {
        (self.created_at, self.id)
    }
}

/// Most recent cart in `carts`, ignoring `excluded`.
#[must_use]
pub fn most_recent(carts: &[CartSummary], excluded: Option<CartId>) -> Option<&CartSummary> {
    carts
        .iter()
        .filter(|c| Some(c.id) != excluded)
        .max_by_key(|c| c.recency_key())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use boutique_core::CurrencyCode;

    use super::*;

    fn summary(id: i32, created_at: Option<DateTime<Utc>>, entries: &[(i32, u32)]) -> CartSummary {
        CartSummary {
            id: CartId::new(id),
            owner: UserId::new(1),
            entries: entries
                .iter()
                .map(|&(p, q)| CartEntry {
                    product_id: ProductId::new(p),
                    quantity: q,
                })
                .collect(),
            created_at,
        }
    }

    #[test]
    fn test_item_count_and_empty() {
        let cart = summary(1, None, &[(1, 2), (2, 3)]);
        assert_eq!(cart.item_count(), 5);
        assert!(!cart.is_empty());
        assert!(summary(2, None, &[]).is_empty());
    }

    #[test]
    fn test_item_count_saturates() {
        let cart = summary(1, None, &[(1, u32::MAX), (2, 7)]);
        assert_eq!(cart.item_count(), u32::MAX);
    }

    #[test]
    fn test_value_with_lookup() {
        let cart = summary(1, None, &[(1, 2), (2, 1), (3, 4)]);
        let value = cart.value(|id| match id.as_i32() {
            1 => Some(Price::from_cents(1000, CurrencyCode::EUR)),
            2 => Some(Price::from_cents(500, CurrencyCode::EUR)),
            _ => None,
        });
        assert_eq!(value, Price::from_cents(2500, CurrencyCode::EUR));
    }

    #[test]
    fn test_most_recent_prefers_dates_then_ids() {
        let older = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let carts = vec![
            summary(10, None, &[]),
            summary(3, Some(newer), &[]),
            summary(7, Some(older), &[]),
        ];

        assert_eq!(most_recent(&carts, None).unwrap().id, CartId::new(3));
        assert_eq!(
            most_recent(&carts, Some(CartId::new(3))).unwrap().id,
            CartId::new(7)
        );
    }

    #[test]
    fn test_most_recent_without_dates_uses_highest_id() {
        let carts = vec![summary(2, None, &[]), summary(5, None, &[])];
        assert_eq!(most_recent(&carts, None).unwrap().id, CartId::new(5));
        assert!(most_recent(&[summary(2, None, &[])], Some(CartId::new(2))).is_none());
    }
}
