//! Statistics and ordering over all of a user's carts.

use std::cmp::Reverse;
use std::collections::HashMap;

use boutique_core::{Price, ProductId};

use crate::models::{CartSummary, Product};

/// How to order the cart list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CartSort {
    /// Newest first.
    #[default]
    Date,
    /// Most items first.
    Items,
    /// Highest value first.
    Value,
}

impl std::fmt::Display for CartSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Date => write!(f, "date"),
            Self::Items => write!(f, "items"),
            Self::Value => write!(f, "value"),
        }
    }
}

impl std::str::FromStr for CartSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "items" => Ok(Self::Items),
            "value" => Ok(Self::Value),
            _ => Err(format!("invalid sort: {s}")),
        }
    }
}

/// Totals across all carts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartStats {
    pub cart_count: usize,
    pub item_count: u32,
    pub empty_count: usize,
    pub total_value: Price,
}

/// Read-only view over a cart list, priced against a catalogue.
#[derive(Debug)]
pub struct CartOverview<'a> {
    carts: &'a [CartSummary],
    prices: HashMap<ProductId, Price>,
}

impl<'a> CartOverview<'a> {
    /// Build the overview. Products absent from `catalogue` count as free.
    #[must_use]
    pub fn new(carts: &'a [CartSummary], catalogue: &[Product]) -> Self {
        Self {
            carts,
            prices: catalogue.iter().map(|p| (p.id, p.price)).collect(),
        }
    }

    /// Value of one cart.
    #[must_use]
    pub fn value_of(&self, cart: &CartSummary) -> Price {
        cart.value(|id| self.prices.get(&id).copied())
    }

    /// Totals across every cart, empty ones included.
    #[must_use]
    pub fn stats(&self) -> CartStats {
        CartStats {
            cart_count: self.carts.len(),
            item_count: self.carts.iter().map(CartSummary::item_count).sum(),
            empty_count: self.carts.iter().filter(|c| c.is_empty()).count(),
            total_value: self.carts.iter().map(|c| self.value_of(c)).sum(),
        }
    }

    /// Carts in `sort` order, optionally without empty carts.
    ///
    /// Ties fall back to newest first.
    #[must_use]
    pub fn sorted(&self, sort: CartSort, hide_empty: bool) -> Vec<&'a CartSummary> {
        let mut carts: Vec<&CartSummary> = self
            .carts
            .iter()
            .filter(|c| !(hide_empty && c.is_empty()))
            .collect();

        carts.sort_by_key(|c| Reverse(c.recency_key()));
        match sort {
            CartSort::Date => {}
            CartSort::Items => carts.sort_by_key(|c| Reverse(c.item_count())),
            CartSort::Value => carts.sort_by_key(|c| Reverse(self.value_of(c).amount)),
        }
        carts
    }
}
