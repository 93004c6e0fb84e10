//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boutique_core::{OrderId, OrderStatus, Price, ProductId, UserId};

/// An order created from a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Backend order ID (older backends omit it).
    pub id: Option<OrderId>,
    /// Ordering user.
    pub owner: UserId,
    /// Ordered lines with the unit price charged.
    pub lines: Vec<OrderLine>,
    /// Total charged.
    pub total: Price,
    /// Current status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Sum of ordered quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// A line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Price,
}
