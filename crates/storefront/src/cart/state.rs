//! Cart state and its pure reducer.
//!
//! [`reduce`] is the only place item lists change. It performs no I/O; the
//! effect layer in [`super::service`] decides which actions to dispatch and
//! which network calls to make around them.

use serde::{Deserialize, Serialize};

use boutique_core::{CartId, Price, ProductId, UserId};

use crate::models::cart::MAX_LINE_QUANTITY;
use crate::models::{CartItem, CartSummary, Product};

/// Lifecycle of the cart state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartPhase {
    /// No session has been bound yet, or the user logged out.
    #[default]
    Uninitialized,
    /// A session bind or cart switch is in flight.
    Loading,
    /// Items reflect a loaded (or locally built) cart.
    Ready,
}

/// Everything a cart view displays.
///
/// `total` and `item_count` are derived from `items` after every item
/// mutation and never updated incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub total: Price,
    pub item_count: u32,
    pub is_open: bool,
    pub current_cart_id: Option<CartId>,
    pub all_carts: Vec<CartSummary>,
    pub phase: CartPhase,
    /// User the state belongs to.
    pub owner: Option<UserId>,
    /// Bumped by every item-list mutation.
    pub revision: u64,
}

impl CartState {
    /// The line for `product_id`, if present.
    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.id == product_id)
    }

    /// Quantity of `product_id` in the cart (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.item(product_id).map_or(0, |i| i.quantity)
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Summary of the current cart from the last cart listing.
    #[must_use]
    pub fn current_summary(&self) -> Option<&CartSummary> {
        let id = self.current_cart_id?;
        self.all_carts.iter().find(|c| c.id == id)
    }

    fn set_items(&mut self, items: Vec<CartItem>) {
        self.items = items;
        self.items_changed();
    }

    fn items_changed(&mut self) {
        self.items.retain(|i| i.quantity > 0);
        self.total = self.items.iter().map(CartItem::line_total).sum();
        self.item_count = self
            .items
            .iter()
            .fold(0, |count, i| count.saturating_add(i.quantity));
        self.revision += 1;
    }
}

/// Intents the reducer understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add `quantity` units of a product, merging with an existing line.
    AddItem { product: Product, quantity: u32 },
    /// Drop the line for a product.
    RemoveItem(ProductId),
    /// Set the quantity of an existing line; non-positive removes it.
    UpdateQuantity { product_id: ProductId, quantity: i64 },
    /// Empty the item list.
    Clear,
    /// Replace the items with a loaded cart and mark the state ready.
    Load {
        cart_id: Option<CartId>,
        items: Vec<CartItem>,
    },
    /// Put back an earlier item list after a failed sync.
    Restore(Vec<CartItem>),
    /// Replace the list of the user's carts.
    SetCarts(Vec<CartSummary>),
    /// Change the current cart without touching the items.
    SetCurrent(Option<CartId>),
    SetPhase(CartPhase),
    /// Discard everything and start over for `owner`.
    Reset { owner: Option<UserId> },
    Open,
    Close,
}

/// `quantity` clamped to what a cart line can hold.
pub(crate) fn line_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(0)).map_or(MAX_LINE_QUANTITY, |q| q.min(MAX_LINE_QUANTITY))
}

/// Apply `action` to `state`.
#[must_use]
pub fn reduce(mut state: CartState, action: CartAction) -> CartState {
    match action {
        CartAction::AddItem { product, quantity } => {
            if quantity == 0 {
                return state;
            }
            match state.items.iter_mut().find(|i| i.product.id == product.id) {
                Some(item) => {
                    item.quantity = item.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
                }
                None => state
                    .items
                    .push(CartItem::new(product, quantity.min(MAX_LINE_QUANTITY))),
            }
            state.items_changed();
        }
        CartAction::RemoveItem(product_id) => {
            if state.item(product_id).is_some() {
                state.items.retain(|i| i.product.id != product_id);
                state.items_changed();
            }
        }
        CartAction::UpdateQuantity {
            product_id,
            quantity,
        } => {
            if let Some(item) = state.items.iter_mut().find(|i| i.product.id == product_id) {
                item.quantity = line_quantity(quantity);
                state.items_changed();
            }
        }
        CartAction::Clear => state.set_items(Vec::new()),
        CartAction::Load { cart_id, items } => {
            state.current_cart_id = cart_id;
            state.phase = CartPhase::Ready;
            state.set_items(items);
        }
        CartAction::Restore(items) => state.set_items(items),
        CartAction::SetCarts(carts) => state.all_carts = carts,
        CartAction::SetCurrent(cart_id) => state.current_cart_id = cart_id,
        CartAction::SetPhase(phase) => state.phase = phase,
        CartAction::Reset { owner } => {
            // Revision keeps counting so syncs from before the reset never
            // match a later state.
            let revision = state.revision + 1;
            state = CartState {
                owner,
                revision,
                ..CartState::default()
            };
        }
        CartAction::Open => state.is_open = true,
        CartAction::Close => state.is_open = false,
    }
    state
}
