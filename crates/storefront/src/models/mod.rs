//! Domain models for the storefront client.
//!
//! These types are separate from the wire types in [`crate::api::types`]:
//! they carry typed ids and decimal prices, and are what the cart module
//! and its consumers work with.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{CartEntry, CartItem, CartSummary};
pub use order::{Order, OrderLine};
pub use product::{Brand, Category, Product};
pub use user::{AuthUser, User};
