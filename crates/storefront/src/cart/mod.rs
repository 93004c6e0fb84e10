//! Client-side cart: local state, optimistic sync and the multi-cart workflow.
//!
//! # Architecture
//!
//! - [`state`] - Pure reducer over [`CartState`]
//! - [`service`] - [`CartService`], which owns the state and talks to a [`CartBackend`]
//! - [`hydrate`] - Joins server cart lines with the product catalogue
//! - [`overview`] - Statistics and sorting over all carts
//! - [`snapshot`] - Per-user offline copy of the current cart
//!
//! Every item mutation is applied locally first and returns a [`SyncHandle`]
//! that resolves once the server call settled.

pub mod backend;
pub mod error;
pub mod hydrate;
pub mod overview;
pub mod service;
pub mod snapshot;
pub mod state;
pub mod sync;

pub use backend::CartBackend;
pub use error::CartError;
pub use hydrate::hydrate;
pub use overview::{CartOverview, CartSort, CartStats};
pub use service::{CartService, SessionBinding};
pub use snapshot::{CartSnapshot, SnapshotStore};
pub use state::{CartAction, CartPhase, CartState, reduce};
pub use sync::{SyncHandle, SyncOutcome};
