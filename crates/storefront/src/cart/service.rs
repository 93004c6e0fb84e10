//! Cart service: optimistic mutations and the multi-cart workflow.
//!
//! Item mutations (add, remove, update, clear) change the local state
//! synchronously and return a [`SyncHandle`] for the server call. A failed
//! call is logged and undone, unless a newer local mutation or a cart change
//! happened in the meantime.
//!
//! Cart-level operations (switch, create, delete, checkout, session bind)
//! only touch state once the backend answered, and only if no newer
//! cart-level operation was started since.

use std::num::NonZeroU32;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use boutique_core::{CartId, ProductId, UserId};

use crate::api::ApiError;
use crate::auth::Session;
use crate::catalog::Catalog;
use crate::error::add_breadcrumb;
use crate::models::cart::most_recent;
use crate::models::{CartItem, CartSummary, Order, Product};

use super::backend::CartBackend;
use super::error::CartError;
use super::hydrate::hydrate_cart;
use super::snapshot::{CartSnapshot, SnapshotStore};
use super::state::{CartAction, CartPhase, CartState, line_quantity, reduce};
use super::sync::{Sequencer, SyncHandle, SyncOutcome};

/// Where the state came from after a session bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBinding {
    /// No user; the state was emptied.
    Anonymous,
    /// Carts were loaded from the backend.
    Backend,
    /// The backend was unavailable; the saved snapshot is displayed.
    Snapshot,
    /// The backend was unavailable and there was no snapshot.
    Empty,
}

/// Handle on the cart state and its synchronization.
///
/// Construct once and clone into whatever needs the cart. All clones share
/// the same state.
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartServiceInner>,
}

struct CartServiceInner {
    backend: Arc<dyn CartBackend>,
    catalog: Catalog,
    snapshots: Option<SnapshotStore>,
    state: watch::Sender<CartState>,
    tickets: Sequencer,
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("CartService")
            .field("owner", &state.owner)
            .field("current_cart_id", &state.current_cart_id)
            .field("items", &state.items.len())
            .finish_non_exhaustive()
    }
}

/// What an optimistic mutation changed, for a later rollback.
#[derive(Default)]
struct Mutation {
    before: Vec<CartItem>,
    revision: u64,
    changed: bool,
    cart_id: Option<CartId>,
    owner: Option<UserId>,
}

impl Mutation {
    /// Whether the mutation has to reach the server.
    const fn is_remote(&self) -> bool {
        self.changed && self.owner.is_some()
    }
}

fn apply(state: &mut CartState, action: CartAction) {
    *state = reduce(std::mem::take(state), action);
}

/// Make sure `cart` is listed, whatever the listing returned.
fn with_cart(mut carts: Vec<CartSummary>, cart: CartSummary) -> Vec<CartSummary> {
    if !carts.iter().any(|c| c.id == cart.id) {
        carts.push(cart);
    }
    carts
}

impl CartService {
    /// Create a service with an empty, unbound state.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CartBackend>,
        catalog: Catalog,
        snapshots: Option<SnapshotStore>,
    ) -> Self {
        let (state, _rx) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartServiceInner {
                backend,
                catalog,
                snapshots,
                state,
                tickets: Sequencer::default(),
            }),
        }
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// The catalogue used for hydration.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub(crate) fn dispatch(&self, action: CartAction) {
        self.inner.state.send_modify(|state| apply(state, action));
    }

    fn owner(&self) -> Option<UserId> {
        self.inner.state.borrow().owner
    }

    fn require_owner(&self) -> Result<UserId, CartError> {
        self.owner().ok_or(CartError::NotAuthenticated)
    }

    /// Apply `action` and record what is needed to undo it.
    fn mutate(&self, action: CartAction) -> Mutation {
        let mut mutation = Mutation::default();
        self.inner.state.send_modify(|state| {
            let before = state.items.clone();
            let revision = state.revision;
            apply(state, action);
            mutation = Mutation {
                before,
                revision: state.revision,
                changed: state.revision != revision,
                cart_id: state.current_cart_id,
                owner: state.owner,
            };
        });
        mutation
    }

    /// Apply `modify` only if `ticket` is still the newest cart-level request.
    fn commit(&self, ticket: u64, modify: impl FnOnce(&mut CartState)) -> bool {
        let tickets = &self.inner.tickets;
        self.inner.state.send_if_modified(|state| {
            if !tickets.is_current(ticket) {
                return false;
            }
            modify(state);
            true
        })
    }

    /// Pass `result` through, giving `ticket` back if the request failed so
    /// it does not supersede older requests still in flight.
    fn withdraw_on_error<T>(
        &self,
        ticket: u64,
        result: Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        if result.is_err() {
            self.inner.tickets.withdraw(ticket);
        }
        result
    }

    fn commit_or_superseded(
        &self,
        ticket: u64,
        modify: impl FnOnce(&mut CartState),
    ) -> Result<(), CartError> {
        if self.commit(ticket, modify) {
            Ok(())
        } else {
            debug!(ticket, "Discarding stale cart response");
            Err(CartError::Superseded)
        }
    }

    // =========================================================================
    // Item mutations
    // =========================================================================

    /// Add one unit of `product`.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item(&self, product: Product) -> SyncHandle {
        self.add_items(product, NonZeroU32::MIN)
    }

    /// Add `quantity` units of `product` with a single server call.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_items(&self, product: Product, quantity: NonZeroU32) -> SyncHandle {
        let product_id = product.id;
        let quantity = quantity.get();
        let mutation = self.mutate(CartAction::AddItem { product, quantity });

        let id = product_id.to_string();
        add_breadcrumb("cart", "Added item", Some(&[("product_id", id.as_str())]));

        if !mutation.is_remote() {
            return self.settle_locally();
        }

        let this = self.clone();
        SyncHandle::spawn(async move {
            let result = match mutation.cart_id {
                Some(cart_id) => {
                    this.inner
                        .backend
                        .add_item(cart_id, product_id, quantity)
                        .await
                }
                None => this.add_to_active_cart(&mutation, product_id, quantity).await,
            };
            this.settle(result, &mutation, "add").await
        })
    }

    /// Remove the line for `product_id`.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn remove_item(&self, product_id: ProductId) -> SyncHandle {
        let mutation = self.mutate(CartAction::RemoveItem(product_id));

        let id = product_id.to_string();
        add_breadcrumb("cart", "Removed item", Some(&[("product_id", id.as_str())]));

        let Some(cart_id) = mutation.cart_id.filter(|_| mutation.is_remote()) else {
            return self.settle_locally();
        };

        let this = self.clone();
        SyncHandle::spawn(async move {
            let result = this.inner.backend.remove_item(cart_id, product_id).await;
            this.settle(result, &mutation, "remove").await
        })
    }

    /// Set the quantity of the line for `product_id`.
    ///
    /// A non-positive quantity removes the line. Absent products are ignored.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn update_quantity(&self, product_id: ProductId, quantity: i64) -> SyncHandle {
        let mutation = self.mutate(CartAction::UpdateQuantity {
            product_id,
            quantity,
        });

        let Some(cart_id) = mutation.cart_id.filter(|_| mutation.is_remote()) else {
            return self.settle_locally();
        };

        let this = self.clone();
        SyncHandle::spawn(async move {
            let backend = &this.inner.backend;
            let result = if quantity > 0 {
                backend
                    .set_quantity(cart_id, product_id, line_quantity(quantity))
                    .await
            } else {
                backend.remove_item(cart_id, product_id).await
            };
            this.settle(result, &mutation, "update quantity").await
        })
    }

    /// Empty the current cart, then refresh the cart list.
    #[instrument(skip(self))]
    pub fn clear_cart(&self) -> SyncHandle {
        let mutation = self.mutate(CartAction::Clear);
        add_breadcrumb("cart", "Cleared cart", None);

        let Some(cart_id) = mutation.cart_id.filter(|_| mutation.is_remote()) else {
            return self.settle_locally();
        };

        let this = self.clone();
        SyncHandle::spawn(async move {
            let result = this.inner.backend.clear_cart(cart_id).await;
            if result.is_ok()
                && let Some(owner) = mutation.owner
                && let Err(e) = this.refresh_carts(owner).await
            {
                warn!(error = %e, "Failed to refresh carts after clear");
            }
            this.settle(result, &mutation, "clear").await
        })
    }

    /// Add through the generic endpoint and adopt the cart the backend used.
    async fn add_to_active_cart(
        &self,
        mutation: &Mutation,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let cart = self
            .inner
            .backend
            .add_to_active_cart(product_id, quantity)
            .await?;

        let carts = match self.inner.backend.list_carts().await {
            Ok(carts) => Some(carts),
            Err(e) => {
                warn!(error = %e, "Failed to refresh carts after add");
                None
            }
        };
        let adopted = cart
            .as_ref()
            .map(|c| c.id)
            .or_else(|| carts.as_deref().and_then(|c| most_recent(c, None)).map(|c| c.id));

        self.inner.state.send_if_modified(|state| {
            if state.owner != mutation.owner {
                return false;
            }
            let mut changed = false;
            if let Some(carts) = carts {
                let carts = match cart {
                    Some(cart) => with_cart(carts, cart),
                    None => carts,
                };
                apply(state, CartAction::SetCarts(carts));
                changed = true;
            }
            if state.current_cart_id.is_none() && adopted.is_some() {
                info!(cart_id = ?adopted, "Adopted cart created by first add");
                apply(state, CartAction::SetCurrent(adopted));
                changed = true;
            }
            changed
        });
        Ok(())
    }

    /// Resolve a server call: confirm, or undo the mutation if nothing newer
    /// happened since.
    async fn settle(
        &self,
        result: Result<(), ApiError>,
        mutation: &Mutation,
        operation: &'static str,
    ) -> SyncOutcome {
        let outcome = match result {
            Ok(()) => SyncOutcome::Confirmed,
            Err(e) => {
                warn!(
                    error = %e,
                    operation,
                    cart_id = ?mutation.cart_id,
                    "Cart sync failed"
                );
                self.rollback(mutation)
            }
        };
        self.save_snapshot().await;
        outcome
    }

    fn rollback(&self, mutation: &Mutation) -> SyncOutcome {
        let rolled_back = self.inner.state.send_if_modified(|state| {
            if state.revision != mutation.revision
                || state.current_cart_id != mutation.cart_id
                || state.owner != mutation.owner
            {
                return false;
            }
            apply(state, CartAction::Restore(mutation.before.clone()));
            true
        });

        if rolled_back {
            info!(cart_id = ?mutation.cart_id, "Rolled back cart change");
            SyncOutcome::RolledBack
        } else {
            SyncOutcome::Superseded
        }
    }

    /// A mutation with no server call still updates the offline snapshot.
    fn settle_locally(&self) -> SyncHandle {
        if self.inner.snapshots.is_some() && self.owner().is_some() {
            let this = self.clone();
            tokio::spawn(async move { this.save_snapshot().await });
        }
        SyncHandle::local()
    }

    async fn save_snapshot(&self) {
        let Some(store) = &self.inner.snapshots else {
            return;
        };
        let (owner, snapshot) = {
            let state = self.inner.state.borrow();
            (state.owner, CartSnapshot::of(&state))
        };
        let Some(owner) = owner else {
            return;
        };
        if let Err(e) = store.save(owner, &snapshot).await {
            warn!(error = %e, "Failed to save cart snapshot");
        }
    }

    // =========================================================================
    // Cart-level operations
    // =========================================================================

    /// Reload the list of the user's carts.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotAuthenticated` when no user is bound, or the
    /// backend error.
    #[instrument(skip(self))]
    pub async fn load_all_carts(&self) -> Result<Vec<CartSummary>, CartError> {
        let owner = self.require_owner()?;
        Ok(self.refresh_carts(owner).await?)
    }

    async fn refresh_carts(&self, owner: UserId) -> Result<Vec<CartSummary>, ApiError> {
        let carts = self.inner.backend.list_carts().await?;
        let listed = carts.clone();
        self.inner.state.send_if_modified(|state| {
            if state.owner != Some(owner) {
                return false;
            }
            apply(state, CartAction::SetCarts(listed));
            true
        });
        Ok(carts)
    }

    /// The user's carts, falling back to the last listing when the backend
    /// cannot be reached.
    async fn carts_or_cached(&self) -> Vec<CartSummary> {
        match self.inner.backend.list_carts().await {
            Ok(carts) => carts,
            Err(e) => {
                warn!(error = %e, "Failed to refresh carts, using last listing");
                self.inner.state.borrow().all_carts.clone()
            }
        }
    }

    /// Make `cart_id` the current cart.
    ///
    /// Either replaces the items with the hydrated cart and sets the current
    /// cart, or leaves the state untouched and returns the error.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the cart cannot be fetched, or
    /// `CartError::Superseded` if another cart request started meanwhile.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn switch_to_cart(&self, cart_id: CartId) -> Result<(), CartError> {
        self.require_owner()?;
        let ticket = self.inner.tickets.issue();

        let cart = self.withdraw_on_error(ticket, self.inner.backend.get_cart(cart_id).await)?;
        let items = hydrate_cart(&self.inner.catalog, &cart).await;

        self.commit_or_superseded(ticket, |state| {
            let carts = with_cart(std::mem::take(&mut state.all_carts), cart);
            apply(state, CartAction::SetCarts(carts));
            apply(
                state,
                CartAction::Load {
                    cart_id: Some(cart_id),
                    items,
                },
            );
        })?;

        let id = cart_id.to_string();
        add_breadcrumb("cart", "Switched cart", Some(&[("cart_id", id.as_str())]));
        self.save_snapshot().await;
        Ok(())
    }

    /// Create an empty cart and make it current.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the cart cannot be created.
    #[instrument(skip(self))]
    pub async fn create_new_cart(&self) -> Result<CartId, CartError> {
        self.require_owner()?;
        let ticket = self.inner.tickets.issue();

        let cart = self.withdraw_on_error(ticket, self.inner.backend.create_cart().await)?;
        let cart_id = cart.id;
        let carts = with_cart(self.carts_or_cached().await, cart);

        self.commit_or_superseded(ticket, |state| {
            apply(state, CartAction::SetCarts(carts));
            apply(
                state,
                CartAction::Load {
                    cart_id: Some(cart_id),
                    items: Vec::new(),
                },
            );
        })?;

        info!(cart_id = %cart_id, "Created cart");
        self.save_snapshot().await;
        Ok(cart_id)
    }

    /// Delete a cart.
    ///
    /// Deleting the current cart moves to the most recent remaining cart, or
    /// to no cart at all. The current cart never points at a deleted cart.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the deletion fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn delete_cart(&self, cart_id: CartId) -> Result<(), CartError> {
        self.require_owner()?;
        let ticket = self.inner.tickets.issue();

        self.withdraw_on_error(ticket, self.inner.backend.delete_cart(cart_id).await)?;
        info!(cart_id = %cart_id, "Deleted cart");

        let carts: Vec<CartSummary> = self
            .carts_or_cached()
            .await
            .into_iter()
            .filter(|c| c.id != cart_id)
            .collect();

        let was_current = self.inner.state.borrow().current_cart_id == Some(cart_id);
        let fallback = if was_current {
            Some(self.fallback_after(&carts, None).await)
        } else {
            None
        };

        let committed = self.commit(ticket, |state| {
            apply(state, CartAction::SetCarts(carts));
            if state.current_cart_id == Some(cart_id) {
                let (next, items) = fallback.unwrap_or((None, Vec::new()));
                apply(
                    state,
                    CartAction::Load {
                        cart_id: next,
                        items,
                    },
                );
            }
        });
        if committed {
            self.save_snapshot().await;
        } else {
            debug!("Cart list update after delete superseded");
        }
        Ok(())
    }

    /// Hydrated contents of the most recent cart in `carts` other than
    /// `excluded`. Uses the listed lines if the cart cannot be re-fetched.
    async fn fallback_after(
        &self,
        carts: &[CartSummary],
        excluded: Option<CartId>,
    ) -> (Option<CartId>, Vec<CartItem>) {
        let Some(next) = most_recent(carts, excluded) else {
            return (None, Vec::new());
        };

        let cart = match self.inner.backend.get_cart(next.id).await {
            Ok(cart) => cart,
            Err(e) => {
                warn!(cart_id = %next.id, error = %e, "Using listed lines for fallback cart");
                next.clone()
            }
        };
        (Some(next.id), hydrate_cart(&self.inner.catalog, &cart).await)
    }

    /// Place an order for the current cart, then move to the next most
    /// recent cart, creating one if none remain.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NoActiveCart` without a current cart, or the
    /// backend error if the order cannot be created.
    #[instrument(skip(self))]
    pub async fn create_order_from_current_cart(&self) -> Result<Order, CartError> {
        self.require_owner()?;
        let cart_id = self
            .inner
            .state
            .borrow()
            .current_cart_id
            .ok_or(CartError::NoActiveCart)?;
        let ticket = self.inner.tickets.issue();

        let order =
            self.withdraw_on_error(ticket, self.inner.backend.create_order(cart_id).await)?;
        info!(
            cart_id = %cart_id,
            order_id = ?order.id,
            total = %order.total,
            "Order created"
        );
        let id = cart_id.to_string();
        add_breadcrumb("checkout", "Ordered cart", Some(&[("cart_id", id.as_str())]));

        let mut carts = self.carts_or_cached().await;
        let (next, items) = if most_recent(&carts, Some(cart_id)).is_some() {
            self.fallback_after(&carts, Some(cart_id)).await
        } else {
            match self.inner.backend.create_cart().await {
                Ok(fresh) => {
                    let fresh_id = fresh.id;
                    carts = with_cart(carts, fresh);
                    (Some(fresh_id), Vec::new())
                }
                Err(e) => {
                    warn!(error = %e, "Failed to create a cart after checkout");
                    (None, Vec::new())
                }
            }
        };

        let committed = self.commit(ticket, |state| {
            apply(state, CartAction::SetCarts(carts));
            apply(
                state,
                CartAction::Load {
                    cart_id: next,
                    items,
                },
            );
        });
        if committed {
            self.save_snapshot().await;
        }
        Ok(order)
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Show the cart panel.
    pub fn open_cart(&self) {
        self.dispatch(CartAction::Open);
    }

    /// Hide the cart panel.
    pub fn close_cart(&self) {
        self.dispatch(CartAction::Close);
    }

    // =========================================================================
    // Session binding
    // =========================================================================

    /// Discard the state and load the carts of `user`.
    ///
    /// Picks the most recently created cart as current. With no user, the
    /// state is emptied. If the backend is unavailable the user's saved
    /// snapshot is shown instead.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Superseded` if another bind or switch started
    /// before this one finished.
    #[instrument(skip(self))]
    pub async fn bind_session(&self, user: Option<UserId>) -> Result<SessionBinding, CartError> {
        let ticket = self.inner.tickets.issue();
        self.dispatch(CartAction::Reset { owner: user });

        let Some(user_id) = user else {
            debug!("Cart state cleared for anonymous session");
            return Ok(SessionBinding::Anonymous);
        };
        self.dispatch(CartAction::SetPhase(CartPhase::Loading));

        match self.inner.backend.list_carts().await {
            Ok(carts) => {
                let (current, items) = match most_recent(&carts, None) {
                    Some(cart) => (Some(cart.id), hydrate_cart(&self.inner.catalog, cart).await),
                    None => (None, Vec::new()),
                };
                self.commit_or_superseded(ticket, |state| {
                    apply(state, CartAction::SetCarts(carts));
                    apply(
                        state,
                        CartAction::Load {
                            cart_id: current,
                            items,
                        },
                    );
                })?;
                info!(user_id = %user_id, cart_id = ?current, "Cart session bound");
                self.save_snapshot().await;
                Ok(SessionBinding::Backend)
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Backend unavailable, loading saved cart");
                let snapshot = self.load_saved(user_id).await;
                let binding = if snapshot.is_some() {
                    SessionBinding::Snapshot
                } else {
                    SessionBinding::Empty
                };
                let (cart_id, items) = snapshot.map_or((None, Vec::new()), |s| (s.cart_id, s.items));
                self.commit_or_superseded(ticket, |state| {
                    apply(state, CartAction::Load { cart_id, items });
                })?;
                Ok(binding)
            }
        }
    }

    async fn load_saved(&self, user_id: UserId) -> Option<CartSnapshot> {
        let store = self.inner.snapshots.as_ref()?;
        match store.load(user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cart snapshot");
                None
            }
        }
    }

    /// Keep the cart bound to `session`: bind now, then rebind whenever the
    /// logged-in user changes.
    ///
    /// The task ends when every session handle is dropped.
    pub fn watch_session(&self, session: &Session) -> JoinHandle<()> {
        let mut rx = session.subscribe();
        let this = self.clone();

        tokio::spawn(async move {
            let mut bound = rx.borrow_and_update().as_ref().map(|auth| auth.user.id);
            if let Err(e) = this.bind_session(bound).await {
                debug!(error = %e, "Initial cart bind did not apply");
            }

            while rx.changed().await.is_ok() {
                let user = rx.borrow_and_update().as_ref().map(|auth| auth.user.id);
                if user == bound {
                    continue;
                }
                bound = user;
                if let Err(e) = this.bind_session(user).await {
                    debug!(error = %e, "Cart rebind did not apply");
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::OnceLock;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;
    use secrecy::SecretString;

    use boutique_core::{CurrencyCode, Email, OrderStatus, Price, Role};

    use crate::catalog::MockProductSource;
    use crate::models::{AuthUser, CartEntry, User};

    use super::super::backend::MockCartBackend;
    use super::*;

    const USER: UserId = UserId::new(1);

    fn product(id: i32, euros: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Produit {id}"),
            brand: "Marque".to_string(),
            category: "Divers".to_string(),
            price: Price::from_cents(euros * 100, CurrencyCode::EUR),
            stock: 10,
            description: None,
            image_path: None,
        }
    }

    fn catalogue() -> Vec<Product> {
        vec![product(1, 10), product(2, 5), product(3, 20)]
    }

    fn summary(id: i32, day: Option<u32>, entries: &[(i32, u32)]) -> CartSummary {
        CartSummary {
            id: CartId::new(id),
            owner: USER,
            entries: entries
                .iter()
                .map(|&(p, q)| CartEntry {
                    product_id: ProductId::new(p),
                    quantity: q,
                })
                .collect(),
            created_at: day.map(|d| Utc.with_ymd_and_hms(2025, 4, d, 8, 0, 0).unwrap()),
        }
    }

    fn catalog_source() -> MockProductSource {
        let mut source = MockProductSource::new();
        source
            .expect_fetch_products()
            .returning(|| Ok(catalogue()));
        source
    }

    fn service_with(backend: MockCartBackend, source: MockProductSource) -> CartService {
        let catalog = Catalog::new(Arc::new(source), Duration::from_secs(60));
        CartService::new(Arc::new(backend), catalog, None)
    }

    fn service(backend: MockCartBackend) -> CartService {
        service_with(backend, catalog_source())
    }

    /// Bind `USER` with `cart_id` current, without going through the backend.
    fn bound(svc: &CartService, cart_id: Option<i32>) {
        svc.dispatch(CartAction::Reset { owner: Some(USER) });
        svc.dispatch(CartAction::Load {
            cart_id: cart_id.map(CartId::new),
            items: Vec::new(),
        });
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            status: 503,
            body: "maintenance".to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // Item mutations
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_add_item_logged_out_is_local_only() {
        let svc = service(MockCartBackend::new());

        let handle = svc.add_item(product(1, 10));
        assert!(!handle.is_remote());
        assert_eq!(handle.outcome().await, SyncOutcome::LocalOnly);
        assert_eq!(svc.snapshot().item_count, 1);
    }

    #[tokio::test]
    async fn test_add_item_syncs_to_current_cart() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_add_item()
            .with(eq(CartId::new(10)), eq(ProductId::new(1)), eq(1))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let svc = service(backend);
        bound(&svc, Some(10));

        let handle = svc.add_item(product(1, 10));
        // Applied before the server answers.
        assert_eq!(svc.snapshot().quantity_of(ProductId::new(1)), 1);
        assert_eq!(handle.outcome().await, SyncOutcome::Confirmed);
        assert_eq!(svc.snapshot().total, Price::from_cents(1_000, CurrencyCode::EUR));
    }

    #[tokio::test]
    async fn test_add_items_sends_one_request() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_add_item()
            .with(eq(CartId::new(10)), eq(ProductId::new(2)), eq(4))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let svc = service(backend);
        bound(&svc, Some(10));

        let handle = svc.add_items(product(2, 5), NonZeroU32::new(4).unwrap());
        assert_eq!(handle.outcome().await, SyncOutcome::Confirmed);
        assert_eq!(svc.snapshot().item_count, 4);
    }

    #[tokio::test]
    async fn test_failed_add_rolls_back() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_add_item()
            .returning(|_, _, _| Err(unavailable()));
        let svc = service(backend);
        bound(&svc, Some(10));

        let outcome = svc.add_item(product(1, 10)).outcome().await;
        assert_eq!(outcome, SyncOutcome::RolledBack);
        let state = svc.snapshot();
        assert!(state.items.is_empty());
        assert_eq!(state.item_count, 0);
    }

    #[tokio::test]
    async fn test_failed_add_keeps_newer_mutations() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_add_item()
            .withf(|_, product_id, _| *product_id == ProductId::new(1))
            .returning(|_, _, _| Err(unavailable()));
        backend
            .expect_add_item()
            .withf(|_, product_id, _| *product_id == ProductId::new(2))
            .returning(|_, _, _| Ok(()));
        let svc = service(backend);
        bound(&svc, Some(10));

        let first = svc.add_item(product(1, 10));
        let second = svc.add_item(product(2, 5));

        assert_eq!(first.outcome().await, SyncOutcome::Superseded);
        assert_eq!(second.outcome().await, SyncOutcome::Confirmed);
        let state = svc.snapshot();
        assert_eq!(state.items.len(), 2);
        assert_eq!(state.item_count, 2);
    }

    #[tokio::test]
    async fn test_first_add_without_cart_adopts_backend_cart() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_add_to_active_cart()
            .with(eq(ProductId::new(3)), eq(1))
            .times(1)
            .returning(|_, _| Ok(Some(summary(42, Some(2), &[(3, 1)]))));
        backend
            .expect_list_carts()
            .times(1)
            .returning(|| Ok(vec![summary(42, Some(2), &[(3, 1)])]));
        let svc = service(backend);
        bound(&svc, None);

        let outcome = svc.add_item(product(3, 20)).outcome().await;
        assert_eq!(outcome, SyncOutcome::Confirmed);
        let state = svc.snapshot();
        assert_eq!(state.current_cart_id, Some(CartId::new(42)));
        assert_eq!(state.all_carts.len(), 1);
    }

    #[tokio::test]
    async fn test_first_add_with_bare_acknowledgement_adopts_newest_cart() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_add_to_active_cart()
            .returning(|_, _| Ok(None));
        backend
            .expect_list_carts()
            .returning(|| Ok(vec![summary(5, Some(1), &[]), summary(6, Some(3), &[(1, 1)])]));
        let svc = service(backend);
        bound(&svc, None);

        svc.add_item(product(1, 10)).outcome().await;
        assert_eq!(svc.snapshot().current_cart_id, Some(CartId::new(6)));
    }

    #[tokio::test]
    async fn test_remove_item_syncs_delete() {
        let mut backend = MockCartBackend::new();
        backend.expect_add_item().returning(|_, _, _| Ok(()));
        backend
            .expect_remove_item()
            .with(eq(CartId::new(10)), eq(ProductId::new(1)))
            .times(1)
            .returning(|_, _| Ok(()));
        let svc = service(backend);
        bound(&svc, Some(10));

        svc.add_item(product(1, 10)).outcome().await;
        let outcome = svc.remove_item(ProductId::new(1)).outcome().await;
        assert_eq!(outcome, SyncOutcome::Confirmed);
        assert!(svc.snapshot().items.is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_item_makes_no_call() {
        let svc = service(MockCartBackend::new());
        bound(&svc, Some(10));

        let handle = svc.remove_item(ProductId::new(9));
        assert_eq!(handle.outcome().await, SyncOutcome::LocalOnly);
    }

    #[tokio::test]
    async fn test_update_quantity_syncs_put_or_delete() {
        let mut backend = MockCartBackend::new();
        backend.expect_add_item().returning(|_, _, _| Ok(()));
        backend
            .expect_set_quantity()
            .with(eq(CartId::new(10)), eq(ProductId::new(1)), eq(3))
            .times(1)
            .returning(|_, _, _| Ok(()));
        backend
            .expect_remove_item()
            .with(eq(CartId::new(10)), eq(ProductId::new(2)))
            .times(1)
            .returning(|_, _| Ok(()));
        let svc = service(backend);
        bound(&svc, Some(10));

        svc.add_item(product(1, 10)).outcome().await;
        svc.add_item(product(2, 5)).outcome().await;

        let set = svc.update_quantity(ProductId::new(1), 3);
        let removal = svc.update_quantity(ProductId::new(2), 0);
        assert_eq!(set.outcome().await, SyncOutcome::Confirmed);
        assert_eq!(removal.outcome().await, SyncOutcome::Confirmed);

        let state = svc.snapshot();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.item_count, 3);
        assert_eq!(state.total, Price::from_cents(3_000, CurrencyCode::EUR));
    }

    #[tokio::test]
    async fn test_failed_update_restores_quantity() {
        let mut backend = MockCartBackend::new();
        backend.expect_add_item().returning(|_, _, _| Ok(()));
        backend
            .expect_set_quantity()
            .returning(|_, _, _| Err(ApiError::NotFound("cart".to_string())));
        let svc = service(backend);
        bound(&svc, Some(10));

        svc.add_item(product(1, 10)).outcome().await;
        let outcome = svc.update_quantity(ProductId::new(1), 5).outcome().await;
        assert_eq!(outcome, SyncOutcome::RolledBack);
        assert_eq!(svc.snapshot().quantity_of(ProductId::new(1)), 1);
    }

    #[tokio::test]
    async fn test_clear_is_synchronous_and_refreshes_carts() {
        let mut backend = MockCartBackend::new();
        backend.expect_add_item().returning(|_, _, _| Ok(()));
        backend
            .expect_clear_cart()
            .with(eq(CartId::new(10)))
            .times(1)
            .returning(|_| Ok(()));
        backend
            .expect_list_carts()
            .times(1)
            .returning(|| Ok(vec![summary(10, Some(1), &[])]));
        let svc = service(backend);
        bound(&svc, Some(10));

        svc.add_item(product(1, 10)).outcome().await;
        svc.add_item(product(2, 5)).outcome().await;

        let handle = svc.clear_cart();
        let state = svc.snapshot();
        assert!(state.items.is_empty());
        assert!(state.total.is_zero());
        assert_eq!(state.item_count, 0);

        assert_eq!(handle.outcome().await, SyncOutcome::Confirmed);
        assert_eq!(svc.snapshot().all_carts.len(), 1);
    }

    // -------------------------------------------------------------------------
    // Cart-level operations
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_switch_replaces_items_and_current_cart() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_get_cart()
            .with(eq(CartId::new(7)))
            .returning(|_| Ok(summary(7, Some(3), &[(1, 2), (2, 1)])));
        let svc = service(backend);
        bound(&svc, Some(10));
        svc.dispatch(CartAction::AddItem {
            product: product(3, 20),
            quantity: 1,
        });

        svc.switch_to_cart(CartId::new(7)).await.unwrap();

        let state = svc.snapshot();
        assert_eq!(state.current_cart_id, Some(CartId::new(7)));
        assert_eq!(state.items.len(), 2);
        assert_eq!(state.total, Price::from_cents(2_500, CurrencyCode::EUR));
        assert_eq!(state.item_count, 3);
        assert!(state.item(ProductId::new(3)).is_none());
    }

    #[tokio::test]
    async fn test_failed_switch_leaves_state_untouched() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_get_cart()
            .returning(|id| Err(ApiError::NotFound(format!("cart {id}"))));
        let svc = service(backend);
        bound(&svc, Some(10));
        svc.dispatch(CartAction::AddItem {
            product: product(1, 10),
            quantity: 2,
        });
        let before = svc.snapshot();

        let err = svc.switch_to_cart(CartId::new(99)).await.unwrap_err();
        assert!(matches!(err, CartError::Api(ApiError::NotFound(_))));
        assert_eq!(svc.snapshot(), before);
    }

    #[tokio::test]
    async fn test_switch_with_catalogue_down_shows_placeholders() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_get_cart()
            .returning(|_| Ok(summary(7, None, &[(1, 2)])));
        let mut source = MockProductSource::new();
        source
            .expect_fetch_products()
            .returning(|| Err(unavailable()));
        let svc = service_with(backend, source);
        bound(&svc, Some(10));

        svc.switch_to_cart(CartId::new(7)).await.unwrap();
        let state = svc.snapshot();
        assert_eq!(state.item_count, 2);
        assert!(state.items.iter().all(|i| i.product.is_placeholder()));
        assert!(state.total.is_zero());
    }

    #[tokio::test]
    async fn test_stale_switch_response_is_discarded() {
        let slot: Arc<OnceLock<CartService>> = Arc::new(OnceLock::new());
        let in_flight = Arc::clone(&slot);

        let mut backend = MockCartBackend::new();
        backend.expect_get_cart().returning(move |id| {
            // A newer cart request starts while this one is in flight.
            if let Some(svc) = in_flight.get() {
                svc.inner.tickets.issue();
            }
            Ok(summary(id.as_i32(), None, &[(1, 1)]))
        });
        let svc = service(backend);
        slot.set(svc.clone()).unwrap();
        bound(&svc, Some(10));
        let before = svc.snapshot();

        let err = svc.switch_to_cart(CartId::new(7)).await.unwrap_err();
        assert!(matches!(err, CartError::Superseded));
        assert_eq!(svc.snapshot(), before);
    }

    #[tokio::test]
    async fn test_switch_requires_session() {
        let svc = service(MockCartBackend::new());
        let err = svc.switch_to_cart(CartId::new(1)).await.unwrap_err();
        assert!(matches!(err, CartError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_create_first_cart() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_create_cart()
            .times(1)
            .returning(|| Ok(summary(31, Some(9), &[])));
        backend
            .expect_list_carts()
            .returning(|| Ok(vec![summary(31, Some(9), &[])]));
        let svc = service(backend);
        bound(&svc, None);
        assert!(svc.snapshot().all_carts.is_empty());

        let cart_id = svc.create_new_cart().await.unwrap();

        let state = svc.snapshot();
        assert_eq!(cart_id, CartId::new(31));
        assert_eq!(state.all_carts.len(), 1);
        assert_eq!(state.current_cart_id, Some(cart_id));
        assert!(state.items.is_empty());
    }

    #[tokio::test]
    async fn test_create_cart_listed_even_if_refresh_fails() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_create_cart()
            .returning(|| Ok(summary(31, None, &[])));
        backend.expect_list_carts().returning(|| Err(unavailable()));
        let svc = service(backend);
        bound(&svc, None);

        svc.create_new_cart().await.unwrap();
        assert_eq!(svc.snapshot().all_carts.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_current_cart_falls_back_to_most_recent() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_delete_cart()
            .with(eq(CartId::new(3)))
            .times(1)
            .returning(|_| Ok(()));
        backend.expect_list_carts().returning(|| {
            Ok(vec![
                summary(1, Some(1), &[]),
                summary(2, Some(2), &[(2, 2)]),
            ])
        });
        backend
            .expect_get_cart()
            .with(eq(CartId::new(2)))
            .returning(|_| Ok(summary(2, Some(2), &[(2, 2)])));
        let svc = service(backend);
        bound(&svc, Some(3));

        svc.delete_cart(CartId::new(3)).await.unwrap();

        let state = svc.snapshot();
        assert_eq!(state.current_cart_id, Some(CartId::new(2)));
        assert_eq!(state.item_count, 2);
        assert!(state.all_carts.iter().all(|c| c.id != CartId::new(3)));
    }

    #[tokio::test]
    async fn test_delete_current_cart_never_dangles_when_fallback_fetch_fails() {
        let mut backend = MockCartBackend::new();
        backend.expect_delete_cart().returning(|_| Ok(()));
        backend
            .expect_list_carts()
            .returning(|| Ok(vec![summary(3, Some(3), &[]), summary(1, Some(1), &[(1, 1)])]));
        backend.expect_get_cart().returning(|_| Err(unavailable()));
        let svc = service(backend);
        bound(&svc, Some(3));

        svc.delete_cart(CartId::new(3)).await.unwrap();

        let state = svc.snapshot();
        assert_eq!(state.current_cart_id, Some(CartId::new(1)));
        assert_eq!(state.item_count, 1);
    }

    #[tokio::test]
    async fn test_delete_last_cart_leaves_no_current() {
        let mut backend = MockCartBackend::new();
        backend.expect_delete_cart().returning(|_| Ok(()));
        backend.expect_list_carts().returning(|| Ok(vec![]));
        let svc = service(backend);
        bound(&svc, Some(3));
        svc.dispatch(CartAction::AddItem {
            product: product(1, 10),
            quantity: 1,
        });

        svc.delete_cart(CartId::new(3)).await.unwrap();

        let state = svc.snapshot();
        assert_eq!(state.current_cart_id, None);
        assert!(state.items.is_empty());
    }

    #[tokio::test]
    async fn test_delete_other_cart_keeps_current() {
        let mut backend = MockCartBackend::new();
        backend.expect_delete_cart().returning(|_| Ok(()));
        backend
            .expect_list_carts()
            .returning(|| Ok(vec![summary(3, Some(3), &[])]));
        let svc = service(backend);
        bound(&svc, Some(3));

        svc.delete_cart(CartId::new(1)).await.unwrap();
        assert_eq!(svc.snapshot().current_cart_id, Some(CartId::new(3)));
    }

    #[tokio::test]
    async fn test_failed_delete_propagates() {
        let mut backend = MockCartBackend::new();
        backend.expect_delete_cart().returning(|_| Err(unavailable()));
        let svc = service(backend);
        bound(&svc, Some(3));

        assert!(svc.delete_cart(CartId::new(3)).await.is_err());
        assert_eq!(svc.snapshot().current_cart_id, Some(CartId::new(3)));
    }

    fn order_for(cart: i32) -> Order {
        Order {
            id: None,
            owner: USER,
            lines: vec![],
            total: Price::from_cents(i64::from(cart) * 100, CurrencyCode::EUR),
            status: OrderStatus::Pending,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_order_moves_to_next_cart() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_create_order()
            .with(eq(CartId::new(5)))
            .times(1)
            .returning(|id| Ok(order_for(id.as_i32())));
        backend.expect_list_carts().returning(|| {
            Ok(vec![summary(5, Some(5), &[]), summary(4, Some(4), &[(1, 1)])])
        });
        backend
            .expect_get_cart()
            .with(eq(CartId::new(4)))
            .returning(|_| Ok(summary(4, Some(4), &[(1, 1)])));
        let svc = service(backend);
        bound(&svc, Some(5));

        let order = svc.create_order_from_current_cart().await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let state = svc.snapshot();
        assert_eq!(state.current_cart_id, Some(CartId::new(4)));
        assert_eq!(state.item_count, 1);
    }

    #[tokio::test]
    async fn test_order_of_only_cart_creates_fresh_one() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_create_order()
            .returning(|id| Ok(order_for(id.as_i32())));
        backend
            .expect_list_carts()
            .returning(|| Ok(vec![summary(5, Some(5), &[])]));
        backend
            .expect_create_cart()
            .times(1)
            .returning(|| Ok(summary(6, Some(6), &[])));
        let svc = service(backend);
        bound(&svc, Some(5));

        svc.create_order_from_current_cart().await.unwrap();

        let state = svc.snapshot();
        assert_eq!(state.current_cart_id, Some(CartId::new(6)));
        assert!(state.items.is_empty());
        assert_eq!(state.all_carts.len(), 2);
    }

    #[tokio::test]
    async fn test_order_without_current_cart() {
        let svc = service(MockCartBackend::new());
        bound(&svc, None);
        let err = svc.create_order_from_current_cart().await.unwrap_err();
        assert!(matches!(err, CartError::NoActiveCart));
    }

    #[tokio::test]
    async fn test_open_close() {
        let svc = service(MockCartBackend::new());
        svc.open_cart();
        assert!(svc.snapshot().is_open);
        svc.close_cart();
        assert!(!svc.snapshot().is_open);
    }

    // -------------------------------------------------------------------------
    // Session binding
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_bind_selects_most_recent_cart() {
        let mut backend = MockCartBackend::new();
        backend.expect_list_carts().returning(|| {
            Ok(vec![
                summary(1, Some(1), &[(1, 1)]),
                summary(2, Some(20), &[(3, 2)]),
                summary(9, None, &[]),
            ])
        });
        let svc = service(backend);

        let binding = svc.bind_session(Some(USER)).await.unwrap();

        assert_eq!(binding, SessionBinding::Backend);
        let state = svc.snapshot();
        assert_eq!(state.phase, CartPhase::Ready);
        assert_eq!(state.owner, Some(USER));
        assert_eq!(state.current_cart_id, Some(CartId::new(2)));
        assert_eq!(state.all_carts.len(), 3);
        assert_eq!(state.total, Price::from_cents(4_000, CurrencyCode::EUR));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_switch_during_bind_does_not_strand_loading() {
        let slot: Arc<OnceLock<CartService>> = Arc::new(OnceLock::new());
        let in_flight = Arc::clone(&slot);

        let mut backend = MockCartBackend::new();
        backend.expect_list_carts().returning(move || {
            // A switch to a missing cart fails while the bind is listing.
            if let Some(svc) = in_flight.get() {
                let switch = tokio::task::block_in_place(|| {
                    tokio::runtime::Handle::current().block_on(svc.switch_to_cart(CartId::new(99)))
                });
                assert!(matches!(switch, Err(CartError::Api(ApiError::NotFound(_)))));
            }
            Ok(vec![summary(7, Some(3), &[(1, 2)])])
        });
        backend
            .expect_get_cart()
            .returning(|_| Err(ApiError::NotFound("cart".to_string())));
        let svc = service(backend);
        slot.set(svc.clone()).unwrap();

        let binding = svc.bind_session(Some(USER)).await.unwrap();

        assert_eq!(binding, SessionBinding::Backend);
        let state = svc.snapshot();
        assert_eq!(state.phase, CartPhase::Ready);
        assert_eq!(state.current_cart_id, Some(CartId::new(7)));
        assert_eq!(state.item_count, 2);
        assert_eq!(state.all_carts.len(), 1);
    }

    #[tokio::test]
    async fn test_bind_without_carts_is_ready_and_empty() {
        let mut backend = MockCartBackend::new();
        backend.expect_list_carts().returning(|| Ok(vec![]));
        let svc = service(backend);

        svc.bind_session(Some(USER)).await.unwrap();
        let state = svc.snapshot();
        assert_eq!(state.phase, CartPhase::Ready);
        assert_eq!(state.current_cart_id, None);
    }

    #[tokio::test]
    async fn test_bind_anonymous_discards_state() {
        let svc = service(MockCartBackend::new());
        bound(&svc, Some(4));
        svc.dispatch(CartAction::AddItem {
            product: product(1, 10),
            quantity: 1,
        });

        let binding = svc.bind_session(None).await.unwrap();
        assert_eq!(binding, SessionBinding::Anonymous);
        let state = svc.snapshot();
        assert!(state.items.is_empty());
        assert_eq!(state.owner, None);
        assert_eq!(state.phase, CartPhase::Uninitialized);
    }

    #[tokio::test]
    async fn test_bind_falls_back_to_saved_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store
            .save(
                USER,
                &CartSnapshot {
                    cart_id: Some(CartId::new(8)),
                    items: vec![CartItem::new(product(2, 5), 3)],
                    saved_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let mut backend = MockCartBackend::new();
        backend.expect_list_carts().returning(|| Err(unavailable()));
        let catalog = Catalog::new(Arc::new(MockProductSource::new()), Duration::from_secs(60));
        let svc = CartService::new(Arc::new(backend), catalog, Some(store));

        let binding = svc.bind_session(Some(USER)).await.unwrap();
        assert_eq!(binding, SessionBinding::Snapshot);
        let state = svc.snapshot();
        assert_eq!(state.current_cart_id, Some(CartId::new(8)));
        assert_eq!(state.item_count, 3);
        assert_eq!(state.phase, CartPhase::Ready);
    }

    #[tokio::test]
    async fn test_bind_backend_down_without_snapshot() {
        let mut backend = MockCartBackend::new();
        backend.expect_list_carts().returning(|| Err(unavailable()));
        let svc = service(backend);

        let binding = svc.bind_session(Some(USER)).await.unwrap();
        assert_eq!(binding, SessionBinding::Empty);
        assert!(svc.snapshot().items.is_empty());
    }

    #[tokio::test]
    async fn test_settled_mutations_are_snapshotted() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut backend = MockCartBackend::new();
        backend.expect_add_item().returning(|_, _, _| Ok(()));
        let catalog = Catalog::new(Arc::new(MockProductSource::new()), Duration::from_secs(60));
        let svc = CartService::new(Arc::new(backend), catalog, Some(store.clone()));
        bound(&svc, Some(10));

        svc.add_item(product(1, 10)).outcome().await;

        let saved = store.load(USER).await.unwrap().unwrap();
        assert_eq!(saved.cart_id, Some(CartId::new(10)));
        assert_eq!(saved.items.len(), 1);
    }

    #[tokio::test]
    async fn test_watch_session_rebinds_on_user_change() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_list_carts()
            .returning(|| Ok(vec![summary(12, Some(1), &[(1, 1)])]));
        let svc = service(backend);
        let session = Session::new();
        let mut rx = svc.subscribe();

        let task = svc.watch_session(&session);

        session.set(AuthUser::new(
            User {
                id: USER,
                name: "Ines".to_string(),
                email: Email::parse("ines@boutique.fr").unwrap(),
                role: Role::Client,
            },
            SecretString::from("token"),
        ));
        let state = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| s.owner == Some(USER) && s.phase == CartPhase::Ready),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(state.current_cart_id, Some(CartId::new(12)));

        session.clear();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| s.owner.is_none() && s.items.is_empty()),
        )
        .await
        .unwrap()
        .unwrap();

        task.abort();
    }
}
