//! Optimistic cart mutations against a running API.
//!
//! Run with: cargo test -p boutique-integration-tests -- --ignored

use std::num::NonZeroU32;

use boutique_integration_tests::TestContext;
use boutique_storefront::cart::{CartPhase, SyncOutcome};
use boutique_storefront::models::Product;

async fn two_products(ctx: &TestContext) -> (Product, Product) {
    let products = ctx
        .state
        .catalog()
        .products()
        .await
        .expect("Catalogue unavailable");
    let mut in_stock = products.iter().filter(|p| p.in_stock()).cloned();
    let first = in_stock.next().expect("Catalogue needs two products in stock");
    let second = in_stock.next().expect("Catalogue needs two products in stock");
    (first, second)
}

#[tokio::test]
#[ignore = "requires a running Boutique API"]
async fn test_mutations_reach_the_server() {
    let ctx = TestContext::new();
    ctx.signup().await;
    let cart = ctx.state.cart();
    assert_eq!(cart.snapshot().phase, CartPhase::Ready);

    if cart.snapshot().current_cart_id.is_none() {
        cart.create_new_cart().await.expect("Cart creation failed");
    }
    let (a, b) = two_products(&ctx).await;

    let add_a = cart.add_item(a.clone());
    let add_b = cart.add_items(b.clone(), NonZeroU32::new(3).expect("non-zero"));
    assert_eq!(add_a.outcome().await, SyncOutcome::Confirmed);
    assert_eq!(add_b.outcome().await, SyncOutcome::Confirmed);

    let update = cart.update_quantity(a.id, 2);
    assert_eq!(update.outcome().await, SyncOutcome::Confirmed);
    let remove = cart.remove_item(b.id);
    assert_eq!(remove.outcome().await, SyncOutcome::Confirmed);

    // A fresh client sees what the first one synced.
    let other = ctx.reopen();
    let user = other.auth().restore().await.expect("Session not saved");
    other
        .cart()
        .bind_session(Some(user.id))
        .await
        .expect("Cart bind failed");
    let state = other.cart().snapshot();
    assert_eq!(state.current_cart_id, cart.snapshot().current_cart_id);
    assert_eq!(state.quantity_of(a.id), 2);
    assert_eq!(state.quantity_of(b.id), 0);
    assert_eq!(state.total, a.price.times(2));
}

#[tokio::test]
#[ignore = "requires a running Boutique API"]
async fn test_clear_empties_server_cart() {
    let ctx = TestContext::new();
    ctx.signup().await;
    let cart = ctx.state.cart();
    cart.create_new_cart().await.expect("Cart creation failed");
    let (a, _) = two_products(&ctx).await;

    assert!(cart.add_item(a).outcome().await.is_applied());
    assert_eq!(cart.clear_cart().outcome().await, SyncOutcome::Confirmed);

    let current = cart.snapshot().current_cart_id.expect("current cart");
    let listed = cart.load_all_carts().await.expect("Listing failed");
    let summary = listed
        .iter()
        .find(|c| c.id == current)
        .expect("current cart listed");
    assert!(summary.is_empty());
}
