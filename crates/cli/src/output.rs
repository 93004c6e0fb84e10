//! Terminal rendering of storefront data.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Display;

use boutique_core::CartId;
use boutique_storefront::cart::{CartOverview, CartSort, CartState, CartStats};
use boutique_storefront::models::{CartSummary, Order, Product, User};

pub fn failure(error: &dyn Display) {
    eprintln!("error: {error}");
}

pub fn message(text: &str) {
    println!("{text}");
}

pub fn user(user: &User) {
    println!("{} <{}> #{} ({})", user.name, user.email.as_str(), user.id, user.role);
}

pub fn products(products: &[&Product]) {
    if products.is_empty() {
        println!("No products.");
        return;
    }
    for p in products {
        let stock = if p.in_stock() {
            format!("{} in stock", p.stock)
        } else {
            "out of stock".to_string()
        };
        println!(
            "#{:<5} {:<32} {:<16} {:<16} {:>10}  {stock}",
            p.id, p.name, p.brand, p.category, p.price
        );
    }
}

pub fn cart(state: &CartState) {
    let label = state
        .current_cart_id
        .map_or_else(|| "no cart".to_string(), |id| format!("cart #{id}"));
    println!("[{label}]");

    if state.items.is_empty() {
        println!("  empty");
        return;
    }
    for item in &state.items {
        println!(
            "  #{:<5} {:<32} x{:<4} {:>10}",
            item.product.id,
            item.product.name,
            item.quantity,
            item.line_total()
        );
    }
    println!("  {} item(s), total {}", state.item_count, state.total);
}

pub fn carts(overview: &CartOverview<'_>, sort: CartSort, hide_empty: bool, current: Option<CartId>) {
    let listed: Vec<&CartSummary> = overview.sorted(sort, hide_empty);
    if listed.is_empty() {
        println!("No carts.");
    }
    for cart in listed {
        let marker = if Some(cart.id) == current { "*" } else { " " };
        let created = cart
            .created_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        println!(
            "{marker} #{:<5} {created:<16} {:>4} item(s) {:>10}",
            cart.id,
            cart.item_count(),
            overview.value_of(cart)
        );
    }
    stats(&overview.stats());
}

fn stats(stats: &CartStats) {
    println!(
        "{} cart(s), {} empty, {} item(s), total {}",
        stats.cart_count, stats.empty_count, stats.item_count, stats.total_value
    );
}

pub fn order(order: &Order) {
    let id = order
        .id
        .map_or_else(|| "(pending id)".to_string(), |id| format!("#{id}"));
    println!(
        "Order {id}: {} item(s), total {}, {}",
        order.item_count(),
        order.total,
        order.status
    );
}
