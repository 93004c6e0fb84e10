//! Wire type to domain type conversions.

use tracing::warn;

use boutique_core::{CurrencyCode, Email, OrderStatus, Price, Role};

use crate::models::{Brand, CartEntry, CartSummary, Category, Order, OrderLine, Product, User};

use super::types::{
    ApiBrand, ApiCart, ApiCartItem, ApiCategory, ApiOrder, ApiProduct, AuthResponse, MeResponse,
};

/// Clamp a backend integer into a `u32` count; negatives become zero.
fn to_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn eur(amount: rust_decimal::Decimal) -> Price {
    Price::new(amount, CurrencyCode::EUR)
}

/// Parse a role string, defaulting to `Client` for unknown values.
pub(crate) fn convert_role(role: Option<&str>) -> Role {
    role.and_then(|r| r.parse().ok()).unwrap_or_default()
}

pub(crate) fn convert_product(p: ApiProduct) -> Product {
    Product {
        id: p.id_produit,
        name: p.nom,
        brand: p.marque.map(|m| m.nom).unwrap_or_default(),
        category: p.categorie.map(|c| c.nom).unwrap_or_default(),
        price: eur(p.prix),
        stock: to_count(p.stock),
        description: p.description.filter(|d| !d.trim().is_empty()),
        image_path: p.qr_code_path.filter(|d| !d.trim().is_empty()),
    }
}

pub(crate) fn convert_category(c: ApiCategory) -> Category {
    Category {
        id: c.id_categorie,
        name: c.nom,
    }
}

pub(crate) fn convert_brand(b: ApiBrand) -> Brand {
    Brand {
        id: b.id_marque,
        name: b.nom,
    }
}

/// Convert a cart line. Lines with a non-positive quantity are dropped.
fn convert_cart_item(item: &ApiCartItem) -> Option<CartEntry> {
    let quantity = to_count(item.quantite);
    (quantity > 0).then_some(CartEntry {
        product_id: item.id_produit,
        quantity,
    })
}

pub(crate) fn convert_cart(cart: ApiCart) -> CartSummary {
    CartSummary {
        id: cart.id_panier,
        owner: cart.id_users,
        entries: cart.items.iter().filter_map(convert_cart_item).collect(),
        created_at: cart.date_creation,
    }
}

pub(crate) fn convert_order(order: ApiOrder) -> Order {
    Order {
        id: order.id_commande,
        owner: order.id_users,
        lines: order
            .items
            .into_iter()
            .map(|item| OrderLine {
                product_id: item.id_produit,
                quantity: to_count(item.quantite),
                unit_price: eur(item.prix),
            })
            .collect(),
        total: eur(order.prix_total),
        status: order
            .statut
            .as_deref()
            .map_or(OrderStatus::Pending, |s| {
                serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
                    .unwrap_or(OrderStatus::Other)
            }),
        created_at: order.date_creation,
    }
}

/// Convert a login/signup response into a user.
///
/// Returns `None` when the backend sent an address that does not parse.
pub(crate) fn convert_auth_user(auth: &AuthResponse) -> Option<User> {
    let email = match Email::parse(&auth.email) {
        Ok(email) => email,
        Err(e) => {
            warn!(error = %e, "Backend returned an unparseable email");
            return None;
        }
    };
    Some(User {
        id: auth.user_id,
        name: auth.nom.clone(),
        email,
        role: convert_role(auth.role.as_deref()),
    })
}

pub(crate) fn convert_me(me: MeResponse) -> Option<User> {
    let email = Email::parse(&me.email).ok()?;
    Some(User {
        id: me.id_users,
        name: me.nom,
        email,
        role: convert_role(Some(&me.role)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use boutique_core::{CartId, ProductId, UserId};

    use super::*;

    #[test]
    fn test_convert_cart_drops_non_positive_lines() {
        let cart = ApiCart {
            id_panier: CartId::new(1),
            id_users: UserId::new(2),
            items: vec![
                ApiCartItem {
                    id_produit: ProductId::new(1),
                    quantite: 2,
                },
                ApiCartItem {
                    id_produit: ProductId::new(2),
                    quantite: 0,
                },
                ApiCartItem {
                    id_produit: ProductId::new(3),
                    quantite: -4,
                },
            ],
            date_creation: None,
        };

        let summary = convert_cart(cart);
        assert_eq!(summary.entries.len(), 1);
        assert_eq!(summary.item_count(), 2);
    }

    #[test]
    fn test_convert_product_without_relations() {
        let product = convert_product(ApiProduct {
            id_produit: ProductId::new(5),
            nom: "Clavier".to_string(),
            description: Some("  ".to_string()),
            prix: Decimal::new(4990, 2),
            stock: -1,
            qr_code_path: None,
            categorie: None,
            marque: None,
        });
        assert_eq!(product.brand, "");
        assert_eq!(product.stock, 0);
        assert!(product.description.is_none());
        assert_eq!(product.price.to_string(), "€49.90");
    }

    #[test]
    fn test_convert_order_status() {
        let order = convert_order(ApiOrder {
            id_commande: None,
            id_users: UserId::new(1),
            items: vec![],
            prix_total: Decimal::ZERO,
            statut: Some("SHIPPED".to_string()),
            date_creation: None,
        });
        assert_eq!(order.status, OrderStatus::Shipped);

        let order = convert_order(ApiOrder {
            id_commande: None,
            id_users: UserId::new(1),
            items: vec![],
            prix_total: Decimal::ZERO,
            statut: None,
            date_creation: None,
        });
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_convert_role_defaults_to_client() {
        assert_eq!(convert_role(Some("admin")), Role::Admin);
        assert_eq!(convert_role(Some("superuser")), Role::Client);
        assert_eq!(convert_role(None), Role::Client);
    }
}
