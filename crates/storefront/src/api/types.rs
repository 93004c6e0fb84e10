//! Wire types for the Boutique REST API.
//!
//! Field names follow the backend's JSON exactly (`id_produit`, `quantite`,
//! `prix`, ...). Convert to [`crate::models`] types before use.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use boutique_core::{BrandId, CartId, CategoryId, OrderId, ProductId, UserId};

// =============================================================================
// Catalogue
// =============================================================================

/// Category as returned by `GET /categories` and embedded in products.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCategory {
    pub id_categorie: CategoryId,
    pub nom: String,
}

/// Brand as returned by `GET /brands` and embedded in products.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiBrand {
    pub id_marque: BrandId,
    pub nom: String,
}

/// Product as returned by `GET /products`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProduct {
    pub id_produit: ProductId,
    pub nom: String,
    #[serde(default)]
    pub description: Option<String>,
    pub prix: Decimal,
    pub stock: i64,
    #[serde(default)]
    pub qr_code_path: Option<String>,
    #[serde(default)]
    pub categorie: Option<ApiCategory>,
    #[serde(default)]
    pub marque: Option<ApiBrand>,
}

// =============================================================================
// Auth
// =============================================================================

/// `POST /auth/login` body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/signup` body.
#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub nom: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: &'a str,
}

/// Token response of login and signup.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub role: Option<String>,
    pub user_id: UserId,
    pub nom: String,
    pub email: String,
}

/// `GET /auth/me` response.
#[derive(Debug, Deserialize)]
pub struct MeResponse {
    pub id_users: UserId,
    pub nom: String,
    pub email: String,
    pub role: String,
}

// =============================================================================
// Carts & orders
// =============================================================================

/// Body of the add-to-cart endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddItemRequest {
    pub id_produit: ProductId,
    pub quantite: u32,
}

/// Body of the set-quantity endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetQuantityRequest {
    pub quantite: u32,
}

/// Cart line as stored by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCartItem {
    pub id_produit: ProductId,
    pub quantite: i64,
}

/// Cart resource.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCart {
    pub id_panier: CartId,
    pub id_users: UserId,
    #[serde(default)]
    pub items: Vec<ApiCartItem>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub date_creation: Option<DateTime<Utc>>,
}

/// Ordered line.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiOrderItem {
    pub id_produit: ProductId,
    pub quantite: i64,
    pub prix: Decimal,
}

/// Order resource.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiOrder {
    #[serde(default)]
    pub id_commande: Option<OrderId>,
    pub id_users: UserId,
    #[serde(default)]
    pub items: Vec<ApiOrderItem>,
    pub prix_total: Decimal,
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub date_creation: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 timestamps as well as the naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// form the backend emits for UTC columns. Unparseable values become `None`.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_deserializes_backend_shape() {
        let json = r#"{
            "id_panier": 4,
            "id_users": 2,
            "items": [{"id_produit": 10, "quantite": 3, "date_mise_a_jour": "2025-03-01T10:00:00"}],
            "date_creation": "2025-03-01T09:30:00.123456"
        }"#;
        let cart: ApiCart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.id_panier, CartId::new(4));
        assert_eq!(cart.items.len(), 1);
        assert!(cart.date_creation.is_some());
    }

    #[test]
    fn test_cart_without_items_or_date() {
        let cart: ApiCart = serde_json::from_str(r#"{"id_panier": 1, "id_users": 2}"#).unwrap();
        assert!(cart.items.is_empty());
        assert!(cart.date_creation.is_none());
    }

    #[test]
    fn test_product_price_from_float() {
        let json = r#"{
            "id_produit": 1, "nom": "Casque", "prix": 79.99, "stock": 5,
            "id_categorie": 1, "id_marque": 2,
            "categorie": {"id_categorie": 1, "nom": "Audio"},
            "marque": {"id_marque": 2, "nom": "Sonor"}
        }"#;
        let product: ApiProduct = serde_json::from_str(json).unwrap();
        assert_eq!(product.prix, Decimal::new(7999, 2));
        assert_eq!(product.marque.unwrap().nom, "Sonor");
    }

    #[test]
    fn test_add_item_request_field_names() {
        let body = serde_json::to_value(AddItemRequest {
            id_produit: ProductId::new(3),
            quantite: 2,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"id_produit": 3, "quantite": 2}));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2025-03-01T09:30:00Z").is_some());
        assert!(parse_timestamp("2025-03-01T09:30:00+02:00").is_some());
        assert!(parse_timestamp("2025-03-01 09:30:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
