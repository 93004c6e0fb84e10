//! Catalogue commands.

use boutique_storefront::config::StorefrontConfig;
use boutique_storefront::models::Product;
use boutique_storefront::state::AppState;

use super::CommandError;
use crate::output;

/// Listing filters; names match case-insensitively.
#[derive(Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub in_stock: bool,
}

impl ProductFilter {
    fn matches(&self, product: &Product) -> bool {
        let same = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .is_none_or(|w| w.eq_ignore_ascii_case(actual))
        };
        same(&self.category, &product.category)
            && same(&self.brand, &product.brand)
            && (!self.in_stock || product.in_stock())
    }
}

/// List products.
pub async fn products(config: StorefrontConfig, filter: &ProductFilter) -> Result<(), CommandError> {
    let state = AppState::new(config)?;
    let products = state.catalog().products().await?;
    let listed: Vec<&Product> = products.iter().filter(|p| filter.matches(p)).collect();
    output::products(&listed);
    Ok(())
}
