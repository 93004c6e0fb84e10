//! Product catalogue with an in-memory cache.
//!
//! Listings are cached with `moka` for the configured TTL. Cart hydration
//! always goes through [`Catalog::products_fresh`], which bypasses the
//! cache so displayed prices and stock are current.

mod cache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, instrument};

use boutique_core::ProductId;

use crate::api::{ApiClient, ApiError};
use crate::models::{Brand, Category, Product};

use cache::{CacheKey, CacheValue};

/// Where catalogue data comes from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Fetch the full product list.
    async fn fetch_products(&self) -> Result<Vec<Product>, ApiError>;

    /// Fetch all categories.
    async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError>;

    /// Fetch all brands.
    async fn fetch_brands(&self) -> Result<Vec<Brand>, ApiError>;
}

#[async_trait]
impl ProductSource for ApiClient {
    async fn fetch_products(&self) -> Result<Vec<Product>, ApiError> {
        self.list_products().await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.list_categories().await
    }

    async fn fetch_brands(&self) -> Result<Vec<Brand>, ApiError> {
        self.list_brands().await
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Cached view of the product catalogue.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    source: Arc<dyn ProductSource>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl Catalog {
    /// Create a catalogue over `source` whose listings live for `ttl`.
    #[must_use]
    pub fn new(source: Arc<dyn ProductSource>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();

        Self {
            inner: Arc::new(CatalogInner { source, cache }),
        }
    }

    /// All products, from cache when fresh enough.
    ///
    /// # Errors
    ///
    /// Returns an error if the products have to be fetched and the fetch fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }
        self.products_fresh().await
    }

    /// All products, always fetched from the source. Refreshes the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    #[instrument(skip(self))]
    pub async fn products_fresh(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        let products = Arc::new(self.inner.source.fetch_products().await?);
        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// Look up one product.
    ///
    /// # Errors
    ///
    /// Returns an error if the product list cannot be fetched.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, ApiError> {
        let products = self.products().await?;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the categories have to be fetched and the fetch fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(self.inner.source.fetch_categories().await?);
        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// All brands.
    ///
    /// # Errors
    ///
    /// Returns an error if the brands have to be fetched and the fetch fails.
    #[instrument(skip(self))]
    pub async fn brands(&self) -> Result<Arc<Vec<Brand>>, ApiError> {
        if let Some(CacheValue::Brands(brands)) = self.inner.cache.get(&CacheKey::Brands).await {
            debug!("Cache hit for brands");
            return Ok(brands);
        }

        let brands = Arc::new(self.inner.source.fetch_brands().await?);
        self.inner
            .cache
            .insert(CacheKey::Brands, CacheValue::Brands(Arc::clone(&brands)))
            .await;
        Ok(brands)
    }

    /// Drop every cached listing.
    pub async fn invalidate(&self) {
        for key in [CacheKey::Products, CacheKey::Categories, CacheKey::Brands] {
            self.inner.cache.invalidate(&key).await;
        }
    }
}
