//! Catalog reads across the per-category tables.
//!
//! Category listings are cached with `moka`. Cross-category views fan out
//! one read per table with `futures::future::join_all`; a table that fails is
//! logged and skipped so the rest of the view still renders.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use moka::future::Cache;
use tracing::{debug, instrument, warn};

use herbwell_core::{Category, ProductId};

use crate::db::{Database, RepositoryError};
use crate::models::Product;

/// Name shown when a reviewed product cannot be found in any table.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Category listing cache.
pub type CategoryCache = Cache<Category, Arc<Vec<Product>>>;

/// Build the category listing cache.
#[must_use]
pub fn build_category_cache(ttl: Duration) -> CategoryCache {
    Cache::builder()
        .max_capacity(Category::ALL.len() as u64)
        .time_to_live(ttl)
        .build()
}

/// Where a reviewed product was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProduct {
    pub name: String,
    /// `None` for legacy products and unknown products.
    pub category: Option<Category>,
    pub slug: Option<String>,
}

impl ResolvedProduct {
    fn unknown() -> Self {
        Self {
            name: UNKNOWN_PRODUCT.to_owned(),
            category: None,
            slug: None,
        }
    }
}

impl From<Product> for ResolvedProduct {
    fn from(product: Product) -> Self {
        Self {
            category: Some(product.category()),
            name: product.title,
            slug: Some(product.slug),
        }
    }
}

/// Catalog service.
pub struct CatalogService<'a> {
    db: &'a dyn Database,
    cache: &'a CategoryCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database, cache: &'a CategoryCache) -> Self {
        Self { db, cache }
    }

    /// Every product in a category, newest first.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the table cannot be read.
    #[instrument(skip(self), fields(category = %category))]
    pub async fn list_category(
        &self,
        category: Category,
    ) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(products) = self.cache.get(&category).await {
            debug!("Cache hit for category");
            return Ok(products);
        }

        let products = Arc::new(self.db.list_products(category).await?);
        self.cache.insert(category, Arc::clone(&products)).await;
        Ok(products)
    }

    /// One product by slug.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the table cannot be read.
    #[instrument(skip(self), fields(category = %category, slug = %slug))]
    pub async fn get_by_slug(
        &self,
        category: Category,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        self.db.get_product_by_slug(category, slug).await
    }

    /// Products related to `slug`. `None` when `slug` does not exist.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the table cannot be read.
    #[instrument(skip(self), fields(category = %category, slug = %slug))]
    pub async fn related(
        &self,
        category: Category,
        slug: &str,
        limit: u32,
    ) -> Result<Option<Vec<Product>>, RepositoryError> {
        let Some(product) = self.db.get_product_by_slug(category, slug).await? else {
            return Ok(None);
        };
        self.db
            .list_related_products(&product, limit)
            .await
            .map(Some)
    }

    /// Products from every category carrying `badge`, in category order.
    ///
    /// Best effort: categories that fail to load are skipped.
    #[instrument(skip(self), fields(badge = %badge))]
    pub async fn products_with_badge(&self, badge: &str) -> Vec<Product> {
        let reads = Category::ALL.map(|category| async move {
            (category, self.list_category(category).await)
        });

        let mut products = Vec::new();
        for (category, result) in join_all(reads).await {
            match result {
                Ok(rows) => products.extend(rows.iter().filter(|p| p.has_badge(badge)).cloned()),
                Err(e) => warn!(
                    category = %category,
                    error = %e,
                    "Category read failed, skipping it in badge view"
                ),
            }
        }
        products
    }

    /// Find the product a review refers to.
    ///
    /// Looks in `hint` first when given, then probes every category table in
    /// [`Category::ALL`] order, then the legacy `products` table. Probe
    /// failures count as misses. Never fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn resolve_product(
        &self,
        product_id: ProductId,
        hint: Option<Category>,
    ) -> ResolvedProduct {
        if let Some(category) = hint
            && let Some(product) = self.probe(category, product_id).await
        {
            return product.into();
        }

        for category in Category::ALL {
            if Some(category) == hint {
                continue;
            }
            if let Some(product) = self.probe(category, product_id).await {
                return product.into();
            }
        }

        match self.db.get_legacy_product_name(product_id).await {
            Ok(Some(name)) => ResolvedProduct {
                name,
                category: None,
                slug: None,
            },
            Ok(None) => ResolvedProduct::unknown(),
            Err(e) => {
                warn!(error = %e, "Legacy product lookup failed");
                ResolvedProduct::unknown()
            }
        }
    }

    async fn probe(&self, category: Category, product_id: ProductId) -> Option<Product> {
        match self.db.get_product_by_id(category, product_id).await {
            Ok(product) => product,
            Err(e) => {
                warn!(category = %category, error = %e, "Product probe failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;
    use crate::models::product::tests::sample_product;

    fn cache() -> CategoryCache {
        build_category_cache(Duration::from_secs(60))
    }

    fn with_badge(category: Category, title: &str, badge: &str) -> Product {
        let mut product = sample_product(category, title, 10_00);
        product.badges = vec![badge.to_owned()];
        product
    }

    #[tokio::test]
    async fn test_badge_view_tags_and_orders_by_category() {
        let db = MemoryDatabase::new();
        db.insert_product(with_badge(Category::Oils, "Argan", "bestseller"))
            .await;
        db.insert_product(with_badge(Category::Soaps, "Oat", "Bestseller"))
            .await;
        db.insert_product(with_badge(Category::Soaps, "Mint", "new"))
            .await;
        let cache = cache();
        let catalog = CatalogService::new(&db, &cache);

        let products = catalog.products_with_badge("bestseller").await;
        let seen: Vec<_> = products
            .iter()
            .map(|p| (p.category(), p.title.as_str()))
            .collect();
        assert_eq!(
            seen,
            [(Category::Soaps, "Oat"), (Category::Oils, "Argan")]
        );
    }

    #[tokio::test]
    async fn test_badge_view_skips_failing_category() {
        let db = MemoryDatabase::new();
        db.insert_product(with_badge(Category::Soaps, "Oat", "sale"))
            .await;
        db.insert_product(with_badge(Category::Lotions, "Aloe", "sale"))
            .await;
        db.set_unavailable("lotions", true).await;
        let cache = cache();
        let catalog = CatalogService::new(&db, &cache);

        let products = catalog.products_with_badge("sale").await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title, "Oat");
    }

    #[tokio::test]
    async fn test_list_category_is_cached() {
        let db = MemoryDatabase::new();
        db.insert_product(sample_product(Category::Oils, "Argan", 18_00))
            .await;
        let cache = cache();
        let catalog = CatalogService::new(&db, &cache);

        assert_eq!(catalog.list_category(Category::Oils).await.unwrap().len(), 1);

        // A cached listing survives the table going offline.
        db.set_unavailable("oils", true).await;
        assert_eq!(catalog.list_category(Category::Oils).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_product_probes_in_order() {
        let db = MemoryDatabase::new();
        let shampoo = sample_product(Category::Shampoos, "Rosemary Wash", 14_00);
        let id = shampoo.id;
        db.insert_product(shampoo).await;
        let cache = cache();
        let catalog = CatalogService::new(&db, &cache);

        let resolved = catalog.resolve_product(id, None).await;
        assert_eq!(resolved.name, "Rosemary Wash");
        assert_eq!(resolved.category, Some(Category::Shampoos));

        let hinted = catalog.resolve_product(id, Some(Category::Shampoos)).await;
        assert_eq!(hinted, resolved);
    }

    #[tokio::test]
    async fn test_resolve_product_falls_back_to_legacy_then_unknown() {
        let db = MemoryDatabase::new();
        let legacy = ProductId::generate();
        db.insert_legacy_product(legacy, "Old Balm").await;
        db.set_unavailable("soaps", true).await;
        let cache = cache();
        let catalog = CatalogService::new(&db, &cache);

        let resolved = catalog.resolve_product(legacy, None).await;
        assert_eq!(resolved.name, "Old Balm");
        assert_eq!(resolved.category, None);

        let missing = catalog.resolve_product(ProductId::generate(), None).await;
        assert_eq!(missing.name, UNKNOWN_PRODUCT);
    }

    #[tokio::test]
    async fn test_related_unknown_slug_is_none() {
        let db = MemoryDatabase::new();
        let cache = cache();
        let catalog = CatalogService::new(&db, &cache);
        assert!(
            catalog
                .related(Category::Soaps, "missing", 4)
                .await
                .unwrap()
                .is_none()
        );
    }
}
