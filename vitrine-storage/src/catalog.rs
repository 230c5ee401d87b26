//! Cached access to the storefront catalog.
//!
//! Route handlers talk to [`CachedCatalog`] instead of the upstream source.
//! Reads go through [`MemoCache::wrap`], so a burst of requests for the product
//! listing costs one database query per TTL window. Writes pass through to
//! the source and drop the affected namespace.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vitrine_core::{OrderSummary, Product, ProductId, Theme, UserId, VitrineResult};

use crate::cache::{CacheKey, MemoCache, Namespace};

/// The operations of [`CatalogSource`], for per-operation bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CatalogOp {
    ListProducts,
    GetProduct,
    OrderSummary,
    Theme,
    UpdateProduct,
}

impl CatalogOp {
    /// All operations.
    pub const ALL: [CatalogOp; 5] = [
        CatalogOp::ListProducts,
        CatalogOp::GetProduct,
        CatalogOp::OrderSummary,
        CatalogOp::Theme,
        CatalogOp::UpdateProduct,
    ];

    /// Stable name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListProducts => "list_products",
            Self::GetProduct => "get_product",
            Self::OrderSummary => "order_summary",
            Self::Theme => "theme",
            Self::UpdateProduct => "update_product",
        }
    }
}

impl std::fmt::Display for CatalogOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream source of catalog data (managed database, auth provider).
///
/// Implementations must be cheap to share; the cache clones an `Arc` of the
/// source into every load it starts.
#[async_trait]
pub trait CatalogSource: Send + Sync + 'static {
    /// List every active product.
    async fn list_products(&self) -> VitrineResult<Vec<Product>>;

    /// Get a single product.
    async fn get_product(&self, id: ProductId) -> VitrineResult<Product>;

    /// Summarize a customer's orders.
    async fn order_summary(&self, user_id: UserId) -> VitrineResult<OrderSummary>;

    /// Look up a storefront theme by name.
    async fn theme(&self, name: &str) -> VitrineResult<Theme>;

    /// Persist changes to a product, returning the stored version.
    async fn update_product(&self, product: &Product) -> VitrineResult<Product>;
}

#[async_trait]
impl<S: CatalogSource + ?Sized> CatalogSource for Arc<S> {
    async fn list_products(&self) -> VitrineResult<Vec<Product>> {
        (**self).list_products().await
    }

    async fn get_product(&self, id: ProductId) -> VitrineResult<Product> {
        (**self).get_product(id).await
    }

    async fn order_summary(&self, user_id: UserId) -> VitrineResult<OrderSummary> {
        (**self).order_summary(user_id).await
    }

    async fn theme(&self, name: &str) -> VitrineResult<Theme> {
        (**self).theme(name).await
    }

    async fn update_product(&self, product: &Product) -> VitrineResult<Product> {
        (**self).update_product(product).await
    }
}

/// Catalog reads memoized in a shared [`MemoCache`].
///
/// # Usage
///
/// ```ignore
/// let catalog = CachedCatalog::new(Arc::new(source), Arc::clone(&cache));
/// let products = catalog.all_products().await?;
/// ```
pub struct CachedCatalog<S: CatalogSource> {
    source: Arc<S>,
    cache: Arc<MemoCache>,
}

impl<S: CatalogSource> CachedCatalog<S> {
    /// Create a cached catalog over `source`.
    pub fn new(source: Arc<S>, cache: Arc<MemoCache>) -> Self {
        Self { source, cache }
    }

    /// Get a reference to the upstream source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a reference to the cache.
    pub fn cache(&self) -> &MemoCache {
        &self.cache
    }

    /// Key of the full product listing.
    pub fn all_products_key() -> String {
        CacheKey::new(Namespace::Product).part("all").to_string()
    }

    /// Key of a single product.
    pub fn product_key(id: ProductId) -> String {
        CacheKey::new(Namespace::Product).part(id).to_string()
    }

    /// Key of a customer's order summary.
    pub fn order_summary_key(user_id: UserId) -> String {
        CacheKey::new(Namespace::Order)
            .part("summary")
            .part(user_id)
            .to_string()
    }

    /// Key of a theme.
    pub fn theme_key(name: &str) -> String {
        CacheKey::new(Namespace::Theme).part(name).to_string()
    }

    /// The full product listing.
    pub async fn all_products(&self) -> VitrineResult<Arc<Vec<Product>>> {
        let source = Arc::clone(&self.source);
        let ttl = Namespace::Product.ttl(self.cache.settings());
        self.cache
            .wrap(&Self::all_products_key(), ttl, move || async move {
                source.list_products().await
            })
            .await
    }

    /// A single product.
    pub async fn product(&self, id: ProductId) -> VitrineResult<Arc<Product>> {
        let source = Arc::clone(&self.source);
        let ttl = Namespace::Product.ttl(self.cache.settings());
        self.cache
            .wrap(&Self::product_key(id), ttl, move || async move {
                source.get_product(id).await
            })
            .await
    }

    /// A customer's order summary.
    pub async fn order_summary(&self, user_id: UserId) -> VitrineResult<Arc<OrderSummary>> {
        let source = Arc::clone(&self.source);
        let ttl = Namespace::Order.ttl(self.cache.settings());
        self.cache
            .wrap(&Self::order_summary_key(user_id), ttl, move || async move {
                source.order_summary(user_id).await
            })
            .await
    }

    /// A storefront theme.
    pub async fn theme(&self, name: &str) -> VitrineResult<Arc<Theme>> {
        let source = Arc::clone(&self.source);
        let owned = name.to_string();
        let ttl = Namespace::Theme.ttl(self.cache.settings());
        self.cache
            .wrap(&Self::theme_key(name), ttl, move || async move {
                source.theme(&owned).await
            })
            .await
    }

    /// Write a product through to the source and drop every cached product.
    ///
    /// Listings embed products, so the whole namespace goes, not just the
    /// product's own key.
    pub async fn update_product(&self, product: &Product) -> VitrineResult<Product> {
        let stored = self.source.update_product(product).await?;
        let removed = self.invalidate(Namespace::Product);
        debug!(product_id = %stored.product_id, removed, "product updated, cache invalidated");
        Ok(stored)
    }

    /// Drop every cached entry in `namespace` and keep loads already in flight
    /// there from caching their result. Returns how many entries were removed.
    pub fn invalidate(&self, namespace: Namespace) -> usize {
        self.cache.clear_namespace(namespace.prefix())
    }
}

impl<S: CatalogSource> Clone for CachedCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cache: Arc::clone(&self.cache),
        }
    }
}
