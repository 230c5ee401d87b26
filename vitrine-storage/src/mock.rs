//! In-memory catalog source for tests and local probing.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use vitrine_core::{
    CatalogError, OrderDigest, OrderSummary, Product, ProductId, Theme, UserId, VitrineError,
    VitrineResult,
};

use crate::catalog::{CatalogOp, CatalogSource};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Catalog source backed by in-memory maps.
///
/// Counts calls per operation, can delay every call, and can be told to fail
/// the next calls with given errors. Failures are consumed in FIFO order by
/// whichever operation runs next.
#[derive(Debug, Default)]
pub struct MockCatalog {
    products: RwLock<BTreeMap<ProductId, Product>>,
    orders: RwLock<HashMap<UserId, Vec<OrderDigest>>>,
    themes: RwLock<HashMap<String, Theme>>,
    latency: RwLock<Duration>,
    pending_failures: Mutex<VecDeque<VitrineError>>,
    calls: [AtomicUsize; 5],
}

impl MockCatalog {
    /// Create an empty mock catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        *write(&self.latency) = latency;
        self
    }

    /// Insert or replace a product.
    pub fn insert_product(&self, product: Product) {
        write(&self.products).insert(product.product_id, product);
    }

    /// Replace a customer's orders.
    pub fn insert_orders(&self, user_id: UserId, orders: Vec<OrderDigest>) {
        write(&self.orders).insert(user_id, orders);
    }

    /// Insert or replace a theme.
    pub fn insert_theme(&self, theme: Theme) {
        write(&self.themes).insert(theme.name.clone(), theme);
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: impl Into<VitrineError>) {
        guard(&self.pending_failures).push_back(error.into());
    }

    /// Number of calls made to `op`.
    pub fn calls(&self, op: CatalogOp) -> usize {
        self.calls[Self::slot(op)].load(Ordering::SeqCst)
    }

    /// Number of calls made to any operation.
    pub fn total_calls(&self) -> usize {
        CatalogOp::ALL.into_iter().map(|op| self.calls(op)).sum()
    }

    /// Get count of stored products.
    pub fn product_count(&self) -> usize {
        read(&self.products).len()
    }

    fn slot(op: CatalogOp) -> usize {
        match op {
            CatalogOp::ListProducts => 0,
            CatalogOp::GetProduct => 1,
            CatalogOp::OrderSummary => 2,
            CatalogOp::Theme => 3,
            CatalogOp::UpdateProduct => 4,
        }
    }

    /// Record the call, wait out the latency, and hand back a queued failure.
    async fn enter(&self, op: CatalogOp) -> VitrineResult<()> {
        self.calls[Self::slot(op)].fetch_add(1, Ordering::SeqCst);

        let latency = *read(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match guard(&self.pending_failures).pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogSource for MockCatalog {
    async fn list_products(&self) -> VitrineResult<Vec<Product>> {
        self.enter(CatalogOp::ListProducts).await?;
        Ok(read(&self.products)
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> VitrineResult<Product> {
        self.enter(CatalogOp::GetProduct).await?;
        read(&self.products)
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("product", id).into())
    }

    async fn order_summary(&self, user_id: UserId) -> VitrineResult<OrderSummary> {
        self.enter(CatalogOp::OrderSummary).await?;
        let orders = read(&self.orders).get(&user_id).cloned().unwrap_or_default();
        Ok(OrderSummary::from_orders(user_id, orders))
    }

    async fn theme(&self, name: &str) -> VitrineResult<Theme> {
        self.enter(CatalogOp::Theme).await?;
        read(&self.themes)
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("theme", name).into())
    }

    async fn update_product(&self, product: &Product) -> VitrineResult<Product> {
        self.enter(CatalogOp::UpdateProduct).await?;
        let mut products = write(&self.products);
        if !products.contains_key(&product.product_id) {
            return Err(CatalogError::not_found("product", product.product_id).into());
        }
        let mut stored = product.clone();
        stored.updated_at = Utc::now();
        products.insert(stored.product_id, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, active: bool) -> Product {
        Product {
            product_id: ProductId::now_v7(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            price_cents: 500,
            currency: "EUR".to_string(),
            stock: 1,
            active,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_products_skips_inactive() {
        let catalog = MockCatalog::new();
        catalog.insert_product(product("Mug", true));
        catalog.insert_product(product("Retired", false));

        let products = catalog.list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Mug");
        assert_eq!(catalog.calls(CatalogOp::ListProducts), 1);
        assert_eq!(catalog.product_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_next_is_consumed_once() {
        let catalog = MockCatalog::new();
        catalog.fail_next(CatalogError::unavailable("postgres", "down"));

        assert!(catalog.order_summary(UserId::nil()).await.is_err());
        let summary = catalog.order_summary(UserId::nil()).await.unwrap();
        assert!(summary.orders.is_empty());
        assert_eq!(catalog.calls(CatalogOp::OrderSummary), 2);
        assert_eq!(catalog.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_update_unknown_product_fails() {
        let catalog = MockCatalog::new();
        let err = catalog.update_product(&product("Ghost", true)).await.unwrap_err();
        assert!(matches!(err, VitrineError::Catalog(CatalogError::NotFound { .. })));
    }
}
