//! Vitrine Test Utilities
//!
//! Shared test infrastructure for the Vitrine workspace:
//! - Fixtures for products, orders, and themes
//! - A counting loader for single-flight assertions
//! - Proptest generators for cache keys and entities

// Re-export the mock source from its home crate
pub use vitrine_storage::MockCatalog;

// Re-export core types for convenience
pub use vitrine_core::{
    CacheSettings, CatalogError, EntityIdType, OrderDigest, OrderId, OrderStatus, OrderSummary,
    Product, ProductId, Theme, UserId, VitrineError, VitrineResult,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt};

// ============================================================================
// FIXTURES
// ============================================================================

/// An active, in-stock product with the given name.
pub fn product(name: &str) -> Product {
    Product {
        product_id: ProductId::now_v7(),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        description: Some(format!("{} from the test catalog", name)),
        price_cents: 1_500,
        currency: "EUR".to_string(),
        stock: 10,
        active: true,
        updated_at: Utc::now(),
    }
}

/// `count` distinct active products.
pub fn products(count: usize) -> Vec<Product> {
    (0..count).map(|i| product(&format!("Product {}", i))).collect()
}

/// An order placed `hours_ago` hours ago.
pub fn order(status: OrderStatus, total_cents: i64, hours_ago: i64) -> OrderDigest {
    OrderDigest {
        order_id: OrderId::now_v7(),
        status,
        total_cents,
        item_count: 1,
        placed_at: Utc::now() - chrono::Duration::hours(hours_ago),
    }
}

/// A theme with the given name.
pub fn theme(name: &str) -> Theme {
    Theme {
        name: name.to_string(),
        primary_color: "#202020".to_string(),
        accent_color: "#3d7dca".to_string(),
        logo_url: Some(format!("https://cdn.example.test/{}.svg", name)),
    }
}

/// A mock catalog seeded with `product_count` products, a `default` theme, and
/// two orders for the returned user.
pub fn seeded_catalog(product_count: usize) -> (MockCatalog, UserId) {
    let catalog = MockCatalog::new();
    for p in products(product_count) {
        catalog.insert_product(p);
    }
    catalog.insert_theme(theme("default"));

    let user_id = UserId::now_v7();
    catalog.insert_orders(
        user_id,
        vec![
            order(OrderStatus::Paid, 4_200, 48),
            order(OrderStatus::Pending, 1_000, 1),
        ],
    );
    (catalog, user_id)
}

// ============================================================================
// COUNTING LOADER
// ============================================================================

/// Hands out loaders that count their invocations.
///
/// Each loader sleeps for `delay` and then resolves to the configured value,
/// or fails for the first `failures` invocations.
#[derive(Debug, Clone)]
pub struct CountingLoader<T> {
    calls: Arc<AtomicUsize>,
    delay: Duration,
    value: T,
    failures: usize,
}

impl<T> CountingLoader<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Loaders resolving to `value` after `delay`.
    pub fn new(value: T, delay: Duration) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay,
            value,
            failures: 0,
        }
    }

    /// Fail the first `failures` invocations with an unavailable upstream.
    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    /// Number of loader invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A fresh loader sharing this counter.
    pub fn loader(&self) -> impl FnOnce() -> BoxFuture<'static, VitrineResult<T>> + Send + 'static {
        let calls = Arc::clone(&self.calls);
        let delay = self.delay;
        let value = self.value.clone();
        let failures = self.failures;
        move || {
            async move {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if call < failures {
                    Err(CatalogError::unavailable("test-upstream", format!("failure #{}", call + 1)).into())
                } else {
                    Ok(value)
                }
            }
            .boxed()
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;
    use vitrine_storage::Namespace;

    /// Any storefront namespace.
    pub fn arb_namespace() -> impl Strategy<Value = Namespace> {
        prop::sample::select(Namespace::ALL.to_vec())
    }

    /// A raw key `"<namespace>:<part>"` in one of the storefront namespaces.
    pub fn arb_key() -> impl Strategy<Value = String> {
        (arb_namespace(), "[a-z0-9-]{1,16}")
            .prop_map(|(ns, part)| format!("{}{}", ns.prefix(), part))
    }

    /// A set of distinct raw keys.
    pub fn arb_keys(max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set(arb_key(), 0..max).prop_map(|set| set.into_iter().collect())
    }

    /// A product with arbitrary price, stock, and activity.
    pub fn arb_product() -> impl Strategy<Value = Product> {
        ("[A-Za-z ]{1,24}", 0i64..1_000_000, -5i32..100, any::<bool>()).prop_map(
            |(name, price_cents, stock, active)| Product {
                price_cents,
                stock,
                active,
                ..product(&name)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counting_loader_counts_and_fails_first() {
        let loaders = CountingLoader::new(5u32, Duration::ZERO).failing_first(1);
        assert!((loaders.loader())().await.is_err());
        assert_eq!((loaders.loader())().await.unwrap(), 5);
        assert_eq!(loaders.calls(), 2);
    }

    #[test]
    fn test_seeded_catalog() {
        let (catalog, _user) = seeded_catalog(3);
        assert_eq!(catalog.product_count(), 3);
    }
}
