//! Vitrine Storage - Memo Cache and Cached Catalog
//!
//! The storefront's caching layer: an in-process TTL cache with single-flight
//! loading, the catalog facade that memoizes upstream reads through it, and
//! instrumentation for the upstream calls themselves.

pub mod cache;
pub mod catalog;
pub mod instrument;
pub mod mock;
pub mod telemetry;

pub use cache::{
    namespace_of, CacheKey, CacheReport, CacheStats, KeyInfo, MemoCache, Namespace,
    NamespaceCount,
};
pub use catalog::{CachedCatalog, CatalogOp, CatalogSource};
pub use instrument::{CallMetrics, InstrumentedSource};
pub use mock::MockCatalog;
pub use telemetry::init_tracing;
