//! In-process memo cache for the storefront.
//!
//! This module provides [`MemoCache`], a key/value store with per-entry TTL
//! and single-flight loading, together with the helpers built around it.
//!
//! # Keys
//!
//! Keys are plain strings shaped `"<namespace>:<part>..."`. [`CacheKey`] and
//! [`Namespace`] build them for the storefront's own groups, and
//! `clear_namespace(Namespace::Product.prefix())` drops a whole group.
//!
//! # Values
//!
//! Each call site picks its value type. Reads hand out the stored `Arc<T>`, so
//! readers share one allocation; treat cached values as read-only.
//!
//! # Scope
//!
//! The cache is per process. Instances behind a load balancer each cache
//! independently and may briefly disagree.
//!
//! # Example
//!
//! ```ignore
//! let cache = MemoCache::with_settings(CacheSettings::from_env());
//! let key = CacheKey::new(Namespace::Theme).part("dark").to_string();
//! let theme = cache.wrap(&key, cache.ttl_for(&key), move || async move {
//!     source.theme("dark").await
//! }).await?;
//! ```

pub mod key;
pub mod memo;
pub mod report;
pub mod stats;

pub use key::{namespace_of, CacheKey, Namespace, UnknownNamespace};
pub use memo::{KeyInfo, MemoCache};
pub use report::{CacheReport, NamespaceCount};
pub use stats::CacheStats;
