//! Vitrine Core - Entity Types, Errors, Configuration
//!
//! Plain data shared by the storefront's caching layer. All other crates
//! depend on this; nothing here performs I/O.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;

pub use config::{CacheSettings, LogSettings, MAX_TTL};
pub use entities::{OrderDigest, OrderStatus, OrderSummary, Product, Theme};
pub use error::{CatalogError, ConfigError, TelemetryError, VitrineError, VitrineResult};
pub use identity::{EntityIdType, OrderId, ProductId, Timestamp, UserId};
