//! Namespaced cache keys.
//!
//! Keys on the [`MemoCache`](super::MemoCache) API are plain strings. By
//! convention they read `"<namespace>:<part>:<part>..."` so that a whole group
//! can be dropped with one `clear_namespace("<namespace>:")` call. This module
//! builds and parses keys in that shape for the storefront's namespaces.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use vitrine_core::CacheSettings;

/// Separator between the namespace and each key part.
pub const SEPARATOR: char = ':';

/// Logical groups of cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Product listings and single products.
    Product,
    /// Per-customer order summaries.
    Order,
    /// Storefront themes.
    Theme,
    /// Account data fetched from the auth provider.
    User,
    /// Admin dashboard aggregates.
    Stats,
}

impl Namespace {
    /// All namespaces, in display order.
    pub const ALL: [Namespace; 5] = [
        Namespace::Product,
        Namespace::Order,
        Namespace::Theme,
        Namespace::User,
        Namespace::Stats,
    ];

    /// Name used as the first key segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Order => "order",
            Self::Theme => "theme",
            Self::User => "user",
            Self::Stats => "stats",
        }
    }

    /// Prefix to pass to `clear_namespace`, separator included.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Product => "product:",
            Self::Order => "order:",
            Self::Theme => "theme:",
            Self::User => "user:",
            Self::Stats => "stats:",
        }
    }

    /// TTL configured for this namespace.
    pub fn ttl(&self, settings: &CacheSettings) -> Duration {
        match self {
            Self::Product => settings.product_ttl,
            Self::Order => settings.order_ttl,
            Self::Theme => settings.theme_ttl,
            Self::User | Self::Stats => settings.default_ttl,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = UnknownNamespace;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| UnknownNamespace(s.to_string()))
    }
}

/// Returned when parsing a namespace name that is not one of [`Namespace::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cache namespace: {0}")]
pub struct UnknownNamespace(pub String);

/// A structured cache key: a namespace followed by discriminator parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    parts: Vec<String>,
}

impl CacheKey {
    /// Start a key in `namespace` with no parts.
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            parts: Vec::new(),
        }
    }

    /// Append a discriminator part.
    pub fn part(mut self, part: impl fmt::Display) -> Self {
        self.parts.push(part.to_string());
        self
    }

    /// The key's namespace.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// The discriminator parts after the namespace.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Parse a string key produced by [`CacheKey`]'s `Display`.
    ///
    /// Returns `None` for keys outside the known namespaces. Parts that
    /// themselves contained the separator come back split.
    pub fn parse(key: &str) -> Option<Self> {
        let mut segments = key.split(SEPARATOR);
        let namespace = segments.next()?.parse().ok()?;
        Some(Self {
            namespace,
            parts: segments.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace.as_str())?;
        for part in &self.parts {
            write!(f, "{}{}", SEPARATOR, part)?;
        }
        Ok(())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

/// The namespace segment of a raw string key, if it has one.
///
/// Works for any key, not only those in [`Namespace::ALL`].
pub fn namespace_of(key: &str) -> Option<&str> {
    key.split_once(SEPARATOR).map(|(ns, _)| ns)
}
