//! Admin view of the cache.
//!
//! The back-office "cache" page shows what is stored, grouped by namespace,
//! alongside hit/miss statistics. [`CacheReport`] is that page's data,
//! captured in one pass so the numbers agree with each other.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use vitrine_core::Timestamp;

use super::key::namespace_of;
use super::memo::{KeyInfo, MemoCache};
use super::stats::CacheStats;

/// Label used for keys without a namespace segment.
pub const UNNAMESPACED: &str = "(none)";

/// Number of stored entries in one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceCount {
    pub namespace: String,
    pub entries: usize,
}

/// Snapshot of the cache for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheReport {
    pub generated_at: Timestamp,
    pub entries: Vec<KeyInfo>,
    pub namespaces: Vec<NamespaceCount>,
    pub stats: CacheStats,
    pub hit_rate: f64,
}

impl CacheReport {
    /// Capture a report from `cache`.
    pub fn capture(cache: &MemoCache) -> Self {
        let entries = cache.list_keys();
        let stats = cache.stats();

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for info in &entries {
            let namespace = namespace_of(&info.key).unwrap_or(UNNAMESPACED);
            *counts.entry(namespace).or_default() += 1;
        }
        let namespaces = counts
            .into_iter()
            .map(|(namespace, entries)| NamespaceCount {
                namespace: namespace.to_string(),
                entries,
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            hit_rate: stats.hit_rate(),
            entries,
            namespaces,
            stats,
        }
    }

    /// Entries that never expire.
    pub fn persistent_entries(&self) -> impl Iterator<Item = &KeyInfo> {
        self.entries.iter().filter(|info| info.never_expires())
    }

    /// Render as indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl MemoCache {
    /// Capture an admin report of this cache.
    pub fn report(&self) -> CacheReport {
        CacheReport::capture(self)
    }
}
