//! Cache usage statistics.

use serde::{Deserialize, Serialize};

/// Statistics about cache usage.
///
/// Counters accumulate from construction (or the last `reset_stats`); the
/// `entry_count` and `in_flight` gauges reflect the moment of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads that found a fresh entry.
    pub hits: u64,
    /// Reads that found nothing usable.
    pub misses: u64,
    /// Loader invocations started by `wrap`.
    pub loads_started: u64,
    /// Loader invocations that returned an error.
    pub load_failures: u64,
    /// `wrap` callers that attached to a load already in flight.
    pub coalesced_waits: u64,
    /// Entries dropped because their TTL had passed.
    pub expirations: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
    /// Number of loads currently in flight.
    pub in_flight: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
