//! Cache counters.

use serde::{Deserialize, Serialize};

/// Snapshot of tile cache activity since construction (or the last clear for
/// the gauges).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries currently held, pending or resolved, across all base levels.
    pub cached_tiles: usize,
    /// Entries whose index is available.
    pub resolved_tiles: usize,
    /// Loader invocations issued.
    pub loads_started: u64,
    /// Failed loads whose empty fallback index was kept in the cache.
    pub loads_failed: u64,
    /// Requests answered by an existing entry instead of a new load.
    pub cache_hits: u64,
    pub evictions: u64,
    /// Results that arrived after their entry had been evicted or cleared.
    pub discarded_results: u64,
    /// Distinct feature ids in the membership index.
    pub tracked_features: usize,
}

impl CacheStats {
    /// Share of requests served without a new load (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.loads_started;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
