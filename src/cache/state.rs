//! Mutable cache bookkeeping, always accessed under the cache lock.

use super::stats::CacheStats;
use crate::index::TileIndex;
use crate::membership::FeatureTileMembership;
use crate::types::TileKey;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Handle every caller for one tile awaits.
pub type SharedIndex = Shared<BoxFuture<'static, Arc<TileIndex>>>;

pub(crate) struct CacheEntry {
    /// Distinguishes successive entries for the same key, so a load that
    /// finishes after its entry was evicted cannot register itself.
    pub generation: u64,
    pub future: SharedIndex,
}

pub(crate) struct CacheState {
    stores: FxHashMap<u32, LruCache<TileKey, CacheEntry>>,
    capacity: usize,
    /// Resolved indexes of live entries.
    live: FxHashMap<TileKey, Arc<TileIndex>>,
    membership: FeatureTileMembership,
    track_features: bool,
    next_generation: u64,
    pub stats: CacheStats,
}

impl CacheState {
    pub fn new(levels: &[u32], capacity: usize, track_features: bool) -> Self {
        let stores = levels
            .iter()
            .map(|&level| (level, LruCache::unbounded()))
            .collect();

        Self {
            stores,
            capacity: capacity.max(1),
            live: FxHashMap::default(),
            membership: FeatureTileMembership::new(),
            track_features,
            next_generation: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Existing entry for `key`, marking it most recently used.
    pub fn lookup(&mut self, level: u32, key: &TileKey) -> Option<SharedIndex> {
        self.stores
            .get_mut(&level)?
            .get(key)
            .map(|entry| entry.future.clone())
    }

    pub fn contains(&self, level: u32, key: &TileKey) -> bool {
        self.stores
            .get(&level)
            .is_some_and(|store| store.contains(key))
    }

    /// Stores a new entry and evicts whatever no longer fits.
    pub fn insert(&mut self, level: u32, key: TileKey, entry: CacheEntry) -> Vec<CacheEntry> {
        self.stores
            .entry(level)
            .or_insert_with(LruCache::unbounded)
            .put(key, entry);
        self.evict_overflow()
    }

    /// Records a finished load if its entry is still the live one.
    pub fn register(
        &mut self,
        level: u32,
        key: &TileKey,
        generation: u64,
        index: &Arc<TileIndex>,
    ) -> bool {
        let current = self
            .stores
            .get(&level)
            .and_then(|store| store.peek(key))
            .map(|entry| entry.generation);
        if current != Some(generation) {
            self.stats.discarded_results += 1;
            return false;
        }

        self.live.insert(key.clone(), Arc::clone(index));
        if self.track_features {
            self.membership.add_tile(key, index.feature_ids());
        }
        true
    }

    pub fn set_capacity(&mut self, capacity: usize) -> Vec<CacheEntry> {
        self.capacity = capacity.max(1);
        self.evict_overflow()
    }

    fn evict_overflow(&mut self) -> Vec<CacheEntry> {
        let capacity = self.capacity;
        let mut evicted_keys = Vec::new();
        let mut evicted = Vec::new();

        for store in self.stores.values_mut() {
            while store.len() > capacity {
                match store.pop_lru() {
                    Some((key, entry)) => {
                        evicted_keys.push(key);
                        evicted.push(entry);
                    }
                    None => break,
                }
            }
        }

        for key in &evicted_keys {
            log::debug!("Evicting tile {}", key);
            self.forget(key);
        }
        self.stats.evictions += evicted_keys.len() as u64;
        evicted
    }

    fn forget(&mut self, key: &TileKey) {
        if let Some(index) = self.live.remove(key)
            && self.track_features
        {
            self.membership.remove_tile(key, index.feature_ids());
        }
    }

    /// Futures of every entry, pending or resolved.
    pub fn futures(&self) -> Vec<SharedIndex> {
        self.stores
            .values()
            .flat_map(|store| store.iter().map(|(_, entry)| entry.future.clone()))
            .collect()
    }

    pub fn live_indexes(&self) -> Vec<Arc<TileIndex>> {
        self.live.values().cloned().collect()
    }

    pub fn live_index(&self, key: &TileKey) -> Option<Arc<TileIndex>> {
        self.live.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<TileKey> {
        let mut keys: Vec<TileKey> = self
            .stores
            .values()
            .flat_map(|store| store.iter().map(|(key, _)| key.clone()))
            .collect();
        keys.sort();
        keys
    }

    pub fn level_len(&self, level: u32) -> usize {
        self.stores.get(&level).map_or(0, |store| store.len())
    }

    pub fn len(&self) -> usize {
        self.stores.values().map(|store| store.len()).sum()
    }

    pub fn membership(&self) -> &FeatureTileMembership {
        &self.membership
    }

    pub fn clear(&mut self) {
        for store in self.stores.values_mut() {
            store.clear();
        }
        self.live.clear();
        self.membership.clear();
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            cached_tiles: self.len(),
            resolved_tiles: self.live.len(),
            tracked_features: self.membership.len(),
            ..self.stats.clone()
        }
    }
}
