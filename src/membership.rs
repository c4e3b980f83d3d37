//! Reverse index from feature id to the cached tiles holding that feature.
//!
//! Used for external visibility control: a consumer hiding a feature needs to
//! know every tile whose rendered content includes it.

use crate::types::TileKey;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Default)]
pub struct FeatureTileMembership {
    tiles_by_feature: FxHashMap<String, FxHashSet<TileKey>>,
}

impl FeatureTileMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `tile` holds every feature in `feature_ids`.
    pub fn add_tile<'a>(&mut self, tile: &TileKey, feature_ids: impl IntoIterator<Item = &'a str>) {
        for id in feature_ids {
            self.tiles_by_feature
                .entry(id.to_string())
                .or_default()
                .insert(tile.clone());
        }
    }

    /// Drops `tile` from the memberships of `feature_ids`, forgetting features
    /// left without any tile.
    pub fn remove_tile<'a>(&mut self, tile: &TileKey, feature_ids: impl IntoIterator<Item = &'a str>) {
        for id in feature_ids {
            if let Some(tiles) = self.tiles_by_feature.get_mut(id) {
                tiles.remove(tile);
                if tiles.is_empty() {
                    self.tiles_by_feature.remove(id);
                }
            }
        }
    }

    /// Tiles currently holding the feature, sorted for stable output.
    pub fn tiles_for(&self, feature_id: &str) -> Vec<TileKey> {
        let mut tiles: Vec<TileKey> = self
            .tiles_by_feature
            .get(feature_id)
            .map(|tiles| tiles.iter().cloned().collect())
            .unwrap_or_default();
        tiles.sort();
        tiles
    }

    pub fn contains_feature(&self, feature_id: &str) -> bool {
        self.tiles_by_feature.contains_key(feature_id)
    }

    /// Number of distinct features tracked.
    pub fn len(&self) -> usize {
        self.tiles_by_feature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles_by_feature.is_empty()
    }

    pub fn clear(&mut self) {
        self.tiles_by_feature.clear();
    }
}
