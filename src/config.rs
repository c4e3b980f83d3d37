//! Tile cache configuration.
//!
//! Configuration is fixed at construction time. Out-of-range values are not
//! rejected: [`Config::normalized`] clamps them to the nearest valid value and
//! logs what it changed.
//!
//! ```rust
//! use spatio_tiles::Config;
//!
//! let json = r#"{
//!     "tile_cache_size": 100,
//!     "base_levels": [10, 14, 10],
//!     "allow_tile_aggregation": false
//! }"#;
//! let config = Config::from_json(json).unwrap();
//! assert_eq!(config.base_levels, vec![14, 10]);
//! assert!(config.track_features_to_tiles);
//! ```

use crate::error::Result;
use crate::levels::{DEFAULT_BASE_LEVEL, MAX_LEVEL};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum number of tiles kept per base level.
    #[serde(default = "Config::default_tile_cache_size")]
    pub tile_cache_size: usize,

    /// Levels at which the loader is invoked.
    #[serde(default = "Config::default_base_levels")]
    pub base_levels: Vec<u32>,

    /// Maintain the feature id → tile reverse index.
    #[serde(default = "Config::default_true")]
    pub track_features_to_tiles: bool,

    /// Answer levels up to two steps coarser than the coarsest base level by
    /// combining child tiles.
    #[serde(default = "Config::default_true")]
    pub allow_tile_aggregation: bool,

    /// Tile edge length in pixels, used for the resolution table.
    #[serde(default = "Config::default_tile_size")]
    pub tile_size: u32,

    /// Buffered tile-loaded events per subscriber.
    #[serde(default = "Config::default_event_capacity")]
    pub event_capacity: usize,
}

impl Config {
    const fn default_tile_cache_size() -> usize {
        50
    }

    fn default_base_levels() -> Vec<u32> {
        vec![DEFAULT_BASE_LEVEL]
    }

    const fn default_true() -> bool {
        true
    }

    const fn default_tile_size() -> u32 {
        256
    }

    const fn default_event_capacity() -> usize {
        64
    }

    pub fn with_tile_cache_size(mut self, size: usize) -> Self {
        self.tile_cache_size = size;
        self
    }

    pub fn with_base_levels(mut self, levels: impl IntoIterator<Item = u32>) -> Self {
        self.base_levels = levels.into_iter().collect();
        self
    }

    pub fn with_feature_tracking(mut self, enabled: bool) -> Self {
        self.track_features_to_tiles = enabled;
        self
    }

    pub fn with_tile_aggregation(mut self, enabled: bool) -> Self {
        self.allow_tile_aggregation = enabled;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Returns a copy with every field forced into its valid range.
    pub fn normalized(mut self) -> Self {
        if self.tile_cache_size == 0 {
            log::warn!("tile_cache_size of 0 is not usable, using 1");
            self.tile_cache_size = 1;
        }

        if self.base_levels.iter().any(|&level| level > MAX_LEVEL) {
            log::warn!("Base levels above {} are clamped to {}", MAX_LEVEL, MAX_LEVEL);
        }
        let mut levels: Vec<u32> = self
            .base_levels
            .iter()
            .map(|&level| level.min(MAX_LEVEL))
            .collect();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels.dedup();
        if levels.is_empty() {
            log::warn!("No base levels configured, using {}", DEFAULT_BASE_LEVEL);
            levels.push(DEFAULT_BASE_LEVEL);
        }
        self.base_levels = levels;

        if self.tile_size == 0 {
            log::warn!("tile_size of 0 is not usable, using {}", Self::default_tile_size());
            self.tile_size = Self::default_tile_size();
        }

        if self.event_capacity == 0 {
            self.event_capacity = 1;
        }

        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str)?;
        Ok(config.normalized())
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::error::TileCacheError::Config(e.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tile_cache_size: Self::default_tile_cache_size(),
            base_levels: Self::default_base_levels(),
            track_features_to_tiles: true,
            allow_tile_aggregation: true,
            tile_size: Self::default_tile_size(),
            event_capacity: Self::default_event_capacity(),
        }
    }
}
