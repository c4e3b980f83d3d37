//! Base level resolution.
//!
//! Base levels are the only zoom levels at which the loader is invoked. Every
//! other request is answered from the nearest base level, either by filtering
//! an ancestor tile or by aggregating descendant tiles.

use crate::tiling::EARTH_RADIUS_METERS;
use std::f64::consts::PI;

/// Number of entries in the resolution table (levels `0..=24`).
pub const LEVEL_COUNT: usize = 25;

pub const MAX_LEVEL: u32 = (LEVEL_COUNT - 1) as u32;

pub const DEFAULT_BASE_LEVEL: u32 = 15;

/// Configured base levels, deduplicated and sorted finest first.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseLevels {
    levels: Vec<u32>,
    resolutions: [f64; LEVEL_COUNT],
}

impl BaseLevels {
    /// Builds the resolver. Levels above [`MAX_LEVEL`] are clamped and an
    /// empty list falls back to [`DEFAULT_BASE_LEVEL`].
    pub fn new(levels: impl IntoIterator<Item = u32>, tile_size: u32) -> Self {
        let mut levels: Vec<u32> = levels.into_iter().map(|l| l.min(MAX_LEVEL)).collect();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels.dedup();
        if levels.is_empty() {
            levels.push(DEFAULT_BASE_LEVEL);
        }

        Self {
            levels,
            resolutions: resolution_table(tile_size.max(1)),
        }
    }

    /// Levels, finest first.
    pub fn levels(&self) -> &[u32] {
        &self.levels
    }

    pub fn contains(&self, level: u32) -> bool {
        self.levels.contains(&level)
    }

    pub fn coarsest(&self) -> u32 {
        // Never empty, see `new`.
        self.levels.last().copied().unwrap_or(DEFAULT_BASE_LEVEL)
    }

    pub fn finest(&self) -> u32 {
        self.levels.first().copied().unwrap_or(DEFAULT_BASE_LEVEL)
    }

    /// Resolution in projected units per pixel at `level`.
    pub fn level_resolution(&self, level: u32) -> f64 {
        self.resolutions[(level as usize).min(LEVEL_COUNT - 1)]
    }

    /// The finest base level at or above `level` in the quad-tree, i.e. the
    /// base level whose tiles contain tiles of `level`. `None` when `level`
    /// is coarser than every base level.
    pub fn nearest_ancestor(&self, level: u32) -> Option<u32> {
        self.levels.iter().copied().find(|&base| base <= level)
    }

    /// Picks the base level for a map resolution at a latitude.
    ///
    /// The resolution is stretched by `1 / cos(latitude)` to account for
    /// mercator distortion, then the coarsest base level whose own resolution
    /// is at least as fine is chosen. Falls back to the coarsest base level.
    pub fn resolve_for_resolution(&self, resolution: f64, latitude: f64) -> u32 {
        let cos = latitude.to_radians().cos().abs().max(f64::EPSILON);
        let scaled = resolution / cos;

        self.levels
            .iter()
            .rev()
            .copied()
            .find(|&level| self.level_resolution(level) <= scaled)
            .unwrap_or_else(|| self.coarsest())
    }
}

impl Default for BaseLevels {
    fn default() -> Self {
        Self::new([DEFAULT_BASE_LEVEL], 256)
    }
}

fn resolution_table(tile_size: u32) -> [f64; LEVEL_COUNT] {
    let circumference = 2.0 * PI * EARTH_RADIUS_METERS;
    let mut table = [0.0; LEVEL_COUNT];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = circumference / tile_size as f64 / 2.0_f64.powi(i as i32 + 1);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_sorted_and_deduplicated() {
        let levels = BaseLevels::new([10, 14, 10, 12], 256);
        assert_eq!(levels.levels(), &[14, 12, 10]);
        assert_eq!(levels.finest(), 14);
        assert_eq!(levels.coarsest(), 10);
    }

    #[test]
    fn test_empty_levels_fall_back_to_default() {
        let levels = BaseLevels::new(Vec::new(), 256);
        assert_eq!(levels.levels(), &[DEFAULT_BASE_LEVEL]);
    }

    #[test]
    fn test_levels_are_clamped() {
        let levels = BaseLevels::new([40, 3], 256);
        assert_eq!(levels.levels(), &[MAX_LEVEL, 3]);
    }

    #[test]
    fn test_nearest_ancestor() {
        let levels = BaseLevels::new([10, 14], 256);
        assert_eq!(levels.nearest_ancestor(16), Some(14));
        assert_eq!(levels.nearest_ancestor(14), Some(14));
        assert_eq!(levels.nearest_ancestor(13), Some(10));
        assert_eq!(levels.nearest_ancestor(10), Some(10));
        assert_eq!(levels.nearest_ancestor(9), None);
    }

    #[test]
    fn test_resolution_table_halves_per_level() {
        let levels = BaseLevels::default();
        let first = levels.level_resolution(0);
        assert!((first - 78_271.516_964_020_48).abs() < 1e-6);
        for level in 1..LEVEL_COUNT as u32 {
            let ratio = levels.level_resolution(level - 1) / levels.level_resolution(level);
            assert!((ratio - 2.0).abs() < 1e-12);
        }
        assert_eq!(levels.level_resolution(100), levels.level_resolution(MAX_LEVEL));
    }

    #[test]
    fn test_resolve_for_resolution_at_equator() {
        let levels = BaseLevels::new([8, 12, 16], 256);

        // Coarse view: the coarsest level is already fine enough.
        assert_eq!(levels.resolve_for_resolution(10_000.0, 0.0), 8);

        // Exactly the level-12 resolution: 12 is the coarsest that is fine enough.
        let at_twelve = levels.level_resolution(12);
        assert_eq!(levels.resolve_for_resolution(at_twelve, 0.0), 12);

        // Slightly coarser than level 8's resolution picks 8.
        let just_over_eight = levels.level_resolution(8) * 1.01;
        assert_eq!(levels.resolve_for_resolution(just_over_eight, 0.0), 8);

        // Finer than every level: fall back to the coarsest.
        assert_eq!(levels.resolve_for_resolution(0.01, 0.0), 8);
    }

    #[test]
    fn test_resolve_for_resolution_accounts_for_latitude() {
        let levels = BaseLevels::new([12, 16], 256);
        let resolution = levels.level_resolution(16) * 0.9;

        // Too fine for level 16 at the equator...
        assert_eq!(levels.resolve_for_resolution(resolution, 0.0), 12);
        // ...but stretched by 1/cos(60°) = 2 it qualifies.
        assert_eq!(levels.resolve_for_resolution(resolution, 60.0), 16);
    }
}
