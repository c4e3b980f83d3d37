//! Planning how a requested tile is answered.
//!
//! A tile at a base level is served whole. A tile below a base level (finer,
//! higher level number) is cut out of its base-level ancestor with a range
//! query. A tile coarser than every base level is stitched together from its
//! children, recursing until the children sit on a base level; this only
//! reaches [`MAX_AGGREGATION_GAP`] levels down, so a request fans out to at
//! most 16 base tiles.

use crate::levels::BaseLevels;
use crate::types::TileCoord;

/// Largest distance between a requested level and the coarsest base level
/// that aggregation will bridge.
pub const MAX_AGGREGATION_GAP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilePlan {
    /// The tile is itself a base tile; return all of its features.
    Whole(TileCoord),
    /// Range-query the base-level ancestor with the requested tile's bounds.
    Filter { base: TileCoord },
    /// Concatenate the answers for the four children.
    Aggregate([TileCoord; 4]),
    /// Nothing can answer this tile.
    Unavailable,
}

pub fn plan(levels: &BaseLevels, coord: TileCoord, allow_aggregation: bool) -> TilePlan {
    if !coord.in_range() {
        return TilePlan::Unavailable;
    }

    if let Some(base_level) = levels.nearest_ancestor(coord.level) {
        return match coord.ancestor_at(base_level) {
            Some(base) if base_level == coord.level => TilePlan::Whole(base),
            Some(base) => TilePlan::Filter { base },
            None => TilePlan::Unavailable,
        };
    }

    let gap = levels.coarsest() - coord.level;
    if allow_aggregation && gap <= MAX_AGGREGATION_GAP {
        TilePlan::Aggregate(coord.children())
    } else {
        TilePlan::Unavailable
    }
}

/// Base tiles an aggregated request ends up reading, in visiting order.
pub fn leaf_tiles(levels: &BaseLevels, coord: TileCoord, allow_aggregation: bool) -> Vec<TileCoord> {
    match plan(levels, coord, allow_aggregation) {
        TilePlan::Whole(base) | TilePlan::Filter { base } => vec![base],
        TilePlan::Aggregate(children) => children
            .iter()
            .flat_map(|child| leaf_tiles(levels, *child, allow_aggregation))
            .collect(),
        TilePlan::Unavailable => Vec::new(),
    }
}
