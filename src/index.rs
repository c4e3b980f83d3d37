//! Per-tile spatial index.
//!
//! Each resolved tile owns one static R*-tree over the bounding boxes of its
//! features. The tree is bulk-loaded once and never mutated; a reload builds a
//! new index from scratch.

use crate::types::{Feature, FeatureRef, TileKey};
use geo::Rect;
use rstar::{AABB, RTree, RTreeObject};
use std::sync::Arc;
use uuid::Uuid;

/// How a tile's index came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileStatus {
    /// The loader returned features (possibly none).
    Loaded,
    /// The loader failed; the index is empty and stays so until evicted.
    Failed(String),
}

/// A feature's bounding box inside the R*-tree.
#[derive(Debug, Clone)]
pub struct IndexedFeature {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub feature: FeatureRef,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// Immutable bounding-box index over one tile's features.
pub struct TileIndex {
    tile: TileKey,
    status: TileStatus,
    /// Indexed features in loader order.
    features: Vec<FeatureRef>,
    tree: RTree<IndexedFeature>,
}

impl TileIndex {
    /// Builds the index, assigning a UUID to every feature without an id and
    /// skipping features without usable bounds.
    pub fn build(tile: TileKey, features: Vec<Feature>) -> Self {
        let mut indexed = Vec::with_capacity(features.len());
        let mut entries = Vec::with_capacity(features.len());
        let mut skipped = 0usize;

        for mut feature in features {
            let Some(bounds) = feature.bounds() else {
                skipped += 1;
                continue;
            };
            if feature.id.is_empty() {
                feature.id = Uuid::new_v4().to_string();
            }

            let feature = Arc::new(feature);
            entries.push(IndexedFeature {
                min_x: bounds.min().x,
                min_y: bounds.min().y,
                max_x: bounds.max().x,
                max_y: bounds.max().y,
                feature: Arc::clone(&feature),
            });
            indexed.push(feature);
        }

        if skipped > 0 {
            log::debug!("Tile {}: skipped {} features without usable geometry", tile, skipped);
        }

        Self {
            tile,
            status: TileStatus::Loaded,
            features: indexed,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Empty index standing in for a tile whose load failed.
    pub fn failed(tile: TileKey, reason: impl Into<String>) -> Self {
        Self {
            tile,
            status: TileStatus::Failed(reason.into()),
            features: Vec::new(),
            tree: RTree::new(),
        }
    }

    pub fn tile(&self) -> &TileKey {
        &self.tile
    }

    pub fn status(&self) -> &TileStatus {
        &self.status
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TileStatus::Failed(_))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Every indexed feature, in the order the loader produced them.
    pub fn all(&self) -> Vec<FeatureRef> {
        self.features.clone()
    }

    pub fn features(&self) -> impl Iterator<Item = &FeatureRef> {
        self.features.iter()
    }

    pub fn feature_ids(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.id.as_str())
    }

    /// Features whose bounding box intersects `bounds`.
    pub fn query(&self, bounds: Rect<f64>) -> Vec<FeatureRef> {
        let (min, max) = (bounds.min(), bounds.max());
        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            log::warn!("Rejecting tile range query with non-finite bounds");
            return Vec::new();
        }

        let envelope = AABB::from_corners([min.x, min.y], [max.x, max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| Arc::clone(&entry.feature))
            .collect()
    }
}

impl std::fmt::Debug for TileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileIndex")
            .field("tile", &self.tile)
            .field("status", &self.status)
            .field("features", &self.features.len())
            .finish()
    }
}
