//! Core tile and feature types.
//!
//! Tile coordinates follow the usual quad-tree convention: level 0 is a single
//! tile, every level doubles the number of columns and rows, and `y` grows
//! southwards. Feature geometries live in the projected coordinate space of
//! the configured [`Projection`](crate::tiling::Projection).

use geo::{BoundingRect, Geometry, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Extra request metadata handed to the loader untouched (auth tokens, etc.).
pub type Headers = HashMap<String, String>;

/// Shared handle to an indexed feature.
pub type FeatureRef = Arc<Feature>;

/// Address of a tile in the quad-tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub const fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// The four children one level down, in the order
    /// `(2x, 2y)`, `(2x+1, 2y)`, `(2x+1, 2y+1)`, `(2x, 2y+1)`.
    pub fn children(&self) -> [TileCoord; 4] {
        let (x, y, level) = (self.x * 2, self.y * 2, self.level + 1);
        [
            TileCoord::new(level, x, y),
            TileCoord::new(level, x + 1, y),
            TileCoord::new(level, x + 1, y + 1),
            TileCoord::new(level, x, y + 1),
        ]
    }

    /// The tile at `level` that contains this one, or `None` if `level` is
    /// finer than this tile's own level.
    pub fn ancestor_at(&self, level: u32) -> Option<TileCoord> {
        let shift = self.level.checked_sub(level)?;
        Some(TileCoord::new(
            level,
            self.x.checked_shr(shift).unwrap_or(0),
            self.y.checked_shr(shift).unwrap_or(0),
        ))
    }

    /// Whether `x` and `y` address a tile that exists at this level.
    pub fn in_range(&self) -> bool {
        match 1u64.checked_shl(self.level) {
            Some(tiles) => u64::from(self.x) < tiles && u64::from(self.y) < tiles,
            None => true,
        }
    }

    pub fn key(&self) -> TileKey {
        TileKey::from(*self)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}

/// Opaque cache key for a tile.
///
/// The textual form is `level/x/y`. It is only ever compared and hashed;
/// nothing parses it back into a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey(String);

impl TileKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<TileCoord> for TileKey {
    fn from(coord: TileCoord) -> Self {
        TileKey(coord.to_string())
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A vector feature as delivered by a loader.
///
/// An empty `id` is replaced with a generated UUID when the feature is
/// indexed. Features whose geometry is missing or has no finite bounds are
/// not indexed at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub geometry: Option<Geometry<f64>>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: id.into(),
            geometry: Some(geometry.into()),
            properties: serde_json::Map::new(),
        }
    }

    /// Feature with a geometry but no id; one is assigned at index time.
    pub fn anonymous(geometry: impl Into<Geometry<f64>>) -> Self {
        Self::new(String::new(), geometry)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// Bounding box of the geometry, if it has a finite one.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let rect = self.geometry.as_ref()?.bounding_rect()?;
        let (min, max) = (rect.min(), rect.max());
        if min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite() {
            Some(rect)
        } else {
            None
        }
    }
}
