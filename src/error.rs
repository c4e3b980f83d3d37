//! Error types for the tile cache.
//!
//! Load failures never reach query callers; they are converted into an empty
//! [`TileIndex`](crate::index::TileIndex) with a failed status and logged. The
//! variants here surface from configuration parsing, GeoJSON conversion and
//! the failure reasons recorded on tile indexes.

use crate::types::TileKey;
use thiserror::Error;

/// Error a [`Loader`](crate::loader::Loader) may return for a tile request.
pub type LoadError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum TileCacheError {
    #[error("loading tile {tile} failed: {source}")]
    Load {
        tile: TileKey,
        #[source]
        source: LoadError,
    },

    #[error("loader task for tile {tile} did not complete: {reason}")]
    LoaderTask { tile: TileKey, reason: String },

    #[error("invalid feature: {0}")]
    InvalidFeature(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TileCacheError>;

#[cfg(feature = "geojson")]
impl From<geojson::Error> for TileCacheError {
    fn from(err: geojson::Error) -> Self {
        TileCacheError::InvalidFeature(err.to_string())
    }
}

#[cfg(feature = "toml")]
impl From<toml::de::Error> for TileCacheError {
    fn from(err: toml::de::Error) -> Self {
        TileCacheError::Config(err.to_string())
    }
}
