//! Tiled feature cache with load deduplication and multi-resolution queries.
//!
//! Features are loaded one base-level tile at a time through a [`Loader`],
//! indexed with an R-tree and kept in a bounded per-level LRU cache. Queries
//! for any tile, coordinate or extent are answered from those base tiles:
//! finer tiles are filtered out of their base ancestor, slightly coarser ones
//! are aggregated from their children.
//!
//! ```rust
//! use spatio_tiles::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let loader = |request: TileRequest| async move {
//!     Ok::<_, LoadError>(vec![Feature::new(request.coord.to_string(), Point::new(0.0, 0.0))])
//! };
//!
//! let source = TileSource::builder(loader)
//!     .config(Config::default().with_base_levels([12]))
//!     .build();
//!
//! let tile = TileCoord::new(12, 2047, 2047);
//! let features = source.get_features_for_tile(tile, &Headers::new()).await;
//! assert_eq!(features[0].id, "12/2047/2047");
//! assert_eq!(source.tiles_for_feature("12/2047/2047"), vec![tile.key()]);
//! # }
//! ```

pub mod aggregate;
pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod index;
pub mod levels;
pub mod loader;
pub mod membership;
pub mod source;
pub mod tiling;
pub mod types;

#[cfg(feature = "geojson")]
pub mod convert;

pub use builder::TileSourceBuilder;
pub use cache::CacheStats;
pub use config::Config;
pub use error::{LoadError, Result, TileCacheError};
pub use events::TileLoadedEvent;
pub use index::{TileIndex, TileStatus};
pub use levels::BaseLevels;
pub use loader::{Loader, StaticLoader, TileRequest};
pub use source::TileSource;
pub use tiling::{Geographic, Projection, TilingScheme, WebMercator, WebMercatorTiling};
pub use types::{Feature, FeatureRef, Headers, TileCoord, TileKey};

#[cfg(feature = "geojson")]
pub use convert::{feature_from_geojson, features_from_geojson_str};

pub use geo::{Coord, Geometry, Point, Polygon, Rect};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Config, Result, TileCacheError, TileSource, TileSourceBuilder};

    pub use crate::{Feature, FeatureRef, Headers, LoadError, Loader, TileCoord, TileRequest};

    pub use crate::{TileLoadedEvent, TileStatus};

    pub use geo::{Coord, Point, Polygon, Rect};
}
