//! The public query surface.
//!
//! A [`TileSource`] answers feature queries for any tile, coordinate or
//! extent while only ever loading tiles at the configured base levels.
//! Queries never fail: a tile whose load failed simply contributes nothing.
//!
//! ```rust
//! use spatio_tiles::{Config, Feature, Headers, LoadError, TileCoord, TileRequest, TileSource};
//! use geo::Point;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let loader = |request: TileRequest| async move {
//!     let TileCoord { level, x, y } = request.coord;
//!     Ok::<_, LoadError>(vec![Feature::new(
//!         format!("{}-{}-{}", level, x, y),
//!         Point::new(0.0, 0.0),
//!     )])
//! };
//!
//! let source = TileSource::builder(loader)
//!     .config(Config::default().with_base_levels([10]))
//!     .build();
//!
//! let features = source
//!     .get_features_for_tile(TileCoord::new(10, 511, 511), &Headers::new())
//!     .await;
//! assert_eq!(features.len(), 1);
//! # }
//! ```

use crate::aggregate::{self, TilePlan};
use crate::builder::TileSourceBuilder;
use crate::cache::{CacheStats, TileCache};
use crate::config::Config;
use crate::events::TileLoadedEvent;
use crate::index::TileStatus;
use crate::levels::{BaseLevels, MAX_LEVEL};
use crate::loader::Loader;
use crate::tiling::{Projection, TilingScheme};
use crate::types::{FeatureRef, Headers, TileCoord, TileKey};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use geo::{Coord, Intersects, Rect, coord};
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct TileSource {
    config: Config,
    levels: BaseLevels,
    cache: TileCache,
    tiling: Arc<dyn TilingScheme>,
    projection: Arc<dyn Projection>,
}

impl TileSource {
    pub fn builder(loader: impl Loader) -> TileSourceBuilder {
        TileSourceBuilder::new(loader)
    }

    /// Source with default configuration and web-mercator tiling.
    pub fn new(loader: impl Loader) -> Self {
        TileSourceBuilder::new(loader).build()
    }

    pub(crate) fn from_parts(
        config: Config,
        loader: Arc<dyn Loader>,
        tiling: Arc<dyn TilingScheme>,
        projection: Arc<dyn Projection>,
    ) -> Self {
        let config = config.normalized();
        let levels = BaseLevels::new(config.base_levels.iter().copied(), config.tile_size);
        let cache = TileCache::new(
            loader,
            levels.levels(),
            config.tile_cache_size,
            config.track_features_to_tiles,
            crate::events::TileLoadedNotifier::new(config.event_capacity),
        );

        Self {
            config,
            levels,
            cache,
            tiling,
            projection,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_levels(&self) -> &BaseLevels {
        &self.levels
    }

    /// Features of one tile at any level.
    ///
    /// Base-level tiles return everything the loader produced. Finer tiles are
    /// cut out of their base-level ancestor by bounding box. Tiles up to two
    /// levels coarser than the coarsest base level are assembled from their
    /// children when aggregation is enabled; the same feature may then appear
    /// more than once.
    pub async fn get_features_for_tile(&self, coord: TileCoord, headers: &Headers) -> Vec<FeatureRef> {
        self.features_for_tile(coord, headers).await
    }

    fn features_for_tile<'a>(&'a self, coord: TileCoord, headers: &'a Headers) -> BoxFuture<'a, Vec<FeatureRef>> {
        async move {
            match aggregate::plan(&self.levels, coord, self.config.allow_tile_aggregation) {
                TilePlan::Whole(base) => self.cache.get_or_load(base, headers).await.all(),
                TilePlan::Filter { base } => {
                    let index = self.cache.get_or_load(base, headers).await;
                    index.query(self.projected_tile_bounds(coord))
                }
                TilePlan::Aggregate(children) => {
                    let parts = join_all(
                        children
                            .iter()
                            .map(|child| self.features_for_tile(*child, headers)),
                    )
                    .await;
                    parts.into_iter().flatten().collect()
                }
                TilePlan::Unavailable => {
                    log::debug!("No base level can answer tile {}", coord);
                    Vec::new()
                }
            }
        }
        .boxed()
    }

    /// Features near a projected coordinate.
    ///
    /// The coordinate is buffered by `resolution` (projected units) on every
    /// side; the base level is picked from the resolution and latitude.
    pub async fn get_features_by_coordinate(
        &self,
        coordinate: Coord<f64>,
        resolution: f64,
        headers: &Headers,
    ) -> Vec<FeatureRef> {
        let buffer = resolution.abs();
        let search = Rect::new(
            coord! { x: coordinate.x - buffer, y: coordinate.y - buffer },
            coord! { x: coordinate.x + buffer, y: coordinate.y + buffer },
        );

        let position = self.projection.unproject(coordinate);
        if !(position.x.is_finite() && position.y.is_finite()) {
            log::warn!("Ignoring coordinate query at non-finite position");
            return Vec::new();
        }

        let level = self.levels.resolve_for_resolution(buffer, position.y);
        let tile = self.tiling.position_to_tile(position, level);
        self.cache.get_or_load(tile, headers).await.query(search)
    }

    /// Features whose geometry intersects a projected extent.
    ///
    /// Every tile of `level` (default: the coarsest base level) touching the
    /// extent is queried concurrently, then the combined result is filtered
    /// by exact geometry intersection.
    pub async fn get_features_for_extent(
        &self,
        extent: Rect<f64>,
        level: Option<u32>,
        headers: &Headers,
    ) -> Vec<FeatureRef> {
        let level = level.unwrap_or_else(|| self.levels.coarsest()).min(MAX_LEVEL);
        let tiles = self.tiles_in_extent(extent, level);
        log::debug!("Extent query at level {} covers {} tiles", level, tiles.len());

        let parts = join_all(tiles.iter().map(|tile| self.features_for_tile(*tile, headers))).await;

        parts
            .into_iter()
            .flatten()
            .filter(|feature| {
                feature
                    .geometry
                    .as_ref()
                    .is_some_and(|geometry| geometry.intersects(&extent))
            })
            .collect()
    }

    /// Tiles of `level` covering a projected extent. Levels above
    /// [`MAX_LEVEL`] are clamped.
    pub fn tiles_in_extent(&self, extent: Rect<f64>, level: u32) -> Vec<TileCoord> {
        let level = level.min(MAX_LEVEL);
        let (min, max) = (extent.min(), extent.max());
        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            log::warn!("Ignoring extent query with non-finite bounds");
            return Vec::new();
        }

        let geographic = self.projection.unproject_rect(extent);
        let corner_a = self.tiling.position_to_tile(geographic.min(), level);
        let corner_b = self.tiling.position_to_tile(geographic.max(), level);

        let (min_x, max_x) = (corner_a.x.min(corner_b.x), corner_a.x.max(corner_b.x));
        let (min_y, max_y) = (corner_a.y.min(corner_b.y), corner_a.y.max(corner_b.y));

        (min_y..=max_y)
            .flat_map(|y| (min_x..=max_x).map(move |x| TileCoord::new(level, x, y)))
            .collect()
    }

    fn projected_tile_bounds(&self, coord: TileCoord) -> Rect<f64> {
        self.projection
            .project_rect(self.tiling.tile_to_rectangle(coord))
    }

    /// Visits every feature of every cached tile once per tile.
    pub async fn for_each_feature(&self, callback: impl FnMut(&FeatureRef)) {
        self.cache.for_each_feature(callback).await;
    }

    /// Changes the per-level tile bound, returning once evictions are done.
    pub async fn set_cache_capacity(&self, capacity: usize) {
        self.cache.set_capacity(capacity).await;
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TileLoadedEvent> {
        self.cache.notifier().subscribe()
    }

    /// Cached tiles currently holding a feature. Always empty when feature
    /// tracking is disabled.
    pub fn tiles_for_feature(&self, feature_id: &str) -> Vec<TileKey> {
        self.cache.tiles_for_feature(feature_id)
    }

    pub fn tile_status(&self, coord: TileCoord) -> Option<TileStatus> {
        self.cache.status(coord)
    }

    pub fn cached_tile_keys(&self) -> Vec<TileKey> {
        self.cache.keys()
    }

    pub fn cached_tiles_at(&self, level: u32) -> usize {
        self.cache.level_len(level)
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
