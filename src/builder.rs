//! Tile source builder.
//!
//! Collects the loader, configuration, tiling scheme and projection. Tiling
//! and projection default to the XYZ web-mercator grid over EPSG:3857.

use crate::config::Config;
use crate::loader::Loader;
use crate::source::TileSource;
use crate::tiling::{Projection, TilingScheme, WebMercator, WebMercatorTiling};
use std::sync::Arc;

pub struct TileSourceBuilder {
    loader: Arc<dyn Loader>,
    config: Config,
    tiling: Arc<dyn TilingScheme>,
    projection: Arc<dyn Projection>,
}

impl TileSourceBuilder {
    pub fn new(loader: impl Loader) -> Self {
        Self::from_shared(Arc::new(loader))
    }

    /// Builder around a loader that is shared with other sources.
    pub fn from_shared(loader: Arc<dyn Loader>) -> Self {
        Self {
            loader,
            config: Config::default(),
            tiling: Arc::new(WebMercatorTiling),
            projection: Arc::new(WebMercator),
        }
    }

    /// Set the cache configuration. Invalid values are clamped on build.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn tiling(mut self, tiling: impl TilingScheme + 'static) -> Self {
        self.tiling = Arc::new(tiling);
        self
    }

    pub fn projection(mut self, projection: impl Projection + 'static) -> Self {
        self.projection = Arc::new(projection);
        self
    }

    pub fn build(self) -> TileSource {
        TileSource::from_parts(self.config, self.loader, self.tiling, self.projection)
    }
}
