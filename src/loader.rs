//! Loader strategies.
//!
//! A loader turns a tile request into features. URL-template fetchers,
//! vector-tile decoders and columnar readers all sit behind the same
//! [`Loader`] trait; plain async closures implement it too.
//!
//! ```rust
//! use spatio_tiles::{Feature, LoadError, TileRequest};
//! use geo::Point;
//!
//! let loader = |request: TileRequest| async move {
//!     let feature = Feature::new(request.coord.to_string(), Point::new(0.0, 0.0));
//!     Ok::<_, LoadError>(vec![feature])
//! };
//! # let _ = loader;
//! ```

use crate::error::LoadError;
use crate::tiling::{Projection, TilingScheme};
use crate::types::{Feature, Headers, TileCoord};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

/// One loader invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    pub coord: TileCoord,
    pub headers: Headers,
}

/// Source of features for base-level tiles.
///
/// Implementations must be idempotent: the cache may call `load` again for a
/// tile after evicting it.
pub trait Loader: Send + Sync + 'static {
    fn load(&self, request: TileRequest) -> BoxFuture<'static, Result<Vec<Feature>, LoadError>>;
}

impl<F, Fut> Loader for F
where
    F: Fn(TileRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Feature>, LoadError>> + Send + 'static,
{
    fn load(&self, request: TileRequest) -> BoxFuture<'static, Result<Vec<Feature>, LoadError>> {
        (self)(request).boxed()
    }
}

/// Serves a fixed in-memory feature set, cut per tile by bounding box.
///
/// Feature geometries are expected in the projection's coordinate space.
pub struct StaticLoader {
    features: Arc<Vec<Feature>>,
    tiling: Arc<dyn TilingScheme>,
    projection: Arc<dyn Projection>,
}

impl StaticLoader {
    pub fn new(
        features: Vec<Feature>,
        tiling: Arc<dyn TilingScheme>,
        projection: Arc<dyn Projection>,
    ) -> Self {
        Self {
            features: Arc::new(features),
            tiling,
            projection,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn features_in(&self, coord: TileCoord) -> Vec<Feature> {
        let tile = self
            .projection
            .project_rect(self.tiling.tile_to_rectangle(coord));
        let (min, max) = (tile.min(), tile.max());

        self.features
            .iter()
            .filter(|feature| {
                feature.bounds().is_some_and(|b| {
                    b.min().x <= max.x && b.max().x >= min.x && b.min().y <= max.y && b.max().y >= min.y
                })
            })
            .cloned()
            .collect()
    }
}

impl Loader for StaticLoader {
    fn load(&self, request: TileRequest) -> BoxFuture<'static, Result<Vec<Feature>, LoadError>> {
        let features = self.features_in(request.coord);
        futures::future::ready(Ok(features)).boxed()
    }
}
