//! Tiling scheme and projection seams.
//!
//! The cache only needs three pieces of tile math (tile → rectangle,
//! position → tile, tile centre) and a pair of projection functions. Both are
//! traits so callers can plug in their own grid; the web-mercator versions
//! below cover the common slippy-map case.

use crate::types::TileCoord;
use geo::{Coord, Rect, coord};
use std::f64::consts::PI;

/// WGS84 semi-major axis, the radius used by EPSG:3857.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Latitude at which the web-mercator square ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Converts between geographic (lon/lat degrees) and projected coordinates.
pub trait Projection: Send + Sync {
    fn project(&self, geographic: Coord<f64>) -> Coord<f64>;

    fn unproject(&self, projected: Coord<f64>) -> Coord<f64>;

    fn project_rect(&self, rect: Rect<f64>) -> Rect<f64> {
        Rect::new(self.project(rect.min()), self.project(rect.max()))
    }

    fn unproject_rect(&self, rect: Rect<f64>) -> Rect<f64> {
        Rect::new(self.unproject(rect.min()), self.unproject(rect.max()))
    }
}

/// Spherical web-mercator (EPSG:3857), in meters.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl Projection for WebMercator {
    fn project(&self, geographic: Coord<f64>) -> Coord<f64> {
        let lat = geographic.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        coord! {
            x: EARTH_RADIUS_METERS * geographic.x.to_radians(),
            y: EARTH_RADIUS_METERS * (PI / 4.0 + lat / 2.0).tan().ln(),
        }
    }

    fn unproject(&self, projected: Coord<f64>) -> Coord<f64> {
        coord! {
            x: (projected.x / EARTH_RADIUS_METERS).to_degrees(),
            y: (2.0 * (projected.y / EARTH_RADIUS_METERS).exp().atan() - PI / 2.0).to_degrees(),
        }
    }
}

/// Identity projection for data already stored in lon/lat (EPSG:4326).
#[derive(Debug, Clone, Copy, Default)]
pub struct Geographic;

impl Projection for Geographic {
    fn project(&self, geographic: Coord<f64>) -> Coord<f64> {
        geographic
    }

    fn unproject(&self, projected: Coord<f64>) -> Coord<f64> {
        projected
    }
}

/// Quad-tree tile grid over geographic coordinates.
pub trait TilingScheme: Send + Sync {
    /// Geographic extent of a tile, lon/lat degrees.
    fn tile_to_rectangle(&self, tile: TileCoord) -> Rect<f64>;

    /// Tile at `level` containing a geographic position.
    fn position_to_tile(&self, position: Coord<f64>, level: u32) -> TileCoord;

    fn tile_center(&self, tile: TileCoord) -> Coord<f64> {
        self.tile_to_rectangle(tile).center()
    }
}

/// The XYZ slippy-map grid: one tile at level 0, rows counted from the north.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorTiling;

impl WebMercatorTiling {
    fn tiles_per_axis(level: u32) -> f64 {
        2.0_f64.powi(level as i32)
    }

    fn column_to_lon(x: f64, n: f64) -> f64 {
        x / n * 360.0 - 180.0
    }

    fn row_to_lat(y: f64, n: f64) -> f64 {
        (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
    }
}

impl TilingScheme for WebMercatorTiling {
    fn tile_to_rectangle(&self, tile: TileCoord) -> Rect<f64> {
        let n = Self::tiles_per_axis(tile.level);
        let (x, y) = (tile.x as f64, tile.y as f64);
        Rect::new(
            coord! { x: Self::column_to_lon(x, n), y: Self::row_to_lat(y + 1.0, n) },
            coord! { x: Self::column_to_lon(x + 1.0, n), y: Self::row_to_lat(y, n) },
        )
    }

    fn position_to_tile(&self, position: Coord<f64>, level: u32) -> TileCoord {
        let n = Self::tiles_per_axis(level);
        let max_index = n - 1.0;

        let lon = position.x.clamp(-180.0, 180.0);
        let lat = position.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

        let col = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, max_index);
        let row = ((1.0 - lat.tan().asinh() / PI) / 2.0 * n)
            .floor()
            .clamp(0.0, max_index);

        TileCoord::new(level, col as u32, row as u32)
    }
}
