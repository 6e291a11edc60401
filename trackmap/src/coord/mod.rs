//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator world pixels and tiles, plus the projection used to size
//! every rendered region.

mod types;

pub use types::{
    CoordError, GeoBounds, PixelDimensions, TileCoord, TileRange, MAX_LAT, MAX_LON, MAX_ZOOM,
    MIN_LAT, MIN_LON, MIN_ZOOM, TILE_SIZE,
};

use std::f64::consts::PI;

/// Side length of the whole projected world in pixels at `zoom`.
#[inline]
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE as f64 * 2.0_f64.powi(zoom as i32)
}

/// Projects a longitude to a world pixel X coordinate.
#[inline]
pub fn lon_to_world_x(lon: f64, zoom: u8) -> f64 {
    (lon + 180.0) / 360.0 * world_size(zoom)
}

/// Projects a latitude to a world pixel Y coordinate (0 at the north edge).
#[inline]
pub fn lat_to_world_y(lat: f64, zoom: u8) -> f64 {
    let lat_rad = lat.clamp(MIN_LAT, MAX_LAT) * PI / 180.0;
    (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * world_size(zoom)
}

/// Inverse of [`lon_to_world_x`].
#[inline]
pub fn world_x_to_lon(x: f64, zoom: u8) -> f64 {
    x / world_size(zoom) * 360.0 - 180.0
}

/// Inverse of [`lat_to_world_y`].
#[inline]
pub fn world_y_to_lat(y: f64, zoom: u8) -> f64 {
    let n = PI * (1.0 - 2.0 * y / world_size(zoom));
    n.sinh().atan() * 180.0 / PI
}

/// Fractional pixel extent `(width, height)` of `bounds` at `zoom`.
pub fn project_extent(bounds: &GeoBounds, zoom: u8) -> (f64, f64) {
    let width = lon_to_world_x(bounds.east, zoom) - lon_to_world_x(bounds.west, zoom);
    let height = lat_to_world_y(bounds.south, zoom) - lat_to_world_y(bounds.north, zoom);
    (width, height)
}

/// Pixel size needed to render `bounds` at `zoom`.
///
/// Fractional extents are rounded up so the surface always covers the whole
/// region; every axis is at least one pixel.
pub fn project_dimensions(bounds: &GeoBounds, zoom: u8) -> PixelDimensions {
    let (width, height) = project_extent(bounds, zoom);
    PixelDimensions {
        width: ceil_px(width),
        height: ceil_px(height),
    }
}

fn ceil_px(extent: f64) -> u32 {
    let px = extent.ceil();
    if px < 1.0 {
        1
    } else if px > u32::MAX as f64 {
        u32::MAX
    } else {
        px as u32
    }
}

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let last = (1u64 << zoom) as f64 - 1.0;
    let col = (lon_to_world_x(lon, zoom) / TILE_SIZE as f64)
        .floor()
        .clamp(0.0, last) as u32;
    let row = (lat_to_world_y(lat, zoom) / TILE_SIZE as f64)
        .floor()
        .clamp(0.0, last) as u32;

    Ok(TileCoord { row, col, zoom })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let x = tile.col as f64 * TILE_SIZE as f64;
    let y = tile.row as f64 * TILE_SIZE as f64;
    (world_y_to_lat(y, tile.zoom), world_x_to_lon(x, tile.zoom))
}

/// Range of imagery tiles needed to cover `bounds` at `zoom`.
pub fn tiles_covering(bounds: &GeoBounds, zoom: u8) -> Result<TileRange, CoordError> {
    bounds.validate()?;
    let north_west = to_tile_coords(bounds.north, bounds.west, zoom)?;
    let south_east = to_tile_coords(bounds.south, bounds.east, zoom)?;

    // An edge that lands exactly on a tile boundary does not need the next tile.
    let last = ((1u64 << zoom) - 1) as u32;
    let east_px = lon_to_world_x(bounds.east, zoom);
    let south_px = lat_to_world_y(bounds.south, zoom);
    let max_col = exclusive_edge(east_px, south_east.col).max(north_west.col).min(last);
    let max_row = exclusive_edge(south_px, south_east.row).max(north_west.row).min(last);

    Ok(TileRange {
        min_col: north_west.col,
        max_col,
        min_row: north_west.row,
        max_row,
        zoom,
    })
}

fn exclusive_edge(edge_px: f64, tile: u32) -> u32 {
    if tile > 0 && edge_px == tile as f64 * TILE_SIZE as f64 {
        tile - 1
    } else {
        tile
    }
}
