//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported zoom levels
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Edge length of one imagery tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// A geographic rectangle in degrees.
///
/// Always satisfies `south < north` and `west < east` when built through
/// [`GeoBounds::new`]; the fields stay public so that derived bounds (halves
/// produced by bisection) can share edge values bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    /// Creates validated bounds.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, CoordError> {
        let bounds = Self {
            north,
            south,
            east,
            west,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Creates bounds from two opposite `(lat, lon)` corners in any order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Result<Self, CoordError> {
        Self::new(a.0.max(b.0), a.0.min(b.0), a.1.max(b.1), a.1.min(b.1))
    }

    /// Checks the ordering and range invariants.
    pub fn validate(&self) -> Result<(), CoordError> {
        for value in [self.north, self.south, self.east, self.west] {
            if !value.is_finite() {
                return Err(CoordError::NonFinite);
            }
        }
        for lat in [self.north, self.south] {
            if !(MIN_LAT..=MAX_LAT).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        for lon in [self.east, self.west] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        if self.south >= self.north || self.west >= self.east {
            return Err(CoordError::InvertedBounds(*self));
        }
        Ok(())
    }

    /// Longitudinal extent in degrees.
    pub fn width_degrees(&self) -> f64 {
        self.east - self.west
    }

    /// Latitudinal extent in degrees.
    pub fn height_degrees(&self) -> f64 {
        self.north - self.south
    }

    /// Geographic center as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// True when the point lies inside or on the edge.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat <= self.north && lat >= self.south && lon >= self.west && lon <= self.east
    }

    /// True when the two rectangles share interior area.
    pub fn overlaps_interior(&self, other: &GeoBounds) -> bool {
        self.west < other.east
            && other.west < self.east
            && self.south < other.north
            && other.south < self.north
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N{:.6} S{:.6} E{:.6} W{:.6}",
            self.north, self.south, self.east, self.west
        )
    }
}

/// Pixel size of a projected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelDimensions {
    pub width: u32,
    pub height: u32,
}

impl PixelDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when both axes fit within `max` pixels.
    pub fn fits_within(&self, max: u32) -> bool {
        self.width <= max && self.height <= max
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Byte length of one RGBA8 scanline.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * 4
    }
}

impl fmt::Display for PixelDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// Tile coordinates in Web Mercator / Slippy Map system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
    /// X coordinate (east-west), 0 at west
    pub col: u32,
    /// Zoom level
    pub zoom: u8,
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// Inclusive range of tiles covering a region at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min_col: u32,
    pub max_col: u32,
    pub min_row: u32,
    pub max_row: u32,
    pub zoom: u8,
}

impl TileRange {
    /// Number of tiles in the range.
    pub fn count(&self) -> u32 {
        (self.max_col - self.min_col + 1) * (self.max_row - self.min_row + 1)
    }

    /// Iterates tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_row..=self.max_row).flat_map(move |row| {
            (self.min_col..=self.max_col).map(move |col| TileCoord {
                row,
                col,
                zoom: self.zoom,
            })
        })
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be within ±85.05112878)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be within ±180)")]
    InvalidLongitude(f64),

    #[error("Invalid zoom level: {0} (must be 0-22)")]
    InvalidZoom(u8),

    #[error("Bounds are inverted or empty: {0}")]
    InvertedBounds(GeoBounds),

    #[error("Coordinate is not a finite number")]
    NonFinite,
}
