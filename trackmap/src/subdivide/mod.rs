//! Recursive bisection of a region into pixel-bounded sub-regions.
//!
//! A region whose projected size at the target zoom exceeds the maximum
//! dimension on either axis is cut in half at its geographic center, along
//! the axis with the larger pixel extent, until every piece fits.

use thiserror::Error;
use tracing::debug;

use crate::coord::{project_dimensions, CoordError, GeoBounds, MAX_ZOOM};

/// Errors raised before any sub-region is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubdivisionError {
    #[error("Maximum dimension must be at least 1 pixel")]
    ZeroMaxDimension,

    #[error("Invalid zoom level: {0} (must be 0-22)")]
    InvalidZoom(u8),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(#[from] CoordError),
}

/// Splits `bounds` into sub-regions no larger than `max_dimension_px` pixels
/// on either axis at `zoom`.
///
/// Output is in generation order: depth first, western (or northern) half
/// before its sibling. The pieces tile the input exactly, sharing edge
/// values bit for bit.
pub fn subdivide_bounds(
    bounds: &GeoBounds,
    zoom: u8,
    max_dimension_px: u32,
) -> Result<Vec<GeoBounds>, SubdivisionError> {
    if max_dimension_px == 0 {
        return Err(SubdivisionError::ZeroMaxDimension);
    }
    if zoom > MAX_ZOOM {
        return Err(SubdivisionError::InvalidZoom(zoom));
    }
    bounds.validate()?;

    let mut out = Vec::new();
    bisect(*bounds, zoom, max_dimension_px, &mut out);

    debug!(
        bounds = %bounds,
        zoom,
        max_dimension_px,
        subdivisions = out.len(),
        "Subdivided export bounds"
    );
    Ok(out)
}

fn bisect(bounds: GeoBounds, zoom: u8, max_px: u32, out: &mut Vec<GeoBounds>) {
    let size = project_dimensions(&bounds, zoom);
    if size.fits_within(max_px) {
        out.push(bounds);
        return;
    }

    match split(&bounds, size.width >= size.height) {
        Some((first, second)) => {
            bisect(first, zoom, max_px, out);
            bisect(second, zoom, max_px, out);
        }
        // Floating point cannot represent a center strictly inside the edges.
        None => out.push(bounds),
    }
}

/// Halves `bounds` at its center. Vertical cuts yield (west, east), horizontal
/// cuts yield (north, south).
fn split(bounds: &GeoBounds, vertical: bool) -> Option<(GeoBounds, GeoBounds)> {
    if vertical {
        let mid = (bounds.west + bounds.east) / 2.0;
        if !(mid > bounds.west && mid < bounds.east) {
            return None;
        }
        Some((
            GeoBounds {
                east: mid,
                ..*bounds
            },
            GeoBounds {
                west: mid,
                ..*bounds
            },
        ))
    } else {
        let mid = (bounds.north + bounds.south) / 2.0;
        if !(mid > bounds.south && mid < bounds.north) {
            return None;
        }
        Some((
            GeoBounds {
                south: mid,
                ..*bounds
            },
            GeoBounds {
                north: mid,
                ..*bounds
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::PixelDimensions;
    use proptest::prelude::*;

    fn bounds(north: f64, south: f64, east: f64, west: f64) -> GeoBounds {
        GeoBounds::new(north, south, east, west).unwrap()
    }

    #[test]
    fn test_region_that_fits_is_returned_unchanged() {
        let region = bounds(51.52, 51.50, -0.10, -0.12);
        let parts = subdivide_bounds(&region, 10, 4096).unwrap();
        assert_eq!(parts, vec![region]);
    }

    #[test]
    fn test_london_at_zoom_10_is_a_single_part() {
        let region = GeoBounds::from_corners((51.5, -0.1), (51.6, 0.0)).unwrap();
        let parts = subdivide_bounds(&region, 10, 4000).unwrap();
        assert_eq!(parts, vec![region]);
    }

    #[test]
    fn test_two_degree_region_at_zoom_13() {
        let region = GeoBounds::from_corners((50.0, -2.0), (52.0, 0.0)).unwrap();
        let parts = subdivide_bounds(&region, 13, 500).unwrap();

        assert!(parts.len() > 4);
        for part in &parts {
            assert!(project_dimensions(part, 13).fits_within(500));
        }
        let west = parts.iter().map(|p| p.west).fold(f64::INFINITY, f64::min);
        let east = parts.iter().map(|p| p.east).fold(f64::NEG_INFINITY, f64::max);
        let south = parts.iter().map(|p| p.south).fold(f64::INFINITY, f64::min);
        let north = parts.iter().map(|p| p.north).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!((west, east, south, north), (-2.0, 0.0, 50.0, 52.0));
        let total: f64 = parts.iter().map(area).sum();
        assert!((total - area(&region)).abs() < 1e-9);
    }

    #[test]
    fn test_wide_region_splits_vertically_west_first() {
        let region = bounds(52.0, 51.0, 3.0, 0.0);
        let size = project_dimensions(&region, 12);
        assert!(size.width > size.height);

        let parts = subdivide_bounds(&region, 12, size.width - 1).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].west, region.west);
        assert_eq!(parts[0].north, region.north);
        assert_eq!(parts[0].east, 1.5);
        assert_eq!(parts[1].west, 1.5);
    }

    #[test]
    fn test_tall_region_splits_horizontally_north_first() {
        let region = bounds(60.0, 50.0, 1.0, 0.0);
        let size = project_dimensions(&region, 8);
        assert!(size.height > size.width);

        let parts = subdivide_bounds(&region, 8, size.height - 1).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].north, 60.0);
        assert_eq!(parts[0].south, 55.0);
        assert_eq!(parts[1].north, 55.0);
        assert_eq!(parts[1].south, 50.0);
    }

    #[test]
    fn test_every_part_fits() {
        let region = bounds(55.0, 45.0, 10.0, -5.0);
        let max = 512;
        for part in subdivide_bounds(&region, 9, max).unwrap() {
            let size = project_dimensions(&part, 9);
            assert!(size.fits_within(max), "{part} projects to {size}");
        }
    }

    #[test]
    fn test_tiny_max_dimension_terminates() {
        let region = bounds(51.6, 51.5, 0.0, -0.1);
        let parts = subdivide_bounds(&region, 10, 1).unwrap();
        assert!(!parts.is_empty());
        for part in &parts {
            assert_eq!(project_dimensions(part, 10), PixelDimensions::new(1, 1));
        }
    }

    #[test]
    fn test_deterministic() {
        let region = bounds(48.9, 48.8, 2.4, 2.2);
        let a = subdivide_bounds(&region, 15, 700).unwrap();
        let b = subdivide_bounds(&region, 15, 700).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_max_dimension_is_error() {
        let region = bounds(51.6, 51.5, 0.0, -0.1);
        assert_eq!(
            subdivide_bounds(&region, 10, 0),
            Err(SubdivisionError::ZeroMaxDimension)
        );
    }

    #[test]
    fn test_invalid_inputs_are_errors() {
        let inverted = GeoBounds {
            north: 51.5,
            south: 51.6,
            east: 0.0,
            west: -0.1,
        };
        assert!(matches!(
            subdivide_bounds(&inverted, 10, 256),
            Err(SubdivisionError::InvalidBounds(_))
        ));

        let region = bounds(51.6, 51.5, 0.0, -0.1);
        assert_eq!(
            subdivide_bounds(&region, 23, 256),
            Err(SubdivisionError::InvalidZoom(23))
        );
    }

    fn area(b: &GeoBounds) -> f64 {
        b.width_degrees() * b.height_degrees()
    }

    proptest! {
        #[test]
        fn prop_parts_tile_the_input(
            south in -60.0f64..59.0,
            height in 0.01f64..20.0,
            west in -170.0f64..169.0,
            width in 0.01f64..20.0,
            zoom in 2u8..9,
            max in 256u32..2048,
        ) {
            let north = (south + height).min(60.0);
            let east = (west + width).min(170.0);
            let region = bounds(north, south, east, west);
            let parts = subdivide_bounds(&region, zoom, max).unwrap();

            // Every part fits and lies inside the region.
            for part in &parts {
                prop_assert!(project_dimensions(part, zoom).fits_within(max));
                prop_assert!(part.north <= region.north && part.south >= region.south);
                prop_assert!(part.east <= region.east && part.west >= region.west);
            }

            // Interiors are disjoint.
            for (i, a) in parts.iter().enumerate() {
                for b in &parts[i + 1..] {
                    prop_assert!(!a.overlaps_interior(b));
                }
            }

            // Disjoint parts inside the region with equal total area leave no gap.
            let total: f64 = parts.iter().map(area).sum();
            prop_assert!((total - area(&region)).abs() <= area(&region) * 1e-9);
        }
    }
}
