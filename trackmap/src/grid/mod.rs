//! Row-major grid layout of subdivided regions.
//!
//! Bisection emits sub-regions depth first, which is not the order a
//! scanline encoder needs. [`plan_grid`] groups sub-regions into rows by
//! their shared north/south edges, orders rows north to south and members
//! west to east, and assigns every sub-region its pixel cell in the mosaic.

use std::cmp::Ordering;

use crate::coord::{lat_to_world_y, lon_to_world_x, GeoBounds, PixelDimensions};

/// Pixel rectangle inside the assembled mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn dimensions(&self) -> PixelDimensions {
        PixelDimensions::new(self.width, self.height)
    }
}

/// One sub-region with its place in the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subdivision {
    /// Position in row-major order.
    pub index: usize,
    /// Position in the order the subdivider produced it.
    pub generation_index: usize,
    pub row: usize,
    pub column: usize,
    pub bounds: GeoBounds,
    /// Target cell in the mosaic; rendered tiles are resized to it.
    pub cell: PixelRect,
}

/// A band of sub-regions sharing the same north and south edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    /// Top of the band in mosaic pixels.
    pub y: u32,
    pub height: u32,
    /// Indices into [`GridLayout::ordered`], west to east.
    pub members: Vec<usize>,
}

/// Sub-regions reordered for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub rows: usize,
    /// `total / rows`; rows of unequal length are still described exactly
    /// by [`GridLayout::row_groups`].
    pub columns: usize,
    pub ordered: Vec<Subdivision>,
    pub row_groups: Vec<GridRow>,
    /// Size of the assembled mosaic.
    pub dimensions: PixelDimensions,
}

impl GridLayout {
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Sub-regions of one row, west to east.
    pub fn row(&self, row: usize) -> impl Iterator<Item = &Subdivision> + '_ {
        self.row_groups
            .get(row)
            .into_iter()
            .flat_map(move |group| group.members.iter().map(move |&i| &self.ordered[i]))
    }
}

/// Reorders `subdivisions` from generation order into row-major order.
///
/// Pure and stable: the same input always yields the same layout.
pub fn plan_grid(subdivisions: &[GeoBounds], zoom: u8) -> GridLayout {
    if subdivisions.is_empty() {
        return GridLayout {
            rows: 0,
            columns: 0,
            ordered: Vec::new(),
            row_groups: Vec::new(),
            dimensions: PixelDimensions::default(),
        };
    }

    // Distinct row bands keyed by their exact edges, north first.
    let mut bands: Vec<(f64, f64)> = Vec::new();
    for b in subdivisions {
        if !bands.iter().any(|&(n, s)| n == b.north && s == b.south) {
            bands.push((b.north, b.south));
        }
    }
    bands.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.total_cmp(&a.1)));

    let origin_x = subdivisions
        .iter()
        .map(|b| lon_to_world_x(b.west, zoom))
        .fold(f64::INFINITY, f64::min);
    let origin_y = subdivisions
        .iter()
        .map(|b| lat_to_world_y(b.north, zoom))
        .fold(f64::INFINITY, f64::min);
    let px_x = |lon: f64| (lon_to_world_x(lon, zoom) - origin_x).round().max(0.0) as u32;
    let px_y = |lat: f64| (lat_to_world_y(lat, zoom) - origin_y).round().max(0.0) as u32;

    let mut ordered = Vec::with_capacity(subdivisions.len());
    let mut row_groups = Vec::with_capacity(bands.len());
    let mut mosaic_width = 0;
    let mut mosaic_height = 0;

    for (row, &(north, south)) in bands.iter().enumerate() {
        let mut members: Vec<(usize, &GeoBounds)> = subdivisions
            .iter()
            .enumerate()
            .filter(|(_, b)| b.north == north && b.south == south)
            .collect();
        members.sort_by(|a, b| match a.1.west.total_cmp(&b.1.west) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });

        let y = px_y(north);
        let height = px_y(south).saturating_sub(y);
        let mut indices = Vec::with_capacity(members.len());

        for (column, (generation_index, bounds)) in members.into_iter().enumerate() {
            let x = px_x(bounds.west);
            let cell = PixelRect {
                x,
                y,
                width: px_x(bounds.east).saturating_sub(x),
                height,
            };
            mosaic_width = mosaic_width.max(cell.x + cell.width);
            indices.push(ordered.len());
            ordered.push(Subdivision {
                index: ordered.len(),
                generation_index,
                row,
                column,
                bounds: *bounds,
                cell,
            });
        }

        mosaic_height = mosaic_height.max(y + height);
        row_groups.push(GridRow {
            y,
            height,
            members: indices,
        });
    }

    GridLayout {
        rows: row_groups.len(),
        columns: ordered.len() / row_groups.len(),
        ordered,
        row_groups,
        dimensions: PixelDimensions::new(mosaic_width, mosaic_height),
    }
}
