//! Row-streaming composition of layer rasters.

use image::RgbaImage;
use thiserror::Error;
use tracing::trace;

use super::blend::blend_row_over;
use crate::coord::PixelDimensions;
use crate::export::{LayerSelection, OutputFormat};
use crate::surface::LayerKind;

/// Composition errors.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Cannot composite an empty {0} tile")]
    EmptyTarget(PixelDimensions),

    #[error("Failed to write composited row {row}: {reason}")]
    Sink { row: u32, reason: String },
}

/// Receives composited scanlines top to bottom.
pub trait RowSink {
    /// Accepts one RGBA8 row of the target width.
    fn write_row(&mut self, row: &[u8]) -> Result<(), String>;
}

impl RowSink for Vec<u8> {
    fn write_row(&mut self, row: &[u8]) -> Result<(), String> {
        self.extend_from_slice(row);
        Ok(())
    }
}

/// What the accumulator starts as before any layer is blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Transparent,
    OpaqueWhite,
}

/// Background for a tile.
///
/// Lossy formats carry no alpha: without a base layer the transparent
/// areas would encode as black, so they are filled white instead. Every
/// other combination keeps the destination transparent.
pub fn background_fill(format: OutputFormat, selection: &LayerSelection) -> Background {
    if format.is_lossy() && !selection.base {
        Background::OpaqueWhite
    } else {
        Background::Transparent
    }
}

/// Captured rasters of one sub-region, one per layer.
#[derive(Debug, Clone, Default)]
pub struct LayerRasters {
    pub base: Option<RgbaImage>,
    pub lines: Option<RgbaImage>,
    pub labels: Option<RgbaImage>,
}

impl LayerRasters {
    pub fn get(&self, layer: LayerKind) -> Option<&RgbaImage> {
        match layer {
            LayerKind::Base => self.base.as_ref(),
            LayerKind::Lines => self.lines.as_ref(),
            LayerKind::Labels => self.labels.as_ref(),
        }
    }

    pub fn set(&mut self, layer: LayerKind, raster: RgbaImage) {
        let slot = match layer {
            LayerKind::Base => &mut self.base,
            LayerKind::Lines => &mut self.lines,
            LayerKind::Labels => &mut self.labels,
        };
        *slot = Some(raster);
    }
}

/// Blends layer rasters into one tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerCompositor;

impl LayerCompositor {
    pub fn new() -> Self {
        Self
    }

    /// Composites the selected layers of `layers` into a `size` tile,
    /// writing it to `sink` row by row.
    ///
    /// Layers are blended base, lines, labels. A selected layer without a
    /// raster counts as fully transparent; rasters of a different size are
    /// sampled nearest-neighbour.
    pub fn composite<S: RowSink + ?Sized>(
        &self,
        layers: &LayerRasters,
        format: OutputFormat,
        selection: &LayerSelection,
        size: PixelDimensions,
        sink: &mut S,
    ) -> Result<(), CompositeError> {
        if size.area() == 0 {
            return Err(CompositeError::EmptyTarget(size));
        }

        let background = match background_fill(format, selection) {
            Background::OpaqueWhite => [255u8; 4],
            Background::Transparent => [0u8; 4],
        };
        let sources: Vec<&RgbaImage> = LayerKind::ALL
            .iter()
            .filter(|layer| selection.includes(**layer))
            .filter_map(|layer| layers.get(*layer))
            .filter(|raster| raster.width() > 0 && raster.height() > 0)
            .collect();
        trace!(size = %size, layers = sources.len(), ?background, "Compositing tile");

        let row_bytes = size.row_bytes();
        let mut row = vec![0u8; row_bytes];
        let mut sampled = vec![0u8; row_bytes];

        for y in 0..size.height {
            for px in row.chunks_exact_mut(4) {
                px.copy_from_slice(&background);
            }
            for raster in &sources {
                blend_row_over(&mut row, sample_row(raster, y, size, &mut sampled));
            }
            sink.write_row(&row).map_err(|reason| CompositeError::Sink { row: y, reason })?;
        }
        Ok(())
    }
}

/// Row `y` of a `size` target taken from `raster`, resampled if needed.
fn sample_row<'a>(
    raster: &'a RgbaImage,
    y: u32,
    size: PixelDimensions,
    scratch: &'a mut [u8],
) -> &'a [u8] {
    let (src_w, src_h) = raster.dimensions();
    let src_row_bytes = src_w as usize * 4;
    let sy = nearest(y, size.height, src_h);
    let start = sy as usize * src_row_bytes;
    let src = &raster.as_raw()[start..start + src_row_bytes];

    if src_w == size.width {
        return src;
    }
    for (x, px) in scratch.chunks_exact_mut(4).enumerate() {
        let sx = nearest(x as u32, size.width, src_w) as usize * 4;
        px.copy_from_slice(&src[sx..sx + 4]);
    }
    scratch
}

/// Nearest source index for `dst_index` when mapping `dst_len` onto `src_len`.
pub(crate) fn nearest(dst_index: u32, dst_len: u32, src_len: u32) -> u32 {
    if dst_len == src_len {
        return dst_index;
    }
    let pos = ((dst_index as u64 * 2 + 1) * src_len as u64) / (dst_len as u64 * 2);
    (pos as u32).min(src_len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn selection(base: bool, lines: bool, labels: bool) -> LayerSelection {
        LayerSelection {
            base,
            lines,
            labels,
        }
    }

    fn composite(
        layers: &LayerRasters,
        format: OutputFormat,
        selection: &LayerSelection,
        size: PixelDimensions,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        LayerCompositor::new()
            .composite(layers, format, selection, size, &mut out)
            .unwrap();
        out
    }

    fn line_layer() -> RgbaImage {
        // One red pixel in an otherwise transparent 2x2 layer.
        let mut lines = RgbaImage::from_pixel(2, 2, CLEAR);
        lines.put_pixel(0, 0, RED);
        lines
    }

    #[test]
    fn test_jpeg_without_base_fills_white() {
        let layers = LayerRasters {
            lines: Some(line_layer()),
            ..Default::default()
        };
        let out = composite(&layers, OutputFormat::Jpeg, &selection(false, true, true), PixelDimensions::new(2, 2));

        assert_eq!(&out[0..4], &RED.0);
        assert_eq!(&out[4..8], &[255, 255, 255, 255]);
        assert!(out[4..].chunks(4).all(|p| p == [255, 255, 255, 255]));
    }

    #[test]
    fn test_png_without_base_stays_transparent() {
        let layers = LayerRasters {
            lines: Some(line_layer()),
            ..Default::default()
        };
        let out = composite(&layers, OutputFormat::Png, &selection(false, true, true), PixelDimensions::new(2, 2));

        assert_eq!(&out[0..4], &RED.0);
        assert!(out[4..].chunks(4).all(|p| p == [0, 0, 0, 0]));
    }

    #[test]
    fn test_background_policy_table() {
        assert_eq!(background_fill(OutputFormat::Jpeg, &selection(false, true, false)), Background::OpaqueWhite);
        assert_eq!(background_fill(OutputFormat::Jpeg, &selection(true, true, false)), Background::Transparent);
        assert_eq!(background_fill(OutputFormat::Png, &selection(false, false, true)), Background::Transparent);
        assert_eq!(background_fill(OutputFormat::Png, &selection(true, true, true)), Background::Transparent);
    }

    #[test]
    fn test_layer_order_is_base_lines_labels() {
        let layers = LayerRasters {
            base: Some(RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255]))),
            lines: Some(RgbaImage::from_pixel(1, 1, RED)),
            labels: Some(RgbaImage::from_pixel(1, 1, BLUE)),
        };
        let out = composite(&layers, OutputFormat::Png, &LayerSelection::all(), PixelDimensions::new(1, 1));
        assert_eq!(out, BLUE.0.to_vec());
    }

    #[test]
    fn test_unselected_layers_are_ignored() {
        let layers = LayerRasters {
            base: Some(RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255]))),
            lines: Some(RgbaImage::from_pixel(1, 1, RED)),
            labels: Some(RgbaImage::from_pixel(1, 1, BLUE)),
        };
        let out = composite(&layers, OutputFormat::Png, &selection(true, true, false), PixelDimensions::new(1, 1));
        assert_eq!(out, RED.0.to_vec());
    }

    #[test]
    fn test_missing_raster_is_transparent() {
        let out = composite(
            &LayerRasters::default(),
            OutputFormat::Png,
            &LayerSelection::all(),
            PixelDimensions::new(3, 1),
        );
        assert_eq!(out, vec![0; 12]);
    }

    #[test]
    fn test_mismatched_raster_is_resampled() {
        let mut lines = RgbaImage::from_pixel(2, 2, CLEAR);
        lines.put_pixel(1, 1, RED);
        let layers = LayerRasters {
            lines: Some(lines),
            ..Default::default()
        };

        let out = composite(&layers, OutputFormat::Png, &LayerSelection::all(), PixelDimensions::new(4, 4));

        let pixel = |x: usize, y: usize| &out[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(pixel(3, 3), &RED.0);
        assert_eq!(pixel(2, 2), &RED.0);
        assert_eq!(pixel(1, 1), &CLEAR.0);
    }

    #[test]
    fn test_empty_target_is_error() {
        let mut out = Vec::new();
        let result = LayerCompositor::new().composite(
            &LayerRasters::default(),
            OutputFormat::Png,
            &LayerSelection::all(),
            PixelDimensions::new(0, 5),
            &mut out,
        );
        assert!(matches!(result, Err(CompositeError::EmptyTarget(_))));
    }

    #[test]
    fn test_sink_failure_reports_row() {
        struct FailingSink(u32);
        impl RowSink for FailingSink {
            fn write_row(&mut self, _row: &[u8]) -> Result<(), String> {
                self.0 += 1;
                if self.0 == 2 {
                    Err("disk full".to_string())
                } else {
                    Ok(())
                }
            }
        }

        let result = LayerCompositor::new().composite(
            &LayerRasters::default(),
            OutputFormat::Png,
            &LayerSelection::all(),
            PixelDimensions::new(1, 3),
            &mut FailingSink(0),
        );
        assert!(matches!(result, Err(CompositeError::Sink { row: 1, .. })));
    }

    #[test]
    fn test_nearest_mapping() {
        assert_eq!(nearest(0, 4, 2), 0);
        assert_eq!(nearest(1, 4, 2), 0);
        assert_eq!(nearest(2, 4, 2), 1);
        assert_eq!(nearest(3, 4, 2), 1);
        assert_eq!(nearest(5, 3, 3), 5);
        assert_eq!(nearest(0, 1, 5), 2);
    }
}
