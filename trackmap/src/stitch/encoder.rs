//! Streaming image encoders.
//!
//! Encoders pull the final image one scanline at a time from a
//! [`RowProducer`], so the whole mosaic never exists in memory. PNG output
//! keeps alpha; JPEG output flattens it onto white.

use std::cell::RefCell;
use std::io::Write;

use jpeg_encoder::{ImageBuffer, JpegColorType};
use png::{BitDepth, ColorType, Compression};
use thiserror::Error;
use tracing::debug;

use super::StitchError;
use crate::composite::RowSink;
use crate::coord::PixelDimensions;

/// Largest width or height a baseline JPEG can describe.
pub const JPEG_MAX_DIMENSION: u32 = u16::MAX as u32;

/// Codec failures.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] jpeg_encoder::EncodingError),

    #[error("{format} cannot encode a {dimensions} image (limit {max} px per side)")]
    TooLarge {
        format: &'static str,
        dimensions: PixelDimensions,
        max: u32,
    },

    #[error("Cannot encode an empty {0} image")]
    Empty(PixelDimensions),

    #[error("Row {row} has {actual} bytes, expected {expected}")]
    RowLength {
        row: u32,
        actual: usize,
        expected: usize,
    },
}

/// Produces the RGBA8 scanlines of an image in order.
pub trait RowProducer {
    fn dimensions(&self) -> PixelDimensions;

    /// Next scanline; calling past the last row is an error.
    fn next_row(&mut self) -> Result<&[u8], StitchError>;
}

/// Encodes everything a [`RowProducer`] yields.
pub trait ScanlineEncoder {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    /// Pulls every row of `rows` and writes the encoded image.
    fn encode(&mut self, rows: &mut dyn RowProducer) -> Result<(), StitchError>;
}

/// Starts a fast-compressed RGBA8 PNG for one composited tile.
///
/// Rows go through the writer's borrowed [`png::StreamWriter`], which is a
/// [`RowSink`]. Finish the stream, then the writer, to close the file.
pub fn png_tile_writer<W: Write>(
    out: W,
    size: PixelDimensions,
) -> Result<png::Writer<W>, EncodeError> {
    if size.area() == 0 {
        return Err(EncodeError::Empty(size));
    }
    let mut encoder = png::Encoder::new(out, size.width, size.height);
    encoder.set_color(ColorType::Rgba);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(Compression::Fast);
    Ok(encoder.write_header()?)
}

impl<W: Write> RowSink for png::StreamWriter<'_, W> {
    fn write_row(&mut self, row: &[u8]) -> Result<(), String> {
        self.write_all(row).map_err(|e| e.to_string())
    }
}

/// Lossless RGBA output.
pub struct PngScanlineEncoder<W: Write> {
    out: W,
    compression: Compression,
}

impl<W: Write> PngScanlineEncoder<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            compression: Compression::Default,
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ScanlineEncoder for PngScanlineEncoder<W> {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn encode(&mut self, rows: &mut dyn RowProducer) -> Result<(), StitchError> {
        let size = rows.dimensions();
        if size.area() == 0 {
            return Err(EncodeError::Empty(size).into());
        }
        debug!(size = %size, "Encoding PNG");

        let mut encoder = png::Encoder::new(&mut self.out, size.width, size.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        encoder.set_compression(self.compression);
        let mut writer = encoder.write_header().map_err(EncodeError::from)?;
        let mut stream = writer.stream_writer().map_err(EncodeError::from)?;

        let expected = size.row_bytes();
        for y in 0..size.height {
            let row = rows.next_row()?;
            check_row(y, row, expected)?;
            stream
                .write_all(row)
                .map_err(|e| EncodeError::Png(png::EncodingError::IoError(e)))?;
        }
        stream.finish().map_err(EncodeError::from)?;
        writer.finish().map_err(EncodeError::from)?;
        Ok(())
    }
}

/// Lossy RGB output; alpha is flattened onto white.
pub struct JpegScanlineEncoder<W: Write> {
    out: W,
    quality: u8,
}

impl<W: Write> JpegScanlineEncoder<W> {
    /// `quality` is clamped to 1..=100.
    pub fn new(out: W, quality: u8) -> Self {
        Self {
            out,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ScanlineEncoder for JpegScanlineEncoder<W> {
    fn extension(&self) -> &'static str {
        "jpg"
    }

    fn encode(&mut self, rows: &mut dyn RowProducer) -> Result<(), StitchError> {
        let size = rows.dimensions();
        if size.area() == 0 {
            return Err(EncodeError::Empty(size).into());
        }
        if size.width > JPEG_MAX_DIMENSION || size.height > JPEG_MAX_DIMENSION {
            return Err(EncodeError::TooLarge {
                format: "JPEG",
                dimensions: size,
                max: JPEG_MAX_DIMENSION,
            }
            .into());
        }
        debug!(size = %size, quality = self.quality, "Encoding JPEG");

        let image = PulledRows {
            rows: RefCell::new(rows),
            size,
            state: RefCell::new(PullState::default()),
        };
        let encoder = jpeg_encoder::Encoder::new(&mut self.out, self.quality);
        let encoded = encoder.encode_image(&image);

        // A failed pull is the root cause of whatever the codec reports.
        if let Some(err) = image.state.into_inner().failure {
            return Err(err);
        }
        encoded.map_err(EncodeError::from)?;
        Ok(())
    }
}

/// Adapts a [`RowProducer`] to the codec's row callback.
///
/// The codec asks for rows through `&self`, may ask for the last row again
/// to pad its final block, and cannot receive errors. The converted row is
/// cached for repeats; the first failure is parked and blank rows are fed
/// after it.
struct PulledRows<'r> {
    rows: RefCell<&'r mut dyn RowProducer>,
    size: PixelDimensions,
    state: RefCell<PullState>,
}

#[derive(Default)]
struct PullState {
    /// Row held in `ycbcr`.
    current: Option<u16>,
    /// Interleaved luma, blue and red chroma of the current row.
    ycbcr: Vec<u8>,
    failure: Option<StitchError>,
}

impl PulledRows<'_> {
    fn pull(&self, y: u16, state: &mut PullState) -> Result<(), StitchError> {
        let expected = state.current.map_or(0, |c| u32::from(c) + 1);
        if u32::from(y) != expected {
            return Err(StitchError::OutOfOrder {
                expected,
                requested: u32::from(y),
            });
        }

        let mut rows = self.rows.borrow_mut();
        let row = rows.next_row()?;
        check_row(u32::from(y), row, self.size.row_bytes())?;
        state.ycbcr.clear();
        for px in row.chunks_exact(4) {
            let (r, g, b) = flatten_on_white(px);
            let (luma, cb, cr) = rgb_to_ycbcr(r, g, b);
            state.ycbcr.extend_from_slice(&[luma, cb, cr]);
        }
        state.current = Some(y);
        Ok(())
    }
}

impl ImageBuffer for &PulledRows<'_> {
    fn get_jpeg_color_type(&self) -> JpegColorType {
        JpegColorType::Ycbcr
    }

    fn width(&self) -> u16 {
        self.size.width as u16
    }

    fn height(&self) -> u16 {
        self.size.height as u16
    }

    fn fill_buffers(&self, y: u16, buffers: &mut [Vec<u8>; 4]) {
        let mut state = self.state.borrow_mut();
        if state.failure.is_none() && state.current != Some(y) {
            if let Err(err) = self.pull(y, &mut state) {
                state.failure = Some(err);
            }
        }

        if state.failure.is_some() {
            for _ in 0..self.size.width {
                buffers[0].push(255);
                buffers[1].push(128);
                buffers[2].push(128);
            }
            return;
        }
        for px in state.ycbcr.chunks_exact(3) {
            buffers[0].push(px[0]);
            buffers[1].push(px[1]);
            buffers[2].push(px[2]);
        }
    }
}

fn check_row(y: u32, row: &[u8], expected: usize) -> Result<(), EncodeError> {
    if row.len() != expected {
        return Err(EncodeError::RowLength {
            row: y,
            actual: row.len(),
            expected,
        });
    }
    Ok(())
}

/// Straight-alpha RGBA composited over opaque white.
fn flatten_on_white(px: &[u8]) -> (u8, u8, u8) {
    let a = u32::from(px[3]);
    let over = |c: u8| ((u32::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
    (over(px[0]), over(px[1]), over(px[2]))
}

/// JFIF RGB to YCbCr in 16.16 fixed point.
fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    let y = (19595 * r + 38470 * g + 7471 * b + 32768) >> 16;
    let cb = ((-11059 * r - 21709 * g + 32768 * b + 32768) >> 16) + 128;
    let cr = ((32768 * r - 27439 * g - 5329 * b + 32768) >> 16) + 128;
    (
        y.clamp(0, 255) as u8,
        cb.clamp(0, 255) as u8,
        cr.clamp(0, 255) as u8,
    )
}
