//! Resumable scanline sources over stored tiles.

use std::io::Read;

use png::{BitDepth, ColorType, Transformations};

use super::StitchError;
use crate::composite::nearest;
use crate::coord::PixelDimensions;

/// A tile that yields its RGBA8 scanlines top to bottom.
///
/// Each source keeps its own position, so any number of sources can be
/// advanced in interleaved order.
pub trait ScanlineSource {
    fn dimensions(&self) -> PixelDimensions;

    /// Next scanline, or `None` once every row has been produced.
    fn next_row(&mut self) -> Result<Option<&[u8]>, StitchError>;
}

/// Decodes a stored PNG tile row by row.
pub struct PngRowSource<R: Read> {
    index: usize,
    reader: png::Reader<R>,
    dimensions: PixelDimensions,
}

impl<R: Read> PngRowSource<R> {
    /// Reads the PNG header of tile `index`.
    pub fn new(index: usize, input: R) -> Result<Self, StitchError> {
        let mut decoder = png::Decoder::new(input);
        decoder.set_transformations(Transformations::EXPAND);
        let reader = decoder.read_info().map_err(|e| corrupt(index, e))?;

        match reader.output_color_type() {
            (ColorType::Rgba, BitDepth::Eight) => {}
            (color, depth) => {
                return Err(StitchError::CorruptTile {
                    index,
                    reason: format!("expected 8-bit RGBA, found {:?} at {:?}", color, depth),
                })
            }
        }

        let info = reader.info();
        let dimensions = PixelDimensions::new(info.width, info.height);
        Ok(Self {
            index,
            reader,
            dimensions,
        })
    }
}

impl<R: Read> ScanlineSource for PngRowSource<R> {
    fn dimensions(&self) -> PixelDimensions {
        self.dimensions
    }

    fn next_row(&mut self) -> Result<Option<&[u8]>, StitchError> {
        let index = self.index;
        let row = self.reader.next_row().map_err(|e| corrupt(index, e))?;
        Ok(row.map(|r| r.data()))
    }
}

fn corrupt(index: usize, err: png::DecodingError) -> StitchError {
    StitchError::CorruptTile {
        index,
        reason: err.to_string(),
    }
}

/// Nearest-neighbour resampling of another source to a fixed size.
///
/// Source rows are consumed strictly in order and only the most recent one
/// is kept.
pub struct ResizedSource<S> {
    inner: S,
    index: usize,
    target: PixelDimensions,
    /// Output rows produced so far.
    produced: u32,
    /// Source rows consumed so far.
    consumed: u32,
    current: Vec<u8>,
    out: Vec<u8>,
}

impl<S: ScanlineSource> ResizedSource<S> {
    pub fn new(index: usize, inner: S, target: PixelDimensions) -> Self {
        Self {
            inner,
            index,
            target,
            produced: 0,
            consumed: 0,
            current: Vec::new(),
            out: vec![0; target.row_bytes()],
        }
    }
}

impl<S: ScanlineSource> ScanlineSource for ResizedSource<S> {
    fn dimensions(&self) -> PixelDimensions {
        self.target
    }

    fn next_row(&mut self) -> Result<Option<&[u8]>, StitchError> {
        if self.produced >= self.target.height {
            return Ok(None);
        }
        let source = self.inner.dimensions();
        if source.area() == 0 {
            return Err(StitchError::CorruptTile {
                index: self.index,
                reason: format!("cannot resize an empty {} tile", source),
            });
        }

        let wanted = nearest(self.produced, self.target.height, source.height);
        while self.consumed <= wanted {
            match self.inner.next_row()? {
                Some(row) => {
                    self.current.clear();
                    self.current.extend_from_slice(row);
                }
                None => {
                    return Err(StitchError::ShortTile {
                        index: self.index,
                        rows: self.consumed,
                        expected: source.height,
                    })
                }
            }
            self.consumed += 1;
        }

        for (x, px) in self.out.chunks_exact_mut(4).enumerate() {
            let sx = nearest(x as u32, self.target.width, source.width) as usize * 4;
            px.copy_from_slice(&self.current[sx..sx + 4]);
        }
        self.produced += 1;
        Ok(Some(&self.out))
    }
}
