//! Streaming assembly of composited tiles into the final image.
//!
//! Composited sub-regions are parked in a [`TileStore`] as PNG. The
//! [`StreamingStitcher`] then walks the grid one row group at a time,
//! decoding one scanline of every tile in the group per output line, and
//! feeds the concatenated lines to a [`ScanlineEncoder`].
//!
//! ```text
//! row group 0:  tile 0 ─┐
//!               tile 1 ─┼─► line ─► encoder ─► Write
//!               tile 2 ─┘
//! row group 1:  ...
//! ```

mod encoder;
mod source;
mod stitcher;
mod store;

use thiserror::Error;

pub use encoder::{
    png_tile_writer, EncodeError, JpegScanlineEncoder, PngScanlineEncoder, RowProducer,
    ScanlineEncoder, JPEG_MAX_DIMENSION,
};
pub use source::{PngRowSource, ResizedSource, ScanlineSource};
pub use stitcher::StreamingStitcher;
pub use store::{
    DiskTileStore, MemoryTileStore, SpillingTileStore, StoreError, StoreKind, TileStore,
};

/// Failures while assembling or encoding the final image.
#[derive(Debug, Error)]
pub enum StitchError {
    #[error("Layout has no tiles to stitch")]
    EmptyLayout,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Tile {index} is unreadable: {reason}")]
    CorruptTile { index: usize, reason: String },

    #[error("Tile {index} ended after {rows} of {expected} rows")]
    ShortTile {
        index: usize,
        rows: u32,
        expected: u32,
    },

    #[error("Encoder asked for row {requested} while row {expected} was next")]
    OutOfOrder { expected: u32, requested: u32 },

    #[error("Output ran past the last row {0}")]
    PastEnd(u32),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
