//! Layer composition for one sub-region.
//!
//! The base, lines and labels rasters captured from the surface are blended
//! "source over" in that fixed order, one output scanline at a time, and
//! each finished row goes straight to a [`RowSink`].

mod blend;
mod compositor;

pub use blend::{blend_pixel_over, blend_row_over};
pub use compositor::{background_fill, Background, CompositeError, LayerCompositor, LayerRasters, RowSink};

pub(crate) use compositor::nearest;
