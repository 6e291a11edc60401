//! Trackmap - tiled, streaming export of large track maps
//!
//! This library renders geographic regions overlaid with track lines and
//! place labels into a single raster image, even when the target resolution
//! is far larger than one rendering surface or one in-memory image can hold.
//!
//! # Pipeline
//!
//! ```text
//! subdivide ──► grid ──► for each cell ┬─► sync (render readiness)
//!                                      └─► composite (layers → PNG tile)
//!                        stitch (row-major tiles → streamed PNG/JPEG)
//! ```
//!
//! [`export::ExportEngine`] drives the pipeline against any
//! [`surface::RenderSurface`]; [`progress`] reports every step to an
//! injected [`export::ExportObserver`].

pub mod composite;
pub mod config;
pub mod coord;
pub mod export;
pub mod grid;
pub mod logging;
pub mod progress;
pub mod stitch;
pub mod subdivide;
pub mod surface;
pub mod sync;

pub use export::{
    ExportConfig, ExportEngine, ExportError, ExportObserver, ExportQuality, ExportReport,
    ExportWarning, LayerSelection, OutputFormat,
};
