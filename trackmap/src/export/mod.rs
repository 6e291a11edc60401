//! Export orchestration.
//!
//! [`ExportEngine`] runs the whole pipeline for one [`ExportConfig`]:
//!
//! 1. subdivide the region at the render zoom and plan the grid
//! 2. per sub-region, in row-major order: configure the surface, draw and
//!    capture each selected layer, composite them into a stored PNG tile
//! 3. stream-stitch every stored tile into the output
//!
//! Events go to an [`ExportObserver`]; degradations that still produce an
//! image are collected as [`ExportWarning`]s in the [`ExportReport`].

mod config;
mod engine;
mod error;
mod naming;
mod observer;

pub use config::{ExportConfig, ExportQuality, LayerSelection, OutputFormat};
pub use engine::{ExportEngine, ExportReport};
pub use error::{ExportError, ExportWarning};
pub use naming::{export_filename, FILE_PREFIX};
pub use observer::{ExportObserver, NoopObserver};
