//! Rendering surface abstraction.
//!
//! The export engine never draws itself. It drives a [`RenderSurface`]:
//! configure a view, ask for one layer to be drawn, wait until the drawing
//! is observable through [`PixelProbe`], then capture the layer raster.
//! Surfaces may draw asynchronously and report imagery progress through
//! [`SurfaceEvent`]s.
//!
//! [`SkiaSurface`] is the in-process implementation built on `tiny-skia`.

pub mod imagery;
pub mod labels;
mod overlay;
mod skia;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use image::RgbaImage;
use thiserror::Error;

use crate::coord::{GeoBounds, PixelDimensions, TileCoord};

pub use imagery::{ImageryError, ImageryProvider, XyzImageryProvider};
pub use overlay::{GeoPoint, LabelPlacement, Overlay, OverlayError, PlaceLabel, RgbaColor, TrackLine};
pub use skia::SkiaSurface;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Visual layers, in composite order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    /// Imagery tiles.
    Base,
    /// Track polylines.
    Lines,
    /// Place markers and label text.
    Labels,
}

impl LayerKind {
    /// All layers in composite order.
    pub const ALL: [LayerKind; 3] = [LayerKind::Base, LayerKind::Lines, LayerKind::Labels];

    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Base => "base",
            LayerKind::Lines => "lines",
            LayerKind::Labels => "labels",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Viewport a surface is configured for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceView {
    pub bounds: GeoBounds,
    pub zoom: u8,
    pub size: PixelDimensions,
}

/// Asynchronous notifications from a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Imagery loading progress for the current layer.
    TileProgress { loaded: u32, total: u32 },
    /// One imagery tile could not be drawn; its area stays transparent.
    TileFailed { tile: TileCoord, reason: String },
}

/// Errors reported by a rendering surface.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The surface or its drawing context cannot be used.
    #[error("Rendering surface unavailable: {0}")]
    Unavailable(String),

    /// The requested view cannot be rendered.
    #[error("Invalid view: {0}")]
    InvalidView(String),

    /// Reading pixels back failed.
    #[error("Pixel read failed: {0}")]
    PixelRead(String),
}

/// Read access to what a surface has drawn so far.
pub trait PixelProbe {
    /// Current pixel size.
    fn dimensions(&self) -> PixelDimensions;

    /// RGBA8 bytes of `rows` scanlines starting at `y`.
    ///
    /// The range is clipped to the surface; only alpha is meaningful for
    /// readiness checks.
    fn read_rows(&self, y: u32, rows: u32) -> Result<Vec<u8>, SurfaceError>;
}

/// A surface the export engine renders sub-regions on.
///
/// One surface is owned by one engine for a whole export and reset with
/// [`RenderSurface::configure`] before every sub-region.
pub trait RenderSurface: PixelProbe + Send {
    /// Resize and reposition the surface, discarding all content and any
    /// drawing still in flight.
    fn configure<'a>(&'a mut self, view: &'a SurfaceView) -> BoxFuture<'a, Result<(), SurfaceError>>;

    /// Clear the surface and start drawing `layer` alone.
    ///
    /// Drawing may complete after the returned future resolves.
    fn draw_layer(&mut self, layer: LayerKind) -> BoxFuture<'_, Result<(), SurfaceError>>;

    /// Next pending event for the current layer; `None` once the layer will
    /// produce no more events.
    fn next_event(&mut self) -> BoxFuture<'_, Option<SurfaceEvent>>;

    /// Whether `layer` has anything to draw in the current view.
    ///
    /// Surfaces that cannot tell return `true`.
    fn expects_content(&self, _layer: LayerKind) -> bool {
        true
    }

    /// Zoom the base imagery of `view` is fetched at.
    ///
    /// Imagery sources that stop short of the view zoom are upscaled from
    /// their deepest level; tile estimates must count tiles at this zoom.
    fn imagery_zoom(&self, view: &SurfaceView) -> u8 {
        view.zoom
    }

    /// Copy of the current content as straight-alpha RGBA.
    fn capture_layer(&mut self) -> Result<RgbaImage, SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_order_and_names() {
        let names: Vec<&str> = LayerKind::ALL.iter().map(|l| l.name()).collect();
        assert_eq!(names, ["base", "lines", "labels"]);
        assert!(LayerKind::Base < LayerKind::Lines && LayerKind::Lines < LayerKind::Labels);
    }

    #[test]
    fn test_surface_error_messages() {
        let err = SurfaceError::Unavailable("context lost".to_string());
        assert_eq!(err.to_string(), "Rendering surface unavailable: context lost");
    }
}
