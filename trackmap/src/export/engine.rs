//! Export orchestration.

use std::io::{self, Write};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use super::naming::export_filename;
use super::observer::ObserverHandle;
use super::{ExportConfig, ExportError, ExportObserver, ExportWarning, OutputFormat};
use crate::composite::{LayerCompositor, LayerRasters};
use crate::config::RenderWaitConfig;
use crate::coord::{project_dimensions, PixelDimensions};
use crate::grid::{plan_grid, GridLayout, Subdivision};
use crate::progress::{ExportProgress, ExportStage, SubdivisionProgress};
use crate::stitch::{
    png_tile_writer, EncodeError, JpegScanlineEncoder, PngScanlineEncoder, ScanlineEncoder,
    StitchError, StoreKind, StreamingStitcher, TileStore, JPEG_MAX_DIMENSION,
};
use crate::subdivide::subdivide_bounds;
use crate::surface::{LayerKind, RenderSurface, SurfaceView};
use crate::sync::{Readiness, RenderSynchronizer, TileLoadTracker, TileWait};

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub filename: String,
    /// Encoded bytes written to the output.
    pub bytes: u64,
    pub dimensions: PixelDimensions,
    pub zoom: u8,
    pub subdivisions: usize,
    pub rows: usize,
    pub columns: usize,
    pub warnings: Vec<ExportWarning>,
}

/// Renders, composites and stitches one export at a time on a surface it
/// owns for its whole life.
pub struct ExportEngine<S: RenderSurface> {
    surface: S,
    synchronizer: RenderSynchronizer,
    store_kind: StoreKind,
    compositor: LayerCompositor,
    stitcher: StreamingStitcher,
}

impl<S: RenderSurface> ExportEngine<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            synchronizer: RenderSynchronizer::default(),
            store_kind: StoreKind::default(),
            compositor: LayerCompositor::new(),
            stitcher: StreamingStitcher::new(),
        }
    }

    pub fn with_render_wait(mut self, config: RenderWaitConfig) -> Self {
        self.synchronizer = RenderSynchronizer::new(config);
        self
    }

    pub fn with_store(mut self, kind: StoreKind) -> Self {
        self.store_kind = kind;
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Runs a full export, writing the encoded image to `out`.
    ///
    /// On error, whatever reached `out` is incomplete. `observer` receives
    /// exactly one terminal event.
    pub async fn export<W: Write>(
        &mut self,
        config: &ExportConfig,
        observer: Arc<dyn ExportObserver>,
        out: W,
    ) -> Result<ExportReport, ExportError> {
        let handle = ObserverHandle::new(observer);
        match self.run(config, &handle, out).await {
            Ok(report) => {
                info!(
                    filename = %report.filename,
                    bytes = report.bytes,
                    size = %report.dimensions,
                    warnings = report.warnings.len(),
                    "Export complete"
                );
                handle.complete(report.bytes, &report.filename);
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, "Export failed");
                handle.fail(&err);
                Err(err)
            }
        }
    }

    #[instrument(skip_all, fields(zoom = config.zoom, layers = %config.layers))]
    async fn run<W: Write>(
        &mut self,
        config: &ExportConfig,
        observer: &ObserverHandle,
        out: W,
    ) -> Result<ExportReport, ExportError> {
        config.validate()?;
        let filename = export_filename(&config.layers, config.output_format, Utc::now());
        let zoom = config.render_zoom();

        let parts = subdivide_bounds(&config.bounds, zoom, config.max_dimension_px)?;
        let layout = plan_grid(&parts, zoom);
        info!(
            bounds = %config.bounds,
            render_zoom = zoom,
            subdivisions = layout.len(),
            rows = layout.rows,
            columns = layout.columns,
            size = %layout.dimensions,
            "Planned export"
        );
        observer.subdivisions_calculated(layout.len());
        check_encodable(config.output_format, layout.dimensions)?;

        let mut store = self.store_kind.create()?;
        let mut progress = ExportProgress::new(observer.stage_forwarder());
        let mut warnings = Vec::new();

        for sub in &layout.ordered {
            observer.subdivision_progress(sub.index, layout.len());
            let tracker = progress.activate(sub.index);
            let rasters = self
                .render_subdivision(sub, zoom, config, layout.len(), tracker, &mut warnings)
                .await?;
            self.store_tile(sub, zoom, config, &rasters, store.as_mut())?;
        }

        let bytes = self.stitch(&layout, config, store.as_ref(), observer, &mut progress, out)?;
        progress.clear();
        store.clear()?;

        for warning in &warnings {
            warn!(%warning, "Export degraded");
        }
        Ok(ExportReport {
            filename,
            bytes,
            dimensions: layout.dimensions,
            zoom,
            subdivisions: layout.len(),
            rows: layout.rows,
            columns: layout.columns,
            warnings,
        })
    }

    /// Draws and captures every selected layer of one sub-region.
    async fn render_subdivision(
        &mut self,
        sub: &Subdivision,
        zoom: u8,
        config: &ExportConfig,
        count: usize,
        tracker: &mut SubdivisionProgress,
        warnings: &mut Vec<ExportWarning>,
    ) -> Result<LayerRasters, ExportError> {
        let view = SurfaceView {
            bounds: sub.bounds,
            zoom,
            size: project_dimensions(&sub.bounds, zoom),
        };
        debug!(index = sub.index, size = %view.size, "Configuring surface");
        self.surface
            .configure(&view)
            .await
            .map_err(|e| ExportError::composition(sub.index, e))?;

        let mut rasters = LayerRasters::default();
        for layer in config.layers.selected() {
            match layer {
                LayerKind::Base => {
                    tracker.set_stage_at(ExportStage::Base, sub.index + 1, count);
                    self.draw(sub.index, layer).await?;
                    self.wait_for_imagery(sub.index, &view, tracker, warnings).await;
                }
                LayerKind::Lines | LayerKind::Labels => {
                    let stage = if layer == LayerKind::Lines {
                        ExportStage::Lines
                    } else {
                        ExportStage::Labels
                    };
                    tracker.set_stage(stage);
                    self.draw(sub.index, layer).await?;
                    self.wait_for_drawing(sub.index, layer, warnings).await;
                    tracker.update(1, 1);
                }
            }

            let raster = self
                .surface
                .capture_layer()
                .map_err(|e| ExportError::composition(sub.index, e))?;
            rasters.set(layer, raster);
        }
        Ok(rasters)
    }

    async fn draw(&mut self, index: usize, layer: LayerKind) -> Result<(), ExportError> {
        debug!(index, %layer, "Drawing layer");
        self.surface
            .draw_layer(layer)
            .await
            .map_err(|e| ExportError::composition(index, e))
    }

    /// Follows imagery loading for the base layer.
    ///
    /// Tiles are counted at the zoom the surface fetches imagery at, which
    /// may be shallower than the view zoom.
    async fn wait_for_imagery(
        &mut self,
        index: usize,
        view: &SurfaceView,
        tracker: &mut SubdivisionProgress,
        warnings: &mut Vec<ExportWarning>,
    ) {
        let imagery_zoom = self.surface.imagery_zoom(view);
        let mut tiles =
            TileLoadTracker::begin(TileLoadTracker::estimate(&view.bounds, imagery_zoom));
        tracker.set_stage(ExportStage::Tiles);
        tracker.update(0, u64::from(tiles.total()));

        if !self.surface.expects_content(LayerKind::Base) {
            debug!(index, "No imagery for this view");
            tracker.update(0, 0);
            return;
        }

        let wait = self
            .synchronizer
            .wait_for_tiles(&mut self.surface, &mut tiles, |t| {
                tracker.update(u64::from(t.loaded()), u64::from(t.total()));
            })
            .await;

        if let TileWait::Drained { polls } = wait {
            warn!(
                index,
                zoom = imagery_zoom,
                loaded = tiles.loaded(),
                total = tiles.total(),
                polls,
                "Surface stopped reporting before imagery finished"
            );
        }
        let complete = matches!(wait, TileWait::Complete { .. });
        if !complete || !tiles.failed().is_empty() {
            warnings.push(ExportWarning::TileLoad {
                index,
                failed: tiles.failed().to_vec(),
                loaded: tiles.loaded(),
                total: tiles.total(),
            });
        }
    }

    /// Waits until vector content is observable on the surface.
    async fn wait_for_drawing(
        &mut self,
        index: usize,
        layer: LayerKind,
        warnings: &mut Vec<ExportWarning>,
    ) {
        if !self.surface.expects_content(layer) {
            debug!(index, %layer, "Nothing to draw; skipping readiness wait");
            return;
        }
        match self.synchronizer.wait_until_drawn(&self.surface).await {
            Readiness::Drawn { checks } => {
                debug!(index, %layer, checks, "Layer drawn");
            }
            Readiness::TimedOut { checks } => {
                warnings.push(ExportWarning::RenderTimeout {
                    index,
                    layer,
                    checks,
                });
            }
            Readiness::ReadFailed { checks, error } => {
                warn!(index, %layer, checks, %error, "Pixel probe failed; capturing anyway");
            }
        }
    }

    /// Composites the captured layers and parks the tile in the store.
    fn store_tile(
        &self,
        sub: &Subdivision,
        zoom: u8,
        config: &ExportConfig,
        rasters: &LayerRasters,
        store: &mut dyn TileStore,
    ) -> Result<(), ExportError> {
        let size = project_dimensions(&sub.bounds, zoom);
        let encoded = encode_tile(&self.compositor, sub.index, rasters, config, size)?;
        store.put(sub.index, encoded)?;
        Ok(())
    }

    /// Streams all stored tiles into `out`; returns the bytes written.
    fn stitch<W: Write>(
        &self,
        layout: &GridLayout,
        config: &ExportConfig,
        store: &dyn TileStore,
        observer: &ObserverHandle,
        progress: &mut ExportProgress,
        out: W,
    ) -> Result<u64, ExportError> {
        let mut out = CountingWriter::new(out);
        {
            let mut encoder: Box<dyn ScanlineEncoder + '_> = match config.output_format {
                OutputFormat::Png => Box::new(PngScanlineEncoder::new(&mut out)),
                OutputFormat::Jpeg => {
                    Box::new(JpegScanlineEncoder::new(&mut out, config.jpeg_quality))
                }
            };

            let total = layout.len() as u64;
            let mut stitched = 0u64;
            self.stitcher
                .stitch(layout, store, encoder.as_mut(), |index| {
                    stitched += 1;
                    let tracker = progress.activate(index);
                    tracker.set_stage(ExportStage::Stitching);
                    tracker.update(stitched, total);
                    observer.subdivision_stitched(index);
                })?;
        }
        out.flush()?;
        Ok(out.written())
    }
}

/// Rejects mosaics the output format cannot describe before any rendering.
/// Composites `rasters` into a `size` tile and encodes it as PNG.
fn encode_tile(
    compositor: &LayerCompositor,
    index: usize,
    rasters: &LayerRasters,
    config: &ExportConfig,
    size: PixelDimensions,
) -> Result<Vec<u8>, ExportError> {
    let mut encoded = Vec::new();
    let mut writer =
        png_tile_writer(&mut encoded, size).map_err(|e| ExportError::composition(index, e))?;
    let mut stream = writer
        .stream_writer()
        .map_err(|e| ExportError::composition(index, e))?;
    compositor
        .composite(rasters, config.output_format, &config.layers, size, &mut stream)
        .map_err(|e| ExportError::composition(index, e))?;
    stream
        .finish()
        .map_err(|e| ExportError::composition(index, e))?;
    writer
        .finish()
        .map_err(|e| ExportError::composition(index, e))?;
    Ok(encoded)
}

fn check_encodable(format: OutputFormat, size: PixelDimensions) -> Result<(), ExportError> {
    if format == OutputFormat::Jpeg && (size.width > JPEG_MAX_DIMENSION || size.height > JPEG_MAX_DIMENSION) {
        return Err(StitchError::Encode(EncodeError::TooLarge {
            format: "JPEG",
            dimensions: size,
            max: JPEG_MAX_DIMENSION,
        })
        .into());
    }
    Ok(())
}

/// Counts bytes passing through to the output.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    fn written(&self) -> u64 {
        self.written
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
