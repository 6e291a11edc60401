//! Integration tests for the export pipeline.
//!
//! These tests run complete exports against a scripted in-memory surface:
//! - subdivision, grid ordering and stitching of a multi-tile export
//! - background fill for lossy output without imagery
//! - non-fatal warnings for slow layers and failed imagery tiles
//! - fatal errors and the one-shot terminal callbacks
//!
//! Run with: `cargo test --test export_pipeline`

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use parking_lot::Mutex;

use trackmap::config::RenderWaitConfig;
use trackmap::coord::{GeoBounds, PixelDimensions, TileCoord};
use trackmap::progress::{ExportStage, ProgressInfo};
use trackmap::stitch::StoreKind;
use trackmap::sync::TileLoadTracker;
use trackmap::surface::{
    BoxFuture, LayerKind, PixelProbe, RenderSurface, SurfaceError, SurfaceEvent, SurfaceView,
};
use trackmap::{
    ExportConfig, ExportEngine, ExportError, ExportObserver, ExportWarning, LayerSelection,
    OutputFormat,
};

// ============================================================================
// Fake surface
// ============================================================================

const GREEN: [u8; 4] = [0, 160, 0, 255];
const RED: [u8; 4] = [220, 0, 0, 255];

/// Surface that draws synchronously:
/// - base: solid green, reporting every covering imagery tile as loaded
/// - lines: the left half of the view in red
/// - labels: nothing
#[derive(Default)]
struct FakeSurface {
    size: PixelDimensions,
    pixels: Vec<u8>,
    events: VecDeque<SurfaceEvent>,
    configured: Vec<SurfaceView>,
    /// Lines are reported as present but never appear.
    stall_lines: bool,
    /// Imagery tile that fails in every view.
    failing_tile: Option<TileCoord>,
    /// Deepest zoom the imagery source serves.
    imagery_max_zoom: Option<u8>,
    /// Imagery events stop before the last tile is reported.
    truncate_imagery: bool,
    fail_configure: bool,
}

impl FakeSurface {
    fn fill(&mut self, mut paint: impl FnMut(u32, u32) -> Option<[u8; 4]>) {
        let width = self.size.width;
        for (i, px) in self.pixels.chunks_exact_mut(4).enumerate() {
            let (x, y) = (i as u32 % width, i as u32 / width);
            if let Some(color) = paint(x, y) {
                px.copy_from_slice(&color);
            }
        }
    }
}

impl PixelProbe for FakeSurface {
    fn dimensions(&self) -> PixelDimensions {
        self.size
    }

    fn read_rows(&self, y: u32, rows: u32) -> Result<Vec<u8>, SurfaceError> {
        let row_bytes = self.size.row_bytes();
        let start = (y as usize * row_bytes).min(self.pixels.len());
        let end = ((y + rows) as usize * row_bytes).min(self.pixels.len());
        Ok(self.pixels[start..end].to_vec())
    }
}

impl RenderSurface for FakeSurface {
    fn configure<'a>(&'a mut self, view: &'a SurfaceView) -> BoxFuture<'a, Result<(), SurfaceError>> {
        Box::pin(async move {
            if self.fail_configure {
                return Err(SurfaceError::Unavailable("context lost".to_string()));
            }
            self.size = view.size;
            self.pixels = vec![0; view.size.area() as usize * 4];
            self.events.clear();
            self.configured.push(*view);
            Ok(())
        })
    }

    fn draw_layer(&mut self, layer: LayerKind) -> BoxFuture<'_, Result<(), SurfaceError>> {
        Box::pin(async move {
            self.pixels.fill(0);
            self.events.clear();
            match layer {
                LayerKind::Base => {
                    self.fill(|_, _| Some(GREEN));
                    let total = self.configured.last().map_or(0, |view| {
                        TileLoadTracker::estimate(&view.bounds, self.imagery_zoom(view))
                    });
                    self.events.push_back(SurfaceEvent::TileProgress { loaded: 0, total });
                    if let Some(tile) = self.failing_tile {
                        self.events.push_back(SurfaceEvent::TileFailed {
                            tile,
                            reason: "HTTP 503".to_string(),
                        });
                    }
                    if !self.truncate_imagery {
                        self.events.push_back(SurfaceEvent::TileProgress { loaded: total, total });
                    }
                }
                LayerKind::Lines if !self.stall_lines => {
                    let half = self.size.width / 2;
                    self.fill(|x, _| (x < half).then_some(RED));
                }
                LayerKind::Lines | LayerKind::Labels => {}
            }
            Ok(())
        })
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<SurfaceEvent>> {
        Box::pin(async move { self.events.pop_front() })
    }

    fn expects_content(&self, layer: LayerKind) -> bool {
        layer != LayerKind::Labels
    }

    fn imagery_zoom(&self, view: &SurfaceView) -> u8 {
        self.imagery_max_zoom.map_or(view.zoom, |max| view.zoom.min(max))
    }

    fn capture_layer(&mut self) -> Result<RgbaImage, SurfaceError> {
        RgbaImage::from_raw(self.size.width, self.size.height, self.pixels.clone())
            .ok_or_else(|| SurfaceError::PixelRead("buffer size mismatch".to_string()))
    }
}

// ============================================================================
// Recording observer
// ============================================================================

#[derive(Default)]
struct Recorder {
    calculated: Mutex<Vec<usize>>,
    started: Mutex<Vec<usize>>,
    stitched: Mutex<Vec<usize>>,
    stages: Mutex<Vec<ProgressInfo>>,
    completed: Mutex<Vec<(u64, String)>>,
    errors: Mutex<Vec<String>>,
}

impl ExportObserver for Recorder {
    fn on_subdivisions_calculated(&self, count: usize) {
        self.calculated.lock().push(count);
    }

    fn on_subdivision_progress(&self, index: usize, _total: usize) {
        self.started.lock().push(index);
    }

    fn on_stage_progress(&self, info: &ProgressInfo) {
        self.stages.lock().push(info.clone());
    }

    fn on_subdivision_stitched(&self, index: usize) {
        self.stitched.lock().push(index);
    }

    fn on_complete(&self, bytes: u64, filename: &str) {
        self.completed.lock().push((bytes, filename.to_string()));
    }

    fn on_error(&self, error: &ExportError) {
        self.errors.lock().push(error.to_string());
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn region() -> GeoBounds {
    GeoBounds::new(52.0, 51.0, 2.0, 0.0).unwrap()
}

fn fast_wait() -> RenderWaitConfig {
    RenderWaitConfig::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_settle_delay(Duration::from_millis(5))
        .with_max_checks(4)
        .with_tile_wait_checks(10)
}

fn engine(surface: FakeSurface) -> ExportEngine<FakeSurface> {
    ExportEngine::new(surface).with_render_wait(fast_wait())
}

fn pixel(image: &RgbaImage, x: u32, y: u32) -> [u8; 4] {
    image.get_pixel(x, y).0
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A region larger than one surface is rendered in pieces and reassembled
/// with every piece in its place.
#[tokio::test(start_paused = true)]
async fn test_multi_tile_png_export() {
    let config = ExportConfig::new(region(), 9).with_max_dimension(300);
    let recorder = Arc::new(Recorder::default());
    let mut engine = engine(FakeSurface::default());
    let mut out = Vec::new();

    let report = engine.export(&config, recorder.clone(), &mut out).await.unwrap();

    assert!(report.subdivisions > 1, "expected several sub-regions");
    assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
    assert_eq!(report.bytes, out.len() as u64);
    assert!(report.filename.starts_with("trackmap-map-all-"));
    assert!(report.filename.ends_with(".png"));

    // Every configured view fits the surface limit.
    let views = &engine.surface().configured;
    assert_eq!(views.len(), report.subdivisions);
    assert!(views.iter().all(|v| v.size.fits_within(300)));

    let image = image::load_from_memory(&out).unwrap().to_rgba8();
    assert_eq!(
        PixelDimensions::new(image.width(), image.height()),
        report.dimensions
    );

    // Check a pixel in each quarter of the top-left and bottom-right cells.
    let layout = trackmap::grid::plan_grid(
        &trackmap::subdivide::subdivide_bounds(&region(), 9, 300).unwrap(),
        9,
    );
    for sub in [&layout.ordered[0], layout.ordered.last().unwrap()] {
        let cy = sub.cell.y + sub.cell.height / 2;
        let left = sub.cell.x + sub.cell.width / 4;
        let right = sub.cell.x + sub.cell.width * 3 / 4;
        assert_eq!(pixel(&image, left, cy), RED, "lines over base in cell {}", sub.index);
        assert_eq!(pixel(&image, right, cy), GREEN, "base alone in cell {}", sub.index);
    }
}

/// Observer events arrive once each and in row-major order.
#[tokio::test(start_paused = true)]
async fn test_observer_event_sequence() {
    let config = ExportConfig::new(region(), 9).with_max_dimension(300);
    let recorder = Arc::new(Recorder::default());
    let mut engine = engine(FakeSurface::default());

    let report = engine.export(&config, recorder.clone(), Vec::new()).await.unwrap();

    let expected: Vec<usize> = (0..report.subdivisions).collect();
    assert_eq!(*recorder.calculated.lock(), vec![report.subdivisions]);
    assert_eq!(*recorder.started.lock(), expected);
    assert_eq!(*recorder.stitched.lock(), expected);
    assert_eq!(recorder.completed.lock().len(), 1);
    assert_eq!(recorder.completed.lock()[0].1, report.filename);
    assert!(recorder.errors.lock().is_empty());

    let stages = recorder.stages.lock();
    assert!(stages.iter().any(|s| s.stage_label == format!("base 1/{}", report.subdivisions)));
    assert!(stages.iter().any(|s| s.stage_label == "tiles" && s.percentage == 100));
    let last = stages.last().unwrap();
    assert_eq!(last.stage_label, "stitching");
    assert_eq!(last.percentage, 100);
}

/// Lossy output without imagery gets a white background.
#[tokio::test(start_paused = true)]
async fn test_jpeg_without_base_is_white() {
    let config = ExportConfig::new(region(), 8)
        .with_format(OutputFormat::Jpeg)
        .with_layers(LayerSelection::new(false, true, true));
    let mut engine = engine(FakeSurface::default());
    let mut out = Vec::new();

    let report = engine
        .export(&config, Arc::new(Recorder::default()), &mut out)
        .await
        .unwrap();

    assert!(report.filename.starts_with("trackmap-map-lines-labels-"));
    assert!(report.filename.ends_with(".jpg"));

    let image = image::load_from_memory(&out).unwrap().to_rgb8();
    let (w, h) = image.dimensions();
    let right = image.get_pixel(w * 7 / 8, h / 2).0;
    assert!(right.iter().all(|c| *c > 240), "expected white, got {:?}", right);
    let left = image.get_pixel(w / 8, h / 2).0;
    assert!(left[0] > 180 && left[1] < 60, "expected red, got {:?}", left);
}

/// Lossless output without imagery keeps transparency.
#[tokio::test(start_paused = true)]
async fn test_png_without_base_is_transparent() {
    let config = ExportConfig::new(region(), 8).with_layers(LayerSelection::new(false, true, false));
    let mut engine = engine(FakeSurface::default()).with_store(StoreKind::Disk);
    let mut out = Vec::new();

    engine
        .export(&config, Arc::new(Recorder::default()), &mut out)
        .await
        .unwrap();

    let image = image::load_from_memory(&out).unwrap().to_rgba8();
    let (w, h) = image.dimensions();
    assert_eq!(pixel(&image, w * 7 / 8, h / 2)[3], 0);
    assert_eq!(pixel(&image, w / 8, h / 2), RED);
}

/// A layer that never shows up is captured anyway and reported.
#[tokio::test(start_paused = true)]
async fn test_stalled_layer_is_a_warning() {
    let config = ExportConfig::new(region(), 8);
    let surface = FakeSurface {
        stall_lines: true,
        ..Default::default()
    };
    let recorder = Arc::new(Recorder::default());
    let mut engine = engine(surface);

    let report = engine.export(&config, recorder.clone(), Vec::new()).await.unwrap();

    assert_eq!(report.warnings.len(), report.subdivisions);
    assert!(report.warnings.iter().all(|w| matches!(
        w,
        ExportWarning::RenderTimeout {
            layer: LayerKind::Lines,
            checks: 4,
            ..
        }
    )));
    assert_eq!(recorder.completed.lock().len(), 1);
}

/// Failed imagery tiles degrade the export without failing it.
#[tokio::test(start_paused = true)]
async fn test_failed_tiles_are_a_warning() {
    let tile = TileCoord {
        row: 10,
        col: 20,
        zoom: 8,
    };
    let config = ExportConfig::new(region(), 8).with_layers(LayerSelection::new(true, false, false));
    let surface = FakeSurface {
        failing_tile: Some(tile),
        ..Default::default()
    };
    let mut engine = engine(surface);

    let report = engine
        .export(&config, Arc::new(Recorder::default()), Vec::new())
        .await
        .unwrap();

    assert!(!report.warnings.is_empty());
    match &report.warnings[0] {
        ExportWarning::TileLoad { index, failed, .. } => {
            assert_eq!(*index, 0);
            assert_eq!(failed, &vec![tile]);
        }
        other => panic!("unexpected warning {:?}", other),
    }
}

/// Imagery served from a shallower zoom than the view is counted at that
/// zoom, so the tiles stage runs to completion.
#[tokio::test(start_paused = true)]
async fn test_shallow_imagery_completes_tiles_stage() {
    let bounds = GeoBounds::new(51.52, 51.50, -0.10, -0.13).unwrap();
    let config = ExportConfig::new(bounds, 12).with_layers(LayerSelection::new(true, false, false));
    assert!(TileLoadTracker::estimate(&bounds, 12) > TileLoadTracker::estimate(&bounds, 9));

    let surface = FakeSurface {
        imagery_max_zoom: Some(9),
        ..Default::default()
    };
    let recorder = Arc::new(Recorder::default());
    let mut engine = engine(surface);

    let report = engine.export(&config, recorder.clone(), Vec::new()).await.unwrap();

    assert!(report.warnings.is_empty(), "unexpected warnings {:?}", report.warnings);
    let stages = recorder.stages.lock();
    let last_tiles = stages
        .iter()
        .filter(|info| info.stage == ExportStage::Tiles)
        .last()
        .unwrap();
    assert_eq!(last_tiles.percentage, 100);
    assert_eq!(last_tiles.total, u64::from(TileLoadTracker::estimate(&bounds, 9)));
}

/// A surface that stops reporting imagery early leaves a warning even when
/// no tile explicitly failed.
#[tokio::test(start_paused = true)]
async fn test_unfinished_imagery_is_a_warning() {
    let config = ExportConfig::new(region(), 8).with_layers(LayerSelection::new(true, false, false));
    let surface = FakeSurface {
        truncate_imagery: true,
        ..Default::default()
    };
    let mut engine = engine(surface);

    let report = engine
        .export(&config, Arc::new(Recorder::default()), Vec::new())
        .await
        .unwrap();

    match report.warnings.as_slice() {
        [ExportWarning::TileLoad {
            index,
            failed,
            loaded,
            total,
        }] => {
            assert_eq!(*index, 0);
            assert!(failed.is_empty());
            assert_eq!(*loaded, 0);
            assert_eq!(*total, TileLoadTracker::estimate(&region(), 8));
        }
        other => panic!("unexpected warnings {:?}", other),
    }
}

/// Invalid input fails before anything is rendered.
#[tokio::test(start_paused = true)]
async fn test_subdivision_error_is_fatal() {
    let config = ExportConfig::new(region(), 8).with_max_dimension(0);
    let recorder = Arc::new(Recorder::default());
    let mut engine = engine(FakeSurface::default());
    let mut out = Vec::new();

    let result = engine.export(&config, recorder.clone(), &mut out).await;

    assert!(matches!(result, Err(ExportError::SubdivisionCompute(_))));
    assert!(out.is_empty());
    assert!(engine.surface().configured.is_empty());
    assert_eq!(recorder.errors.lock().len(), 1);
    assert!(recorder.completed.lock().is_empty());
}

/// A surface that cannot be configured aborts the export.
#[tokio::test(start_paused = true)]
async fn test_surface_failure_is_fatal() {
    let config = ExportConfig::new(region(), 8);
    let surface = FakeSurface {
        fail_configure: true,
        ..Default::default()
    };
    let recorder = Arc::new(Recorder::default());
    let mut engine = engine(surface);

    let result = engine.export(&config, recorder.clone(), Vec::new()).await;

    assert!(matches!(result, Err(ExportError::Composition { index: 0, .. })));
    assert_eq!(recorder.errors.lock().len(), 1);
    assert!(recorder.completed.lock().is_empty());
}

/// Mosaics a JPEG cannot describe are refused before rendering.
#[tokio::test(start_paused = true)]
async fn test_oversized_jpeg_is_refused_early() {
    let world = GeoBounds::new(80.0, -80.0, 179.0, -179.0).unwrap();
    let config = ExportConfig::new(world, 9).with_format(OutputFormat::Jpeg);
    let mut engine = engine(FakeSurface::default());

    let result = engine
        .export(&config, Arc::new(Recorder::default()), Vec::new())
        .await;

    assert!(matches!(result, Err(ExportError::Encoding(_))));
    assert!(engine.surface().configured.is_empty());
}

/// Rendering at a higher quality renders more pixels.
#[tokio::test(start_paused = true)]
async fn test_quality_raises_render_zoom() {
    let small = GeoBounds::new(51.6, 51.5, 0.0, -0.1).unwrap();
    let mut engine = engine(FakeSurface::default());

    let standard = engine
        .export(&ExportConfig::new(small, 10), Arc::new(Recorder::default()), Vec::new())
        .await
        .unwrap();
    let ultra = engine
        .export(
            &ExportConfig::new(small, 10).with_quality(trackmap::ExportQuality::Ultra),
            Arc::new(Recorder::default()),
            Vec::new(),
        )
        .await
        .unwrap();

    assert_eq!(standard.zoom, 10);
    assert_eq!(ultra.zoom, 12);
    assert!(ultra.dimensions.width >= standard.dimensions.width * 4 - 4);
}
