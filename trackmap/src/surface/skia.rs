//! In-process rendering surface built on `tiny-skia`.
//!
//! Every layer is drawn by a spawned Tokio task into a shared pixmap, so the
//! pixels become visible some time after [`RenderSurface::draw_layer`]
//! returns, just like a GPU or browser-backed map would behave. Pending
//! tasks are aborted whenever the surface is reset.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use image::RgbaImage;
use parking_lot::Mutex;
use rusttype::{point, Font, Scale};
use tiny_skia::{
    Color, ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pixmap,
    PixmapPaint, PremultipliedColorU8, Rect, Shader, Stroke, Transform,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::imagery::ImageryProvider;
use super::labels::{place_labels, LabelRequest};
use super::overlay::{Overlay, PlaceLabel, RgbaColor};
use super::{BoxFuture, LayerKind, PixelProbe, RenderSurface, SurfaceError, SurfaceEvent, SurfaceView};
use crate::coord::{
    lat_to_world_y, lon_to_world_x, project_extent, tiles_covering, PixelDimensions, TileCoord,
    TILE_SIZE,
};

/// Imagery tiles fetched concurrently while drawing the base layer.
const DEFAULT_FETCH_CONCURRENCY: usize = 8;

const MARKER_RADIUS: f32 = 5.0;
const LABEL_FONT_PX: f32 = 13.0;
const LABEL_PADDING: f32 = 3.0;
/// Glyph advance assumed when no font is loaded.
const FALLBACK_GLYPH_WIDTH: f32 = 7.0;

/// Maps world pixels at the view zoom onto surface pixels.
#[derive(Debug, Clone, Copy)]
struct ViewProjection {
    zoom: u8,
    origin_x: f64,
    origin_y: f64,
    scale_x: f64,
    scale_y: f64,
}

impl ViewProjection {
    fn new(view: &SurfaceView) -> Self {
        let (extent_w, extent_h) = project_extent(&view.bounds, view.zoom);
        Self {
            zoom: view.zoom,
            origin_x: lon_to_world_x(view.bounds.west, view.zoom),
            origin_y: lat_to_world_y(view.bounds.north, view.zoom),
            scale_x: view.size.width as f64 / extent_w,
            scale_y: view.size.height as f64 / extent_h,
        }
    }

    fn to_px(&self, lat: f64, lon: f64) -> (f32, f32) {
        let x = (lon_to_world_x(lon, self.zoom) - self.origin_x) * self.scale_x;
        let y = (lat_to_world_y(lat, self.zoom) - self.origin_y) * self.scale_y;
        (x as f32, y as f32)
    }

    /// Transform placing imagery tile `tile` (256px at its own zoom).
    fn tile_transform(&self, tile: &TileCoord) -> Transform {
        let zoom_scale = 2f64.powi(self.zoom as i32 - tile.zoom as i32);
        let world_x = tile.col as f64 * TILE_SIZE as f64 * zoom_scale;
        let world_y = tile.row as f64 * TILE_SIZE as f64 * zoom_scale;
        Transform::from_row(
            (zoom_scale * self.scale_x) as f32,
            0.0,
            0.0,
            (zoom_scale * self.scale_y) as f32,
            ((world_x - self.origin_x) * self.scale_x) as f32,
            ((world_y - self.origin_y) * self.scale_y) as f32,
        )
    }
}

/// State shared with one drawing task.
struct Canvas {
    pixmap: Arc<Mutex<Pixmap>>,
    view: SurfaceView,
    projection: ViewProjection,
}

/// `tiny-skia` rendering surface for base imagery, tracks and labels.
pub struct SkiaSurface {
    overlay: Arc<Overlay>,
    imagery: Option<Arc<dyn ImageryProvider>>,
    font: Option<Arc<Font<'static>>>,
    fetch_concurrency: usize,
    canvas: Option<Canvas>,
    tasks: Vec<JoinHandle<()>>,
    events: mpsc::UnboundedReceiver<SurfaceEvent>,
}

impl SkiaSurface {
    /// Creates a surface drawing `overlay`, without base imagery or text.
    pub fn new(overlay: Overlay) -> Self {
        let (_, events) = mpsc::unbounded_channel();
        Self {
            overlay: Arc::new(overlay),
            imagery: None,
            font: None,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            canvas: None,
            tasks: Vec::new(),
            events,
        }
    }

    /// Draws the base layer from `provider`.
    pub fn with_imagery(mut self, provider: Arc<dyn ImageryProvider>) -> Self {
        self.imagery = Some(provider);
        self
    }

    /// Renders label text with `font`.
    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.font = Some(Arc::new(font));
        self
    }

    /// Loads a TTF/OTF font for label text.
    pub fn with_font_file(self, path: &Path) -> Result<Self, SurfaceError> {
        let data = std::fs::read(path)
            .map_err(|e| SurfaceError::Unavailable(format!("font {}: {}", path.display(), e)))?;
        let font = Font::try_from_vec(data).ok_or_else(|| {
            SurfaceError::Unavailable(format!("font {}: unsupported format", path.display()))
        })?;
        Ok(self.with_font(font))
    }

    /// Sets how many imagery tiles are fetched at once. Default: 8.
    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency.max(1);
        self
    }

    fn abort_pending(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    fn canvas(&self) -> Result<&Canvas, SurfaceError> {
        self.canvas
            .as_ref()
            .ok_or_else(|| SurfaceError::Unavailable("surface not configured".to_string()))
    }

    fn start_layer(&mut self, layer: LayerKind) -> Result<(), SurfaceError> {
        self.abort_pending();
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = rx;

        let canvas = self.canvas()?;
        canvas.pixmap.lock().fill(Color::TRANSPARENT);
        let pixmap = Arc::clone(&canvas.pixmap);
        let view = canvas.view;
        let projection = canvas.projection;

        let task = match layer {
            LayerKind::Base => {
                let Some(provider) = self.imagery.clone() else {
                    let _ = tx.send(SurfaceEvent::TileProgress { loaded: 0, total: 0 });
                    return Ok(());
                };
                let concurrency = self.fetch_concurrency;
                tokio::spawn(async move {
                    draw_base(pixmap, view, projection, provider, concurrency, tx).await;
                })
            }
            LayerKind::Lines => {
                let overlay = Arc::clone(&self.overlay);
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    draw_tracks(&mut pixmap.lock(), &view, &projection, &overlay);
                    drop(tx);
                })
            }
            LayerKind::Labels => {
                let overlay = Arc::clone(&self.overlay);
                let font = self.font.clone();
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    draw_places(&mut pixmap.lock(), &view, &projection, &overlay, font.as_deref());
                    drop(tx);
                })
            }
        };
        self.tasks.push(task);
        Ok(())
    }
}

impl Drop for SkiaSurface {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

impl PixelProbe for SkiaSurface {
    fn dimensions(&self) -> PixelDimensions {
        self.canvas
            .as_ref()
            .map(|c| c.view.size)
            .unwrap_or_default()
    }

    fn read_rows(&self, y: u32, rows: u32) -> Result<Vec<u8>, SurfaceError> {
        let canvas = self.canvas()?;
        let pixmap = canvas.pixmap.lock();
        let height = pixmap.height();
        if y >= height {
            return Err(SurfaceError::PixelRead(format!(
                "row {} outside surface of height {}",
                y, height
            )));
        }
        let stride = pixmap.width() as usize * 4;
        let end = y.saturating_add(rows).min(height) as usize;
        Ok(pixmap.data()[y as usize * stride..end * stride].to_vec())
    }
}

impl RenderSurface for SkiaSurface {
    fn configure<'a>(&'a mut self, view: &'a SurfaceView) -> BoxFuture<'a, Result<(), SurfaceError>> {
        Box::pin(async move {
            self.abort_pending();
            let (_, events) = mpsc::unbounded_channel();
            self.events = events;

            let pixmap = Pixmap::new(view.size.width, view.size.height).ok_or_else(|| {
                SurfaceError::InvalidView(format!("cannot allocate {} surface", view.size))
            })?;
            debug!(bounds = %view.bounds, zoom = view.zoom, size = %view.size, "Surface configured");
            self.canvas = Some(Canvas {
                pixmap: Arc::new(Mutex::new(pixmap)),
                view: *view,
                projection: ViewProjection::new(view),
            });
            Ok(())
        })
    }

    fn draw_layer(&mut self, layer: LayerKind) -> BoxFuture<'_, Result<(), SurfaceError>> {
        Box::pin(async move { self.start_layer(layer) })
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<SurfaceEvent>> {
        Box::pin(self.events.recv())
    }

    fn expects_content(&self, layer: LayerKind) -> bool {
        let Some(canvas) = self.canvas.as_ref() else {
            return false;
        };
        let bounds = &canvas.view.bounds;
        match layer {
            LayerKind::Base => self.imagery.is_some(),
            LayerKind::Lines => self.overlay.tracks.iter().any(|t| t.touches(bounds)),
            LayerKind::Labels => self
                .overlay
                .places
                .iter()
                .any(|p| bounds.contains(p.position.lat, p.position.lon)),
        }
    }

    fn imagery_zoom(&self, view: &SurfaceView) -> u8 {
        self.imagery
            .as_ref()
            .map_or(view.zoom, |provider| fetch_zoom(view, provider.as_ref()))
    }

    fn capture_layer(&mut self) -> Result<RgbaImage, SurfaceError> {
        let canvas = self.canvas()?;
        let pixmap = canvas.pixmap.lock();
        pixmap_to_rgba(&pixmap)
            .ok_or_else(|| SurfaceError::Unavailable("pixmap size mismatch".to_string()))
    }
}

/// Deepest zoom `provider` serves for `view`.
fn fetch_zoom(view: &SurfaceView, provider: &dyn ImageryProvider) -> u8 {
    view.zoom.min(provider.max_zoom())
}

async fn draw_base(
    pixmap: Arc<Mutex<Pixmap>>,
    view: SurfaceView,
    projection: ViewProjection,
    provider: Arc<dyn ImageryProvider>,
    concurrency: usize,
    events: mpsc::UnboundedSender<SurfaceEvent>,
) {
    let zoom = fetch_zoom(&view, provider.as_ref());
    let range = match tiles_covering(&view.bounds, zoom) {
        Ok(range) => range,
        Err(e) => {
            warn!(error = %e, "Cannot compute imagery tiles for view");
            return;
        }
    };
    let total = range.count();
    let _ = events.send(SurfaceEvent::TileProgress { loaded: 0, total });
    debug!(provider = provider.name(), zoom, tiles = total, "Fetching base imagery");

    let provider = &provider;
    let mut fetches = stream::iter(range.iter())
        .map(|tile| async move { (tile, provider.fetch(tile).await) })
        .buffer_unordered(concurrency);

    let mut loaded = 0;
    while let Some((tile, result)) = fetches.next().await {
        let drawn = result
            .map_err(|e| e.to_string())
            .and_then(|bytes| decode_tile(&bytes))
            .map(|tile_pixmap| {
                pixmap.lock().draw_pixmap(
                    0,
                    0,
                    tile_pixmap.as_ref(),
                    &PixmapPaint {
                        quality: FilterQuality::Bilinear,
                        ..Default::default()
                    },
                    projection.tile_transform(&tile),
                    None,
                );
            });
        if let Err(reason) = drawn {
            let _ = events.send(SurfaceEvent::TileFailed { tile, reason });
        }
        loaded += 1;
        let _ = events.send(SurfaceEvent::TileProgress { loaded, total });
    }
}

fn decode_tile(bytes: &[u8]) -> Result<Pixmap, String> {
    let image = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    rgba_to_pixmap(&image.to_rgba8()).ok_or_else(|| "empty tile image".to_string())
}

fn solid_paint(color: RgbaColor) -> Paint<'static> {
    Paint {
        shader: Shader::SolidColor(Color::from_rgba8(color.r, color.g, color.b, color.a)),
        anti_alias: true,
        ..Default::default()
    }
}

fn draw_tracks(pixmap: &mut Pixmap, view: &SurfaceView, projection: &ViewProjection, overlay: &Overlay) {
    for track in overlay.tracks.iter().filter(|t| t.touches(&view.bounds)) {
        let mut builder = PathBuilder::new();
        for (i, point) in track.points.iter().enumerate() {
            let (x, y) = projection.to_px(point.lat, point.lon);
            if i == 0 {
                builder.move_to(x, y);
            } else {
                builder.line_to(x, y);
            }
        }
        let Some(path) = builder.finish() else {
            continue;
        };
        pixmap.stroke_path(
            &path,
            &solid_paint(track.color),
            &Stroke {
                width: track.width,
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
                ..Default::default()
            },
            Transform::identity(),
            None,
        );
    }
}

fn draw_places(
    pixmap: &mut Pixmap,
    view: &SurfaceView,
    projection: &ViewProjection,
    overlay: &Overlay,
    font: Option<&Font<'static>>,
) {
    let places: Vec<&PlaceLabel> = overlay
        .places
        .iter()
        .filter(|p| view.bounds.contains(p.position.lat, p.position.lon))
        .collect();
    let requests: Vec<LabelRequest> = places
        .iter()
        .map(|p| {
            let (w, h) = measure_text(&p.text, font);
            LabelRequest {
                anchor: projection.to_px(p.position.lat, p.position.lon),
                size: (w + LABEL_PADDING * 2.0, h + LABEL_PADDING * 2.0),
                hint: p.placement,
            }
        })
        .collect();
    let placed = place_labels(&requests, MARKER_RADIUS);

    let outline = Stroke {
        width: 1.5,
        ..Default::default()
    };
    for ((place, request), label) in places.iter().zip(&requests).zip(&placed) {
        let (x, y) = request.anchor;
        if let Some(marker) = PathBuilder::from_circle(x, y, MARKER_RADIUS) {
            pixmap.fill_path(&marker, &solid_paint(place.color), FillRule::Winding, Transform::identity(), None);
            pixmap.stroke_path(&marker, &solid_paint(RgbaColor::WHITE), &outline, Transform::identity(), None);
        }

        let r = label.rect;
        if let Some(plate) = Rect::from_xywh(r.x, r.y, r.width, r.height) {
            let background = RgbaColor { a: 230, ..RgbaColor::WHITE };
            pixmap.fill_rect(plate, &solid_paint(background), Transform::identity(), None);
            let border = PathBuilder::from_rect(plate);
            pixmap.stroke_path(&border, &solid_paint(place.color), &Stroke::default(), Transform::identity(), None);
        }

        if let Some(font) = font {
            if let Some(text) = render_text(&place.text, font, RgbaColor::BLACK) {
                pixmap.draw_pixmap(
                    (r.x + LABEL_PADDING).round() as i32,
                    (r.y + LABEL_PADDING).round() as i32,
                    text.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    None,
                );
            }
        }
    }
}

/// Pixel width and height of `text` at the label size.
fn measure_text(text: &str, font: Option<&Font<'static>>) -> (f32, f32) {
    match font {
        Some(font) => {
            let scale = Scale::uniform(LABEL_FONT_PX);
            let metrics = font.v_metrics(scale);
            let width = font
                .layout(text, scale, point(0.0, metrics.ascent))
                .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
                .fold(0.0f32, f32::max);
            (width.ceil(), (metrics.ascent - metrics.descent).ceil())
        }
        None => (text.chars().count() as f32 * FALLBACK_GLYPH_WIDTH, LABEL_FONT_PX),
    }
}

/// Rasterizes `text` into its own transparent pixmap.
fn render_text(text: &str, font: &Font<'static>, color: RgbaColor) -> Option<Pixmap> {
    let (width, height) = measure_text(text, Some(font));
    let mut pixmap = Pixmap::new(width.max(1.0) as u32, height.max(1.0) as u32)?;
    let scale = Scale::uniform(LABEL_FONT_PX);
    let ascent = font.v_metrics(scale).ascent;
    let (pw, ph) = (pixmap.width() as i32, pixmap.height() as i32);
    let pixels = pixmap.pixels_mut();

    for glyph in font.layout(text, scale, point(0.0, ascent)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let x = bb.min.x + gx as i32;
            let y = bb.min.y + gy as i32;
            if x < 0 || y < 0 || x >= pw || y >= ph {
                return;
            }
            let alpha = (coverage.clamp(0.0, 1.0) * color.a as f32).round() as u8;
            let idx = (y * pw + x) as usize;
            if alpha > pixels[idx].alpha() {
                pixels[idx] = ColorU8::from_rgba(color.r, color.g, color.b, alpha).premultiply();
            }
        });
    }
    Some(pixmap)
}

fn rgba_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> Option<RgbaImage> {
    let data: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p: &PremultipliedColorU8| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GeoBounds;
    use crate::surface::imagery::ImageryError;
    use crate::surface::overlay::{GeoPoint, LabelPlacement, TrackLine};
    use bytes::Bytes;
    use std::io::Cursor;

    fn view() -> SurfaceView {
        SurfaceView {
            bounds: GeoBounds::new(51.6, 51.5, 0.0, -0.1).unwrap(),
            zoom: 10,
            size: PixelDimensions::new(73, 117),
        }
    }

    fn diagonal_overlay() -> Overlay {
        Overlay {
            tracks: vec![TrackLine {
                name: None,
                points: vec![GeoPoint::new(51.59, -0.09), GeoPoint::new(51.51, -0.01)],
                color: RgbaColor::rgb(255, 0, 0),
                width: 4.0,
            }],
            places: vec![PlaceLabel {
                position: GeoPoint::new(51.55, -0.05),
                text: "Camden".to_string(),
                placement: LabelPlacement::Auto,
                color: RgbaColor::rgb(0, 0, 255),
            }],
        }
    }

    fn any_opaque(image: &RgbaImage) -> bool {
        image.pixels().any(|p| p.0[3] > 0)
    }

    struct SolidTiles;

    impl ImageryProvider for SolidTiles {
        fn name(&self) -> &str {
            "solid"
        }

        fn max_zoom(&self) -> u8 {
            9
        }

        fn fetch(&self, tile: TileCoord) -> BoxFuture<'_, Result<Bytes, ImageryError>> {
            Box::pin(async move {
                if tile.col % 2 == 1 {
                    return Err(ImageryError::Http("odd column".to_string()));
                }
                let image = RgbaImage::from_pixel(256, 256, image::Rgba([0, 128, 0, 255]));
                let mut png = Vec::new();
                image
                    .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                    .map_err(|e| ImageryError::Http(e.to_string()))?;
                Ok(Bytes::from(png))
            })
        }
    }

    #[tokio::test]
    async fn test_unconfigured_surface_is_unavailable() {
        let mut surface = SkiaSurface::new(Overlay::default());
        assert_eq!(surface.dimensions(), PixelDimensions::default());
        assert!(surface.read_rows(0, 1).is_err());
        assert!(surface.draw_layer(LayerKind::Lines).await.is_err());
    }

    #[tokio::test]
    async fn test_lines_become_visible_after_drawing_task_runs() {
        let mut surface = SkiaSurface::new(diagonal_overlay());
        surface.configure(&view()).await.unwrap();
        surface.draw_layer(LayerKind::Lines).await.unwrap();

        // Lines layer emits no events; the channel closes once drawing ends.
        assert_eq!(surface.next_event().await, None);

        let image = surface.capture_layer().unwrap();
        assert_eq!(image.dimensions(), (73, 117));
        assert!(any_opaque(&image));
        let rows = surface.read_rows(0, 117).unwrap();
        assert_eq!(rows.len(), 73 * 117 * 4);
    }

    #[tokio::test]
    async fn test_draw_layer_clears_previous_layer() {
        let mut surface = SkiaSurface::new(diagonal_overlay());
        surface.configure(&view()).await.unwrap();
        surface.draw_layer(LayerKind::Lines).await.unwrap();
        while surface.next_event().await.is_some() {}

        surface.draw_layer(LayerKind::Base).await.unwrap();
        // No imagery provider: nothing to load, nothing drawn.
        assert_eq!(
            surface.next_event().await,
            Some(SurfaceEvent::TileProgress { loaded: 0, total: 0 })
        );
        assert_eq!(surface.next_event().await, None);
        assert!(!any_opaque(&surface.capture_layer().unwrap()));
    }

    #[tokio::test]
    async fn test_labels_draw_marker_and_plate() {
        let mut surface = SkiaSurface::new(diagonal_overlay());
        surface.configure(&view()).await.unwrap();
        assert!(surface.expects_content(LayerKind::Labels));

        surface.draw_layer(LayerKind::Labels).await.unwrap();
        while surface.next_event().await.is_some() {}

        let image = surface.capture_layer().unwrap();
        let (x, y) = ViewProjection::new(&view()).to_px(51.55, -0.05);
        let center = image.get_pixel(x as u32, y as u32);
        assert_eq!(center.0, [0, 0, 255, 255]);
    }

    #[tokio::test]
    async fn test_base_layer_reports_progress_and_failures() {
        let mut surface = SkiaSurface::new(Overlay::default()).with_imagery(Arc::new(SolidTiles));
        let mut view = view();
        view.bounds = GeoBounds::new(51.6, 51.4, 0.3, -0.3).unwrap();
        view.size = PixelDimensions::new(440, 240);
        surface.configure(&view).await.unwrap();

        surface.draw_layer(LayerKind::Base).await.unwrap();
        let mut events = Vec::new();
        while let Some(event) = surface.next_event().await {
            events.push(event);
        }

        let expected = tiles_covering(&view.bounds, 9).unwrap().count();
        assert_eq!(events[0], SurfaceEvent::TileProgress { loaded: 0, total: expected });
        assert_eq!(
            events.last(),
            Some(&SurfaceEvent::TileProgress { loaded: expected, total: expected })
        );
        assert!(events.iter().any(|e| matches!(e, SurfaceEvent::TileFailed { .. })));
        assert!(any_opaque(&surface.capture_layer().unwrap()));
    }

    #[test]
    fn test_imagery_zoom_is_capped_by_provider() {
        let mut deep = view();
        deep.zoom = 12;
        assert_eq!(SkiaSurface::new(Overlay::default()).imagery_zoom(&deep), 12);

        let surface = SkiaSurface::new(Overlay::default()).with_imagery(Arc::new(SolidTiles));
        assert_eq!(surface.imagery_zoom(&deep), 9);
        assert_eq!(surface.imagery_zoom(&view()), 9);

        let mut shallow = view();
        shallow.zoom = 7;
        assert_eq!(surface.imagery_zoom(&shallow), 7);
    }

    #[tokio::test]
    async fn test_configure_resets_content() {
        let mut surface = SkiaSurface::new(diagonal_overlay());
        surface.configure(&view()).await.unwrap();
        surface.draw_layer(LayerKind::Lines).await.unwrap();
        while surface.next_event().await.is_some() {}

        surface.configure(&view()).await.unwrap();
        assert!(!any_opaque(&surface.capture_layer().unwrap()));
    }

    #[test]
    fn test_pixmap_roundtrip_keeps_straight_alpha() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([200, 100, 50, 255]));
        image.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));

        let back = pixmap_to_rgba(&rgba_to_pixmap(&image).unwrap()).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_measure_text_without_font() {
        assert_eq!(measure_text("abcd", None), (28.0, LABEL_FONT_PX));
    }
}
