//! Imagery tile sources for the base layer.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, trace};

use super::BoxFuture;
use crate::config::{DEFAULT_IMAGERY_MAX_ZOOM, DEFAULT_IMAGERY_TIMEOUT_SECS};
use crate::coord::TileCoord;

const DEFAULT_USER_AGENT: &str = concat!("trackmap/", env!("CARGO_PKG_VERSION"));

/// Errors fetching imagery tiles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageryError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Zoom level {requested} beyond provider maximum {max}")]
    ZoomOutOfRange { requested: u8, max: u8 },

    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),
}

/// Trait for asynchronous HTTP GET.
///
/// Abstracts `reqwest` so providers can be tested with canned responses.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request, returning the body.
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes, ImageryError>> + Send;
}

/// HTTP client backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the default 30 second timeout.
    pub fn new() -> Result<Self, ImageryError> {
        Self::with_timeout(DEFAULT_IMAGERY_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ImageryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| ImageryError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Bytes, ImageryError> {
        trace!(url = url, "HTTP GET request starting");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageryError::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ImageryError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ImageryError::Http(format!("Failed to read response: {}", e)))?;
        debug!(url = url, bytes = body.len(), "HTTP response received");
        Ok(body)
    }
}

/// Source of encoded imagery tiles.
///
/// Dyn-compatible so a surface can hold any provider behind an `Arc`.
pub trait ImageryProvider: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Deepest zoom level the source serves.
    fn max_zoom(&self) -> u8;

    /// Fetches one encoded tile (PNG or JPEG).
    fn fetch(&self, tile: TileCoord) -> BoxFuture<'_, Result<Bytes, ImageryError>>;
}

/// Provider for `{z}/{x}/{y}` slippy-map tile servers.
pub struct XyzImageryProvider<C: AsyncHttpClient> {
    client: C,
    template: String,
    max_zoom: u8,
}

impl<C: AsyncHttpClient> XyzImageryProvider<C> {
    /// Creates a provider for `template`, which must contain `{z}`, `{x}`
    /// and `{y}`.
    pub fn new(client: C, template: impl Into<String>) -> Result<Self, ImageryError> {
        let template = template.into();
        if !["{z}", "{x}", "{y}"].iter().all(|p| template.contains(p)) {
            return Err(ImageryError::InvalidTemplate(template));
        }
        Ok(Self {
            client,
            template,
            max_zoom: DEFAULT_IMAGERY_MAX_ZOOM,
        })
    }

    /// Overrides the deepest zoom level requested. Default: 19.
    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    /// URL for one tile.
    pub fn tile_url(&self, tile: &TileCoord) -> String {
        self.template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.col.to_string())
            .replace("{y}", &tile.row.to_string())
    }
}

impl<C: AsyncHttpClient> ImageryProvider for XyzImageryProvider<C> {
    fn name(&self) -> &str {
        "xyz"
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    fn fetch(&self, tile: TileCoord) -> BoxFuture<'_, Result<Bytes, ImageryError>> {
        Box::pin(async move {
            if tile.zoom > self.max_zoom {
                return Err(ImageryError::ZoomOutOfRange {
                    requested: tile.zoom,
                    max: self.max_zoom,
                });
            }
            let url = self.tile_url(&tile);
            self.client.get(&url).await
        })
    }
}
