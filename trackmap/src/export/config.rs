//! Export parameters.

use std::fmt;
use std::str::FromStr;

use super::ExportError;
use crate::config::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION_PX};
use crate::coord::{GeoBounds, MAX_ZOOM};
use crate::surface::LayerKind;

/// Render detail relative to the requested zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportQuality {
    #[default]
    Standard,
    High,
    Ultra,
}

impl ExportQuality {
    /// Zoom levels added to the requested zoom before projection.
    pub fn zoom_offset(&self) -> u8 {
        match self {
            ExportQuality::Standard => 0,
            ExportQuality::High => 1,
            ExportQuality::Ultra => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportQuality::Standard => "standard",
            ExportQuality::High => "high",
            ExportQuality::Ultra => "ultra",
        }
    }
}

impl fmt::Display for ExportQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(ExportQuality::Standard),
            "high" => Ok(ExportQuality::High),
            "ultra" => Ok(ExportQuality::Ultra),
            other => Err(format!(
                "unknown quality '{}' (expected standard, high or ultra)",
                other
            )),
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// Lossless with alpha.
    #[default]
    Png,
    /// Lossy, no alpha.
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// True for formats that cannot carry transparency.
    pub fn is_lossy(&self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(format!("unknown format '{}' (expected png or jpeg)", other)),
        }
    }
}

/// Which layers go into the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerSelection {
    pub base: bool,
    pub lines: bool,
    pub labels: bool,
}

impl Default for LayerSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl LayerSelection {
    pub fn new(base: bool, lines: bool, labels: bool) -> Self {
        Self { base, lines, labels }
    }

    pub fn all() -> Self {
        Self::new(true, true, true)
    }

    pub fn includes(&self, layer: LayerKind) -> bool {
        match layer {
            LayerKind::Base => self.base,
            LayerKind::Lines => self.lines,
            LayerKind::Labels => self.labels,
        }
    }

    /// Selected layers in composite order.
    pub fn selected(&self) -> Vec<LayerKind> {
        LayerKind::ALL
            .into_iter()
            .filter(|layer| self.includes(*layer))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        !(self.base || self.lines || self.labels)
    }

    /// Name used in export file names: `all`, or the selected layers
    /// joined by `-`.
    pub fn name(&self) -> String {
        if self.base && self.lines && self.labels {
            return "all".to_string();
        }
        let names: Vec<&str> = self.selected().iter().map(|l| l.name()).collect();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join("-")
        }
    }
}

impl fmt::Display for LayerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for LayerSelection {
    type Err = String;

    /// Parses `all` or a comma-separated list of `base`, `lines`, `labels`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        let mut selection = Self::new(false, false, false);
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "base" => selection.base = true,
                "lines" => selection.lines = true,
                "labels" => selection.labels = true,
                other => return Err(format!("unknown layer '{}'", other)),
            }
        }
        if selection.is_empty() {
            return Err("at least one layer must be selected".to_string());
        }
        Ok(selection)
    }
}

/// Everything needed to run one export. Immutable for the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub bounds: GeoBounds,
    pub zoom: u8,
    pub max_dimension_px: u32,
    pub quality: ExportQuality,
    pub output_format: OutputFormat,
    /// 1..=100, used for lossy formats only.
    pub jpeg_quality: u8,
    pub layers: LayerSelection,
}

impl ExportConfig {
    /// Export of `bounds` at `zoom` with default settings.
    pub fn new(bounds: GeoBounds, zoom: u8) -> Self {
        Self {
            bounds,
            zoom,
            max_dimension_px: DEFAULT_MAX_DIMENSION_PX,
            quality: ExportQuality::default(),
            output_format: OutputFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            layers: LayerSelection::all(),
        }
    }

    pub fn with_max_dimension(mut self, px: u32) -> Self {
        self.max_dimension_px = px;
        self
    }

    pub fn with_quality(mut self, quality: ExportQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_layers(mut self, layers: LayerSelection) -> Self {
        self.layers = layers;
        self
    }

    /// Zoom the export is rendered at: the requested zoom plus the quality
    /// offset, capped at the highest supported zoom.
    pub fn render_zoom(&self) -> u8 {
        self.zoom.saturating_add(self.quality.zoom_offset()).min(MAX_ZOOM)
    }

    /// Checks the settings the subdivider does not.
    ///
    /// Bounds and the maximum dimension are validated by subdivision.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.zoom > MAX_ZOOM {
            return Err(ExportError::InvalidConfig(format!(
                "zoom {} is above the maximum of {}",
                self.zoom, MAX_ZOOM
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ExportError::InvalidConfig(format!(
                "JPEG quality {} is outside 1-100",
                self.jpeg_quality
            )));
        }
        if self.layers.is_empty() {
            return Err(ExportError::InvalidConfig(
                "no layers selected".to_string(),
            ));
        }
        Ok(())
    }
}
