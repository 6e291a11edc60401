//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use trackmap::config::ConfigFile;
use trackmap::coord::GeoBounds;
use trackmap::{ExportQuality, LayerSelection, OutputFormat};

use crate::error::CliError;

/// Export quality selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum QualityArg {
    /// Render at the requested zoom
    Standard,
    /// Render one zoom level deeper (2x resolution)
    High,
    /// Render two zoom levels deeper (4x resolution)
    Ultra,
}

impl From<QualityArg> for ExportQuality {
    fn from(quality: QualityArg) -> Self {
        match quality {
            QualityArg::Standard => ExportQuality::Standard,
            QualityArg::High => ExportQuality::High,
            QualityArg::Ultra => ExportQuality::Ultra,
        }
    }
}

/// Output format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum FormatArg {
    /// Lossless, keeps transparency
    Png,
    /// Lossy, flattened on white when there is no base layer
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

/// Region and sizing arguments shared by `export` and `plan`.
#[derive(Debug, Clone, Args)]
pub struct RegionArgs {
    /// Northern edge in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub north: f64,

    /// Southern edge in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub south: f64,

    /// Eastern edge in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub east: f64,

    /// Western edge in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub west: f64,

    /// Zoom level of the view (0-22)
    #[arg(long, short)]
    pub zoom: u8,

    /// Resolution multiplier (default from config)
    #[arg(long, value_enum)]
    pub quality: Option<QualityArg>,

    /// Largest width/height of one rendered sub-region in pixels (default from config)
    #[arg(long)]
    pub max_dimension: Option<u32>,
}

impl RegionArgs {
    /// Validated geographic bounds.
    pub fn bounds(&self) -> Result<GeoBounds, CliError> {
        Ok(GeoBounds::new(self.north, self.south, self.east, self.west)?)
    }
}

/// Resolve the export quality from CLI args and config.
pub fn resolve_quality(cli: Option<QualityArg>, config: &ConfigFile) -> ExportQuality {
    // CLI takes precedence, then config
    cli.map(ExportQuality::from).unwrap_or(config.export.quality)
}

/// Resolve the output format from CLI args and config.
pub fn resolve_format(cli: Option<FormatArg>, config: &ConfigFile) -> OutputFormat {
    cli.map(OutputFormat::from).unwrap_or(config.output.format)
}

/// Resolve the sub-region size limit from CLI args and config.
pub fn resolve_max_dimension(cli: Option<u32>, config: &ConfigFile) -> Result<u32, CliError> {
    match cli.unwrap_or(config.export.max_dimension) {
        0 => Err(CliError::InvalidArgument(
            "--max-dimension must be at least 1".to_string(),
        )),
        max => Ok(max),
    }
}

/// Resolve the JPEG quality from CLI args and config.
pub fn resolve_jpeg_quality(cli: Option<u8>, config: &ConfigFile) -> u8 {
    cli.unwrap_or(config.output.jpeg_quality)
}

/// Resolve the layer selection; all layers when not given.
pub fn resolve_layers(cli: Option<&str>) -> Result<LayerSelection, CliError> {
    match cli {
        Some(spec) => spec
            .parse()
            .map_err(|e| CliError::InvalidArgument(format!("--layers: {}", e))),
        None => Ok(LayerSelection::all()),
    }
}

/// Resolve the output directory: CLI, then config, then the working directory.
pub fn resolve_output_dir(cli: Option<PathBuf>, config: &ConfigFile) -> PathBuf {
    cli.or_else(|| config.output.directory.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve the imagery URL template; an empty string disables imagery.
pub fn resolve_imagery(cli: Option<String>, config: &ConfigFile) -> Option<String> {
    cli.or_else(|| config.imagery.url_template.clone())
        .filter(|t| !t.trim().is_empty())
}
