//! `trackmap export`: render a region to a single PNG or JPEG.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use tempfile::NamedTempFile;
use tracing::info;
use trackmap::config::ConfigFile;
use trackmap::surface::imagery::ReqwestClient;
use trackmap::surface::{Overlay, SkiaSurface, XyzImageryProvider};
use trackmap::{ExportConfig, ExportEngine, ExportObserver, ExportReport};

use super::common::{
    resolve_format, resolve_imagery, resolve_jpeg_quality, resolve_layers, resolve_max_dimension,
    resolve_output_dir, resolve_quality, FormatArg, RegionArgs,
};
use crate::error::CliError;
use crate::progress::{format_bytes, ProgressBarObserver};

/// Arguments for the export command.
#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub region: RegionArgs,

    /// Layers to include: "all" or a comma list of base, lines, labels
    #[arg(long)]
    pub layers: Option<String>,

    /// Output format (default from config)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// JPEG quality 1-100 (default from config)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// JSON file with track lines and place labels
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// TTF/OTF font for label text
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// XYZ imagery URL template with {z}, {x}, {y} (default from config)
    #[arg(long)]
    pub imagery: Option<String>,

    /// Directory for the exported file (default from config, then current directory)
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,

    /// Keep composited tiles in temporary files from the first tile
    #[arg(long)]
    pub spill_to_disk: bool,

    /// Do not draw a progress bar
    #[arg(long, short)]
    pub quiet: bool,
}

/// Run the export command.
pub fn run(args: ExportArgs, config: &ConfigFile) -> Result<(), CliError> {
    let export_config = build_export_config(&args, config)?;
    let surface = build_surface(&args, config)?;
    let output_dir = resolve_output_dir(args.output_dir.clone(), config);

    let mut store = config.store.clone();
    store.spill_to_disk |= args.spill_to_disk;
    let mut engine = ExportEngine::new(surface)
        .with_render_wait(config.render)
        .with_store(store.kind());

    let observer: Arc<dyn ExportObserver> = if args.quiet {
        Arc::new(ProgressBarObserver::hidden())
    } else {
        Arc::new(ProgressBarObserver::new())
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let (report, path) = runtime.block_on(async {
        write_export(&mut engine, &export_config, observer, &output_dir).await
    })?;

    print_report(&report, &path);
    Ok(())
}

/// Assembles the export configuration from flags over config file values.
fn build_export_config(args: &ExportArgs, config: &ConfigFile) -> Result<ExportConfig, CliError> {
    let region = &args.region;
    let export_config = ExportConfig::new(region.bounds()?, region.zoom)
        .with_max_dimension(resolve_max_dimension(region.max_dimension, config)?)
        .with_quality(resolve_quality(region.quality, config))
        .with_format(resolve_format(args.format, config))
        .with_jpeg_quality(resolve_jpeg_quality(args.jpeg_quality, config))
        .with_layers(resolve_layers(args.layers.as_deref())?);
    export_config.validate()?;
    Ok(export_config)
}

/// Builds the rendering surface with optional overlay, imagery and font.
fn build_surface(args: &ExportArgs, config: &ConfigFile) -> Result<SkiaSurface, CliError> {
    let overlay = match &args.overlay {
        Some(path) => Overlay::load(path)?,
        None => Overlay::default(),
    };
    let mut surface = SkiaSurface::new(overlay);

    if let Some(template) = resolve_imagery(args.imagery.clone(), config) {
        let client = ReqwestClient::with_timeout(config.imagery.timeout_secs)?;
        let provider = XyzImageryProvider::new(client, template)?;
        surface = surface.with_imagery(Arc::new(provider));
    }
    if let Some(font) = &args.font {
        surface = surface.with_font_file(font)?;
    }
    Ok(surface)
}

/// Exports into a temporary file next to the destination, then moves it
/// into place under the generated name. Failed exports leave nothing behind.
async fn write_export(
    engine: &mut ExportEngine<SkiaSurface>,
    config: &ExportConfig,
    observer: Arc<dyn ExportObserver>,
    output_dir: &Path,
) -> Result<(ExportReport, PathBuf), CliError> {
    fs::create_dir_all(output_dir).map_err(|error| CliError::FileWrite {
        path: output_dir.display().to_string(),
        error,
    })?;
    let mut temp = NamedTempFile::new_in(output_dir).map_err(|error| CliError::FileWrite {
        path: output_dir.display().to_string(),
        error,
    })?;

    let report = engine
        .export(config, observer, BufWriter::new(temp.as_file_mut()))
        .await?;

    let path = output_dir.join(&report.filename);
    temp.persist(&path).map_err(|e| CliError::FileWrite {
        path: path.display().to_string(),
        error: e.error,
    })?;
    info!(path = %path.display(), "Saved export");
    Ok((report, path))
}

fn print_report(report: &ExportReport, path: &Path) {
    println!();
    println!("Saved: {}", path.display());
    println!("  Size:          {}", format_bytes(report.bytes));
    println!("  Dimensions:    {} px", report.dimensions);
    println!("  Render zoom:   {}", report.zoom);
    println!(
        "  Sub-regions:   {} ({} rows x {} columns)",
        report.subdivisions, report.rows, report.columns
    );

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }
}
