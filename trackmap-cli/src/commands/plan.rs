//! `trackmap plan`: show how a region would be split, without rendering.

use clap::Args;
use trackmap::config::ConfigFile;
use trackmap::grid::{plan_grid, GridLayout};
use trackmap::stitch::JPEG_MAX_DIMENSION;
use trackmap::subdivide::subdivide_bounds;
use trackmap::{ExportConfig, ExportError};

use super::common::{resolve_max_dimension, resolve_quality, RegionArgs};
use crate::error::CliError;

/// Arguments for the plan command.
#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub region: RegionArgs,

    /// List every sub-region with its bounds and pixel cell
    #[arg(long, short)]
    pub detailed: bool,
}

/// Run the plan command.
pub fn run(args: PlanArgs, config: &ConfigFile) -> Result<(), CliError> {
    let region = &args.region;
    let export_config = ExportConfig::new(region.bounds()?, region.zoom)
        .with_max_dimension(resolve_max_dimension(region.max_dimension, config)?)
        .with_quality(resolve_quality(region.quality, config));
    export_config.validate()?;

    let layout = plan(&export_config)?;
    print_plan(&export_config, &layout, args.detailed);
    Ok(())
}

/// Subdivides and lays out the region exactly as an export would.
fn plan(config: &ExportConfig) -> Result<GridLayout, CliError> {
    let zoom = config.render_zoom();
    let parts = subdivide_bounds(&config.bounds, zoom, config.max_dimension_px)
        .map_err(ExportError::from)?;
    Ok(plan_grid(&parts, zoom))
}

fn print_plan(config: &ExportConfig, layout: &GridLayout, detailed: bool) {
    println!("Export Plan");
    println!("===========");
    println!();
    println!("  Bounds:        {}", config.bounds);
    println!(
        "  Zoom:          {} (rendered at {}, quality {})",
        config.zoom,
        config.render_zoom(),
        config.quality
    );
    println!("  Max dimension: {} px", config.max_dimension_px);
    println!("  Sub-regions:   {}", layout.len());
    println!("  Grid:          {} rows x {} columns", layout.rows, layout.columns);
    println!("  Output size:   {} px", layout.dimensions);

    let largest = layout.dimensions.width.max(layout.dimensions.height);
    if largest > JPEG_MAX_DIMENSION {
        println!();
        println!(
            "  Note: {} px exceeds the JPEG limit of {} px; use PNG output.",
            largest, JPEG_MAX_DIMENSION
        );
    }

    if detailed {
        println!();
        println!("  {:>5}  {:>3}  {:>3}  {:<44}  cell", "index", "row", "col", "bounds");
        for sub in &layout.ordered {
            println!(
                "  {:>5}  {:>3}  {:>3}  {:<44}  {}x{}+{}+{}",
                sub.index,
                sub.row,
                sub.column,
                sub.bounds.to_string(),
                sub.cell.width,
                sub.cell.height,
                sub.cell.x,
                sub.cell.y
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackmap::coord::GeoBounds;

    #[test]
    fn test_plan_matches_max_dimension() {
        let bounds = GeoBounds::new(52.0, 51.0, 2.0, 0.0).unwrap();
        let config = ExportConfig::new(bounds, 9).with_max_dimension(300);

        let layout = plan(&config).unwrap();

        assert!(layout.len() > 1);
        for sub in &layout.ordered {
            assert!(sub.cell.width <= 301 && sub.cell.height <= 301);
        }
    }

    #[test]
    fn test_small_region_is_one_piece() {
        let bounds = GeoBounds::new(51.6, 51.4, 0.2, 0.0).unwrap();
        let config = ExportConfig::new(bounds, 5);

        let layout = plan(&config).unwrap();

        assert_eq!(layout.len(), 1);
        assert_eq!((layout.rows, layout.columns), (1, 1));
    }
}
