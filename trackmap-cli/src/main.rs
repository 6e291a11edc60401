//! Trackmap CLI - Command-line interface
//!
//! Exports geographic regions with track overlays as one large PNG or JPEG.

mod commands;
mod error;
mod progress;

use clap::{Parser, Subcommand};
use tracing::info;
use trackmap::config::ConfigFile;
use trackmap::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};

use commands::config::ConfigCommands;
use commands::export::ExportArgs;
use commands::plan::PlanArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "trackmap")]
#[command(version, about = "Export large track maps as a single image", long_about = None)]
struct Cli {
    /// Also write log output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a region to a PNG or JPEG file
    Export(ExportArgs),

    /// Show how a region would be subdivided, without rendering
    Plan(PlanArgs),

    /// View or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Export(args) => {
            let config = ConfigFile::load()?;
            let _guard = start_logging(cli.verbose)?;
            info!("Trackmap v{}: export command", env!("CARGO_PKG_VERSION"));
            commands::export::run(args, &config)
        }
        Commands::Plan(args) => {
            let config = ConfigFile::load()?;
            commands::plan::run(args, &config)
        }
        Commands::Config(command) => commands::config::run(command),
    }
}

fn start_logging(console: bool) -> Result<LoggingGuard, CliError> {
    init_logging(&default_log_dir(), default_log_file(), console)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}
