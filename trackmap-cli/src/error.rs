//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use trackmap::config::ConfigFileError;
use trackmap::coord::CoordError;
use trackmap::surface::{ImageryError, OverlayError, SurfaceError};
use trackmap::ExportError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Failed to load the overlay file
    Overlay(OverlayError),
    /// Failed to set up the rendering surface or imagery source
    Surface(String),
    /// The export itself failed
    Export(ExportError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// 2 for bad input, 3 for configuration, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) | CliError::Overlay(_) => 2,
            CliError::Export(ExportError::InvalidConfig(_)) => 2,
            CliError::Config(_) => 3,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Export(ExportError::Encoding(_)) => {
                eprintln!();
                eprintln!("The mosaic could not be encoded. Common causes:");
                eprintln!("  1. JPEG is limited to 65535 pixels per side: try --format png");
                eprintln!("  2. Lower --zoom or --quality to shrink the output");
            }
            CliError::Surface(_) => {
                eprintln!();
                eprintln!("Check the [imagery] section of the configuration:");
                eprintln!("  url_template must contain {{z}}, {{x}} and {{y}}");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Overlay(e) => write!(f, "Failed to load overlay: {}", e),
            CliError::Surface(msg) => write!(f, "Failed to prepare rendering: {}", msg),
            CliError::Export(e) => write!(f, "Export failed: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Overlay(e) => Some(e),
            CliError::Export(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::InvalidArgument(e.to_string())
    }
}

impl From<OverlayError> for CliError {
    fn from(e: OverlayError) -> Self {
        CliError::Overlay(e)
    }
}

impl From<ImageryError> for CliError {
    fn from(e: ImageryError) -> Self {
        CliError::Surface(e.to_string())
    }
}

impl From<SurfaceError> for CliError {
    fn from(e: SurfaceError) -> Self {
        CliError::Surface(e.to_string())
    }
}

impl From<ExportError> for CliError {
    fn from(e: ExportError) -> Self {
        CliError::Export(e)
    }
}
