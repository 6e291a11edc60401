//! Configuration for Trackmap.
//!
//! - [`RenderWaitConfig`] groups the render readiness timing knobs.
//! - [`ConfigFile`] is the user's `~/.trackmap/config.ini`, loaded over
//!   defaults from [`defaults`].

pub mod defaults;
mod file;
mod parser;
mod render_wait;

pub use defaults::*;
pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, ExportSettings,
    ImagerySettings, OutputSettings, StoreSettings,
};
pub use render_wait::RenderWaitConfig;
