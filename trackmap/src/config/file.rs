//! Configuration file handling for `~/.trackmap/config.ini`.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::defaults::{
    DEFAULT_IMAGERY_TIMEOUT_SECS, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION_PX,
    DEFAULT_SPILL_THRESHOLD_MB,
};
use super::render_wait::RenderWaitConfig;
use crate::export::{ExportQuality, OutputFormat};
use crate::stitch::StoreKind;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[export]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub max_dimension: u32,
    pub quality: ExportQuality,
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub jpeg_quality: u8,
    /// Where exported files are written; the working directory when unset.
    pub directory: Option<PathBuf>,
}

/// `[imagery]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagerySettings {
    /// XYZ template such as `https://tile.example.org/{z}/{x}/{y}.png`.
    /// No base imagery is drawn when unset.
    pub url_template: Option<String>,
    pub timeout_secs: u64,
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Keep composited tiles in temporary files from the first tile.
    pub spill_to_disk: bool,
    /// Encoded tiles held in memory before moving them to disk.
    pub spill_threshold_mb: u64,
}

impl StoreSettings {
    pub fn kind(&self) -> StoreKind {
        if self.spill_to_disk {
            StoreKind::Disk
        } else {
            StoreKind::spill_above_mb(self.spill_threshold_mb)
        }
    }
}

/// Whole user configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub export: ExportSettings,
    pub output: OutputSettings,
    pub render: RenderWaitConfig,
    pub imagery: ImagerySettings,
    pub store: StoreSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            export: ExportSettings {
                max_dimension: DEFAULT_MAX_DIMENSION_PX,
                quality: ExportQuality::default(),
            },
            output: OutputSettings {
                format: OutputFormat::default(),
                jpeg_quality: DEFAULT_JPEG_QUALITY,
                directory: None,
            },
            render: RenderWaitConfig::default(),
            imagery: ImagerySettings {
                url_template: None,
                timeout_secs: DEFAULT_IMAGERY_TIMEOUT_SECS,
            },
            store: StoreSettings {
                spill_to_disk: false,
                spill_threshold_mb: DEFAULT_SPILL_THRESHOLD_MB,
            },
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path (`~/.trackmap/config.ini`).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_config_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Commented INI representation, as written by [`ConfigFile::save_to`].
    pub fn to_config_string(&self) -> String {
        let directory = self
            .output
            .directory
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let url_template = self.imagery.url_template.as_deref().unwrap_or("");

        format!(
            r#"[export]
; Largest width/height in pixels of one rendered sub-region
max_dimension = {}
; Resolution multiplier: standard, high (2x), ultra (4x)
quality = {}

[output]
; Output format: png or jpeg
format = {}
; JPEG quality (1-100), ignored for png
jpeg_quality = {}
; Directory for exported files (empty = current directory)
directory = {}

[render]
poll_interval_ms = {}
max_checks = {}
settle_delay_ms = {}
slice_height = {}
stride = {}
tile_wait_checks = {}

[imagery]
; XYZ tile URL with {{z}}, {{x}} and {{y}} placeholders (empty = no base imagery)
url_template = {}
timeout_secs = {}

[store]
; Keep composited tiles in temporary files from the first tile
spill_to_disk = {}
; Otherwise move them to disk once they exceed this many MB
spill_threshold_mb = {}
"#,
            self.export.max_dimension,
            self.export.quality,
            self.output.format,
            self.output.jpeg_quality,
            directory,
            self.render.poll_interval().as_millis(),
            self.render.max_checks(),
            self.render.settle_delay().as_millis(),
            self.render.target_slice_height(),
            self.render.stride(),
            self.render.tile_wait_checks(),
            url_template,
            self.imagery.timeout_secs,
            self.store.spill_to_disk,
            self.store.spill_threshold_mb,
        )
    }
}

/// Get the path to the config directory (`~/.trackmap`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".trackmap")
}

/// Get the path to the config file (`~/.trackmap/config.ini`).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
