//! Export file naming.

use chrono::{DateTime, Utc};

use super::{LayerSelection, OutputFormat};

/// Prefix of every exported file.
pub const FILE_PREFIX: &str = "trackmap-map";

/// `trackmap-map-<selection>-<YYYYMMDD-HHMMSS>.<ext>`, timestamp in UTC.
pub fn export_filename(
    selection: &LayerSelection,
    format: OutputFormat,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{}-{}-{}.{}",
        FILE_PREFIX,
        selection.name(),
        at.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}
