//! Default values for every configurable setting.

use std::time::Duration;

// =============================================================================
// Export
// =============================================================================

/// Largest width or height, in pixels, of one rendered sub-region.
pub const DEFAULT_MAX_DIMENSION_PX: u32 = 4096;

/// JPEG quality used when none is given (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

// =============================================================================
// Render readiness
// =============================================================================

/// Delay between two readiness checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Checks before a layer is declared ready regardless of content.
pub const DEFAULT_MAX_CHECKS: u32 = 50;

/// Extra wait after content is first seen, letting partial draws finish.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Desired height of one sampled slice; the slice count never drops below
/// [`MIN_SLICES`].
pub const DEFAULT_SLICE_HEIGHT: u32 = 100;

/// Minimum number of slices a surface is cut into for sampling.
pub const MIN_SLICES: u32 = 10;

/// Stride between successively sampled slices.
pub const DEFAULT_STRIDE: u32 = 7;

/// Poll budget for imagery tiles, on top of two polls per expected tile.
pub const DEFAULT_TILE_WAIT_CHECKS: u32 = 300;

// =============================================================================
// Imagery
// =============================================================================

/// Request timeout for one imagery tile.
pub const DEFAULT_IMAGERY_TIMEOUT_SECS: u64 = 30;

/// Zoom limit assumed for XYZ sources that do not advertise one.
pub const DEFAULT_IMAGERY_MAX_ZOOM: u8 = 19;

// =============================================================================
// Tile store
// =============================================================================

/// Encoded tiles kept in memory before the store moves them to disk.
pub const DEFAULT_SPILL_THRESHOLD_MB: u64 = 512;
