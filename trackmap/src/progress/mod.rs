//! Export progress reporting.
//!
//! Every sub-region gets its own [`SubdivisionProgress`]; [`ExportProgress`]
//! owns them and remembers which one is active. Each mutation recomputes a
//! whole [`ProgressInfo`] and hands it to the injected [`ProgressObserver`].

mod tracker;

use std::fmt;

pub use tracker::{ExportProgress, SubdivisionProgress};

/// Pipeline stage of one sub-region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportStage {
    #[default]
    Base,
    Tiles,
    Lines,
    Labels,
    Stitching,
}

impl ExportStage {
    pub fn name(&self) -> &'static str {
        match self {
            ExportStage::Base => "base",
            ExportStage::Tiles => "tiles",
            ExportStage::Lines => "lines",
            ExportStage::Labels => "labels",
            ExportStage::Stitching => "stitching",
        }
    }
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of one tracker after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressInfo {
    pub stage: ExportStage,
    pub current: u64,
    pub total: u64,
    /// `round(current / total * 100)`, 0 when `total` is 0, at most 100.
    pub percentage: u8,
    pub stage_label: String,
}

/// Rounded percentage of `current` over `total`.
///
/// Returns 0 when `total` is 0. Values past `total` are capped at 100.
pub fn percentage(current: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (current as f64 / total as f64 * 100.0).round();
    pct.min(100.0) as u8
}

/// Receives progress snapshots.
///
/// Implemented for any `Fn(usize, &ProgressInfo)` closure, where the first
/// argument is the sub-region index.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, index: usize, info: &ProgressInfo);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, &ProgressInfo) + Send + Sync,
{
    fn on_progress(&self, index: usize, info: &ProgressInfo) {
        self(index, info)
    }
}
