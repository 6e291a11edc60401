//! Export failures and non-fatal degradations.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::coord::TileCoord;
use crate::stitch::{StitchError, StoreError};
use crate::subdivide::SubdivisionError;
use crate::surface::LayerKind;

/// Fatal export errors. Any output written before the error is incomplete
/// and must be discarded.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Rejected before any work started.
    #[error("Invalid export configuration: {0}")]
    InvalidConfig(String),

    /// The region could not be partitioned.
    #[error("Failed to compute subdivisions: {0}")]
    SubdivisionCompute(#[from] SubdivisionError),

    /// The surface or compositing failed for one sub-region.
    #[error("Composition failed for sub-region {index}: {reason}")]
    Composition { index: usize, reason: String },

    /// Composited tiles could not be kept for stitching.
    #[error("Tile store failed: {0}")]
    TileStore(#[from] StoreError),

    /// Stitching or encoding the final image failed.
    #[error("Encoding failed: {0}")]
    Encoding(#[from] StitchError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExportError {
    pub(crate) fn composition(index: usize, reason: impl fmt::Display) -> Self {
        ExportError::Composition {
            index,
            reason: reason.to_string(),
        }
    }
}

/// Degradations that still produce an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    /// A layer showed no content within the readiness budget and was
    /// captured as is.
    RenderTimeout {
        index: usize,
        layer: LayerKind,
        checks: u32,
    },
    /// Imagery tiles failed or never arrived; their area stays transparent.
    TileLoad {
        index: usize,
        failed: Vec<TileCoord>,
        loaded: u32,
        total: u32,
    },
}

impl ExportWarning {
    /// Sub-region the warning belongs to.
    pub fn index(&self) -> usize {
        match self {
            ExportWarning::RenderTimeout { index, .. } | ExportWarning::TileLoad { index, .. } => {
                *index
            }
        }
    }
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportWarning::RenderTimeout { index, layer, checks } => write!(
                f,
                "sub-region {}: {} layer showed no content after {} checks",
                index, layer, checks
            ),
            ExportWarning::TileLoad {
                index,
                failed,
                loaded,
                total,
            } => write!(
                f,
                "sub-region {}: {}/{} imagery tiles loaded, {} failed",
                index,
                loaded,
                total,
                failed.len()
            ),
        }
    }
}
