//! Staggered slice sampling for drawn content.

use tracing::{debug, warn};

use crate::config::{RenderWaitConfig, MIN_SLICES};
use crate::surface::PixelProbe;

/// How a readiness wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Content was seen after `checks` samples.
    Drawn { checks: u32 },
    /// No content seen within the check budget.
    TimedOut { checks: u32 },
    /// Reading pixels failed; the surface is treated as ready.
    ReadFailed { checks: u32, error: String },
}

impl Readiness {
    pub fn checks(&self) -> u32 {
        match self {
            Readiness::Drawn { checks }
            | Readiness::TimedOut { checks }
            | Readiness::ReadFailed { checks, .. } => *checks,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, Readiness::TimedOut { .. })
    }
}

/// Division of a surface into horizontal slices visited with a fixed stride.
///
/// Consecutive checks land far apart on the surface, so content confined
/// to a narrow band is found quickly wherever it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlicePlan {
    height: u32,
    slices: u32,
    stride: u32,
}

impl SlicePlan {
    /// Plans `max(10, height / target_slice_height)` slices, or one slice per
    /// row on surfaces shorter than ten rows.
    ///
    /// The stride is advanced to the next value coprime with the slice
    /// count, so every slice is visited before any repeats.
    pub fn new(height: u32, target_slice_height: u32, stride: u32) -> Self {
        let slices = (height / target_slice_height.max(1))
            .max(MIN_SLICES)
            .min(height)
            .max(1);
        let mut stride = stride.max(1);
        while gcd(stride, slices) != 1 {
            stride += 1;
        }
        Self {
            height,
            slices,
            stride,
        }
    }

    pub fn slices(&self) -> u32 {
        self.slices
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Slice index sampled by the `check`-th check (0-based).
    pub fn slice_for_check(&self, check: u32) -> u32 {
        ((check as u64 * self.stride as u64) % self.slices as u64) as u32
    }

    /// First row and row count of slice `index`.
    pub fn rows(&self, index: u32) -> (u32, u32) {
        let start = (index as u64 * self.height as u64 / self.slices as u64) as u32;
        let end = ((index as u64 + 1) * self.height as u64 / self.slices as u64) as u32;
        (start, end - start)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Detects completion of asynchronous drawing by polling pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderSynchronizer {
    config: RenderWaitConfig,
}

impl RenderSynchronizer {
    pub fn new(config: RenderWaitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderWaitConfig {
        &self.config
    }

    /// Waits until any slice of `probe` contains a non-transparent pixel.
    ///
    /// Each check sleeps one poll interval, then samples one slice. On the
    /// first hit it sleeps the settle delay so partially drawn content can
    /// finish. Never fails: a read error ends the wait as ready.
    pub async fn wait_until_drawn<P: PixelProbe + ?Sized>(&self, probe: &P) -> Readiness {
        let height = probe.dimensions().height;
        if height == 0 {
            return Readiness::Drawn { checks: 0 };
        }
        let plan = SlicePlan::new(height, self.config.target_slice_height(), self.config.stride());

        for check in 0..self.config.max_checks() {
            tokio::time::sleep(self.config.poll_interval()).await;

            let (y, rows) = plan.rows(plan.slice_for_check(check));
            match probe.read_rows(y, rows) {
                Ok(pixels) => {
                    if pixels.chunks_exact(4).any(|px| px[3] != 0) {
                        debug!(checks = check + 1, y, "Content detected");
                        tokio::time::sleep(self.config.settle_delay()).await;
                        return Readiness::Drawn { checks: check + 1 };
                    }
                }
                Err(e) => {
                    warn!(error = %e, y, "Pixel read failed; treating surface as ready");
                    return Readiness::ReadFailed {
                        checks: check + 1,
                        error: e.to_string(),
                    };
                }
            }
        }

        debug!(checks = self.config.max_checks(), "No content detected before check limit");
        Readiness::TimedOut {
            checks: self.config.max_checks(),
        }
    }
}
