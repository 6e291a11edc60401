//! Imagery tile load tracking.

use tokio::time::timeout;
use tracing::{debug, warn};

use super::readiness::RenderSynchronizer;
use crate::coord::{tiles_covering, GeoBounds, TileCoord};
use crate::surface::{RenderSurface, SurfaceEvent};

/// Loaded/total counts for the imagery of one view.
///
/// Starts from an upfront estimate so progress can be shown before the
/// surface reports anything. The total only ever grows: a surface reporting
/// more tiles than estimated raises it, one reporting fewer does not lower it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileLoadTracker {
    loaded: u32,
    total: u32,
    failed: Vec<TileCoord>,
}

impl TileLoadTracker {
    /// Number of imagery tiles covering `bounds` at `zoom`; 0 for bounds
    /// that cannot be tiled.
    pub fn estimate(bounds: &GeoBounds, zoom: u8) -> u32 {
        tiles_covering(bounds, zoom)
            .map(|range| range.count())
            .unwrap_or(0)
    }

    /// Starts tracking at `(0, estimate)`.
    pub fn begin(estimate: u32) -> Self {
        Self {
            loaded: 0,
            total: estimate,
            failed: Vec::new(),
        }
    }

    /// Folds one surface event into the counts.
    pub fn apply(&mut self, event: &SurfaceEvent) {
        match event {
            SurfaceEvent::TileProgress { loaded, total } => {
                self.loaded = self.loaded.max(*loaded);
                self.total = self.total.max(*total).max(self.loaded);
            }
            SurfaceEvent::TileFailed { tile, reason } => {
                warn!(tile = %tile, reason = %reason, "Imagery tile failed to load");
                self.failed.push(*tile);
            }
        }
    }

    pub fn loaded(&self) -> u32 {
        self.loaded
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Tiles that could not be drawn; their area stays transparent.
    pub fn failed(&self) -> &[TileCoord] {
        &self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }
}

/// How a tile wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileWait {
    /// Every expected tile finished.
    Complete { polls: u32 },
    /// The surface stopped sending events before the estimate was reached.
    Drained { polls: u32 },
    /// The poll budget ran out.
    TimedOut { polls: u32 },
}

impl TileWait {
    pub fn timed_out(&self) -> bool {
        matches!(self, TileWait::TimedOut { .. })
    }
}

impl RenderSynchronizer {
    /// Follows tile events from `surface` until the tracker is complete, the
    /// surface has nothing more to report, or the poll budget runs out.
    ///
    /// The budget is `tile_wait_checks + 2 * total` polls, fixed when the
    /// wait starts; each poll waits at most one poll interval for an event.
    /// `on_progress` runs after every event.
    pub async fn wait_for_tiles<S, F>(
        &self,
        surface: &mut S,
        tracker: &mut TileLoadTracker,
        mut on_progress: F,
    ) -> TileWait
    where
        S: RenderSurface + ?Sized,
        F: FnMut(&TileLoadTracker),
    {
        let config = self.config();
        let budget = config
            .tile_wait_checks()
            .saturating_add(tracker.total().saturating_mul(2));

        for poll in 0..budget {
            if tracker.is_complete() {
                return TileWait::Complete { polls: poll };
            }
            match timeout(config.poll_interval(), surface.next_event()).await {
                Ok(Some(event)) => {
                    tracker.apply(&event);
                    on_progress(tracker);
                }
                Ok(None) => {
                    debug!(
                        loaded = tracker.loaded(),
                        total = tracker.total(),
                        "Surface finished reporting tiles"
                    );
                    return if tracker.is_complete() {
                        TileWait::Complete { polls: poll + 1 }
                    } else {
                        TileWait::Drained { polls: poll + 1 }
                    };
                }
                Err(_) => {}
            }
        }

        if tracker.is_complete() {
            TileWait::Complete { polls: budget }
        } else {
            warn!(
                loaded = tracker.loaded(),
                total = tracker.total(),
                polls = budget,
                "Gave up waiting for imagery tiles"
            );
            TileWait::TimedOut { polls: budget }
        }
    }
}
