//! Export event observer.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::ExportError;
use crate::progress::{ProgressInfo, ProgressObserver};

/// Receives export events. Every method defaults to doing nothing.
///
/// Calls are made synchronously from the export task. A panicking observer
/// is logged and otherwise ignored. Exactly one of
/// [`ExportObserver::on_complete`] and [`ExportObserver::on_error`] is
/// called, once, at the end of an export.
pub trait ExportObserver: Send + Sync {
    /// The region was split into `count` sub-regions.
    fn on_subdivisions_calculated(&self, _count: usize) {}

    /// Rendering of sub-region `index` (row-major) of `total` started.
    fn on_subdivision_progress(&self, _index: usize, _total: usize) {}

    /// Stage progress of the active sub-region.
    fn on_stage_progress(&self, _info: &ProgressInfo) {}

    /// Sub-region `index` has been written to the output.
    fn on_subdivision_stitched(&self, _index: usize) {}

    /// The export finished; `bytes` were written for `filename`.
    fn on_complete(&self, _bytes: u64, _filename: &str) {}

    /// The export failed.
    fn on_error(&self, _error: &ExportError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ExportObserver for NoopObserver {}

/// Wraps an observer for one export run: contains panics and lets only
/// the first terminal event through.
pub(crate) struct ObserverHandle {
    inner: Arc<dyn ExportObserver>,
    finished: AtomicBool,
}

impl ObserverHandle {
    pub(crate) fn new(inner: Arc<dyn ExportObserver>) -> Self {
        Self {
            inner,
            finished: AtomicBool::new(false),
        }
    }

    pub(crate) fn subdivisions_calculated(&self, count: usize) {
        self.guarded("on_subdivisions_calculated", |o| o.on_subdivisions_calculated(count));
    }

    pub(crate) fn subdivision_progress(&self, index: usize, total: usize) {
        self.guarded("on_subdivision_progress", |o| o.on_subdivision_progress(index, total));
    }

    pub(crate) fn subdivision_stitched(&self, index: usize) {
        self.guarded("on_subdivision_stitched", |o| o.on_subdivision_stitched(index));
    }

    /// Reports success unless a terminal event was already sent.
    pub(crate) fn complete(&self, bytes: u64, filename: &str) {
        if self.finish() {
            self.guarded("on_complete", |o| o.on_complete(bytes, filename));
        }
    }

    /// Reports failure unless a terminal event was already sent.
    pub(crate) fn fail(&self, error: &ExportError) {
        if self.finish() {
            self.guarded("on_error", |o| o.on_error(error));
        }
    }

    /// Forwarder for stage progress.
    pub(crate) fn stage_forwarder(&self) -> Arc<dyn ProgressObserver> {
        Arc::new(StageForwarder(Arc::clone(&self.inner)))
    }

    /// True for the first caller only.
    fn finish(&self) -> bool {
        !self.finished.swap(true, Ordering::SeqCst)
    }

    fn guarded(&self, event: &'static str, call: impl FnOnce(&dyn ExportObserver)) {
        let inner = self.inner.as_ref();
        if catch_unwind(AssertUnwindSafe(|| call(inner))).is_err() {
            warn!(event, "Export observer panicked; ignoring");
        }
    }
}

/// Hands sub-region stage snapshots to the export observer.
struct StageForwarder(Arc<dyn ExportObserver>);

impl ProgressObserver for StageForwarder {
    fn on_progress(&self, _index: usize, info: &ProgressInfo) {
        self.0.on_stage_progress(info);
    }
}
