//! Terminal progress reporting for exports.
//!
//! One bar covers the whole export: every sub-region advances it once when
//! rendered and once when stitched into the output.

use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use trackmap::progress::ProgressInfo;
use trackmap::{ExportError, ExportObserver};

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// [`ExportObserver`] that drives an `indicatif` progress bar.
pub struct ProgressBarObserver {
    bar: ProgressBar,
    count: AtomicUsize,
    active: AtomicUsize,
}

impl ProgressBarObserver {
    /// Bar drawn to stderr.
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self::with_bar(bar)
    }

    /// Observer that tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            count: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
        }
    }

    #[cfg(test)]
    fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportObserver for ProgressBarObserver {
    fn on_subdivisions_calculated(&self, count: usize) {
        self.count.store(count, Ordering::Relaxed);
        self.bar.set_length(count as u64 * 2);
        self.bar.set_message(format!("{} sub-regions", count));
    }

    fn on_subdivision_progress(&self, index: usize, total: usize) {
        self.active.store(index, Ordering::Relaxed);
        self.bar.set_position(index as u64);
        self.bar.set_message(format!("rendering {}/{}", index + 1, total));
    }

    fn on_stage_progress(&self, info: &ProgressInfo) {
        let count = self.count.load(Ordering::Relaxed);
        let index = self.active.load(Ordering::Relaxed);
        self.bar.set_message(format!(
            "[{}/{}] {} {}%",
            index + 1,
            count,
            info.stage_label,
            info.percentage
        ));
    }

    fn on_subdivision_stitched(&self, index: usize) {
        let count = self.count.load(Ordering::Relaxed);
        self.bar.set_position((count + index + 1) as u64);
    }

    fn on_complete(&self, bytes: u64, filename: &str) {
        self.bar
            .finish_with_message(format!("wrote {} ({})", filename, format_bytes(bytes)));
    }

    fn on_error(&self, error: &ExportError) {
        self.bar.abandon_with_message(format!("failed: {}", error));
    }
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
