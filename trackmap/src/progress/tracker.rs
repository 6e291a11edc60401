//! Per-sub-region and export-wide progress trackers.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use super::{percentage, ExportStage, ProgressInfo, ProgressObserver};

/// Progress of one sub-region through the pipeline stages.
pub struct SubdivisionProgress {
    index: usize,
    stage: ExportStage,
    current: u64,
    total: u64,
    /// 1-based position and count shown in the base stage label.
    position: Option<(usize, usize)>,
    observer: Arc<dyn ProgressObserver>,
}

impl SubdivisionProgress {
    pub fn new(index: usize, observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            index,
            stage: ExportStage::default(),
            current: 0,
            total: 0,
            position: None,
            observer,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Enter `stage` with zeroed counters.
    pub fn set_stage(&mut self, stage: ExportStage) {
        self.stage = stage;
        self.position = None;
        self.current = 0;
        self.total = 0;
        self.notify();
    }

    /// Enter `stage` as sub-region `position` of `count` (both 1-based).
    pub fn set_stage_at(&mut self, stage: ExportStage, position: usize, count: usize) {
        self.stage = stage;
        self.position = Some((position, count));
        self.current = 0;
        self.total = 0;
        self.notify();
    }

    pub fn update(&mut self, current: u64, total: u64) {
        self.current = current;
        self.total = total;
        self.notify();
    }

    pub fn increment(&mut self) {
        self.current = self.current.saturating_add(1);
        self.notify();
    }

    /// Current snapshot, recomputed from the counters.
    pub fn info(&self) -> ProgressInfo {
        let stage_label = match (self.stage, self.position) {
            (ExportStage::Base, Some((position, count))) => {
                format!("{} {}/{}", self.stage, position, count)
            }
            _ => self.stage.to_string(),
        };
        ProgressInfo {
            stage: self.stage,
            current: self.current,
            total: self.total,
            percentage: percentage(self.current, self.total),
            stage_label,
        }
    }

    fn notify(&self) {
        let info = self.info();
        let observer = &self.observer;
        let index = self.index;
        if catch_unwind(AssertUnwindSafe(|| observer.on_progress(index, &info))).is_err() {
            warn!(index, stage = %info.stage, "Progress observer panicked; ignoring");
        }
    }
}

/// All sub-region trackers of one export.
pub struct ExportProgress {
    trackers: BTreeMap<usize, SubdivisionProgress>,
    active: Option<usize>,
    observer: Arc<dyn ProgressObserver>,
}

impl ExportProgress {
    pub fn new(observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            trackers: BTreeMap::new(),
            active: None,
            observer,
        }
    }

    /// Tracker for `index`, created on first use.
    pub fn tracker(&mut self, index: usize) -> &mut SubdivisionProgress {
        let observer = &self.observer;
        self.trackers
            .entry(index)
            .or_insert_with(|| SubdivisionProgress::new(index, Arc::clone(observer)))
    }

    /// Mark `index` as the sub-region being worked on and return its tracker.
    pub fn activate(&mut self, index: usize) -> &mut SubdivisionProgress {
        self.active = Some(index);
        self.tracker(index)
    }

    /// Index of the active sub-region, `None` when idle.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn get(&self, index: usize) -> Option<&SubdivisionProgress> {
        self.trackers.get(&index)
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Drop every tracker and go idle.
    pub fn clear(&mut self) {
        self.trackers.clear();
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<(usize, ProgressInfo)>>>, Arc<dyn ProgressObserver>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: Arc<dyn ProgressObserver> =
            Arc::new(move |index: usize, info: &ProgressInfo| sink.lock().push((index, info.clone())));
        (seen, observer)
    }

    #[test]
    fn test_set_stage_resets_counters_and_notifies() {
        let (seen, observer) = recorder();
        let mut tracker = SubdivisionProgress::new(3, observer);

        tracker.update(4, 10);
        tracker.set_stage(ExportStage::Lines);

        let info = tracker.info();
        assert_eq!((info.current, info.total, info.percentage), (0, 0, 0));
        assert_eq!(info.stage_label, "lines");
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|(index, _)| *index == 3));
    }

    #[test]
    fn test_update_and_increment_recompute_percentage() {
        let (seen, observer) = recorder();
        let mut tracker = SubdivisionProgress::new(0, observer);

        tracker.set_stage(ExportStage::Tiles);
        tracker.update(1, 4);
        tracker.increment();

        let seen = seen.lock();
        let percentages: Vec<u8> = seen.iter().map(|(_, i)| i.percentage).collect();
        assert_eq!(percentages, vec![0, 25, 50]);
    }

    #[test]
    fn test_base_label_carries_position() {
        let (_, observer) = recorder();
        let mut tracker = SubdivisionProgress::new(1, observer);

        tracker.set_stage_at(ExportStage::Base, 2, 6);
        assert_eq!(tracker.info().stage_label, "base 2/6");

        tracker.set_stage_at(ExportStage::Lines, 2, 6);
        assert_eq!(tracker.info().stage_label, "lines");

        tracker.set_stage(ExportStage::Base);
        assert_eq!(tracker.info().stage_label, "base");
    }

    #[test]
    fn test_panicking_observer_is_contained() {
        let observer: Arc<dyn ProgressObserver> =
            Arc::new(|_: usize, _: &ProgressInfo| panic!("observer failure"));
        let mut tracker = SubdivisionProgress::new(0, observer);

        tracker.set_stage(ExportStage::Base);
        tracker.update(1, 2);

        assert_eq!(tracker.info().percentage, 50);
    }

    #[test]
    fn test_trackers_are_independent() {
        let (_, observer) = recorder();
        let mut progress = ExportProgress::new(observer);

        progress.tracker(0).update(5, 10);
        progress.tracker(1).update(1, 10);

        assert_eq!(progress.get(0).unwrap().info().current, 5);
        assert_eq!(progress.get(1).unwrap().info().current, 1);
        assert_eq!(progress.len(), 2);
    }

    #[test]
    fn test_activate_and_clear() {
        let (_, observer) = recorder();
        let mut progress = ExportProgress::new(observer);
        assert_eq!(progress.active(), None);

        progress.activate(2).set_stage(ExportStage::Base);
        assert_eq!(progress.active(), Some(2));

        progress.clear();
        assert_eq!(progress.active(), None);
        assert!(progress.is_empty());
    }
}
