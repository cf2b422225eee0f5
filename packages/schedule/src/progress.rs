//! Progress reporting for schedule generation.
//!
//! Day workers report every slot they finish through [`PlanProgress`]. The
//! CLI renders the events as a progress bar, [`SlotTally`] keeps per-day
//! counts, and [`NullProgress`] ignores them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use patrol_card_incident_models::Weekday;

/// Receives slot events from a generation run.
///
/// Every day worker reports into the same instance from its own thread.
pub trait PlanProgress: Send + Sync {
    /// Called once before any day worker starts.
    fn started(&self, slots: u64);

    /// Called after each slot. `planned` is `false` for a skipped slot.
    fn slot_finished(&self, day: Weekday, hour: u8, planned: bool);

    /// Called once the week has been assembled.
    fn finished(&self, points: usize, skipped: usize);

    /// Called instead of [`PlanProgress::finished`] when the run fails.
    fn aborted(&self);
}

/// A no-op [`PlanProgress`].
pub struct NullProgress;

impl PlanProgress for NullProgress {
    fn started(&self, _slots: u64) {}
    fn slot_finished(&self, _day: Weekday, _hour: u8, _planned: bool) {}
    fn finished(&self, _points: usize, _skipped: usize) {}
    fn aborted(&self) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn PlanProgress> {
    Arc::new(NullProgress)
}

/// Counts planned and skipped slots per day.
#[derive(Debug, Default)]
pub struct SlotTally {
    planned: [AtomicU64; 7],
    skipped: [AtomicU64; 7],
}

impl SlotTally {
    /// Slots of `day` that produced a point so far.
    #[must_use]
    pub fn planned(&self, day: Weekday) -> u64 {
        self.planned[usize::from(day.index())].load(Ordering::Relaxed)
    }

    /// Slots of `day` that were skipped so far.
    #[must_use]
    pub fn skipped(&self, day: Weekday) -> u64 {
        self.skipped[usize::from(day.index())].load(Ordering::Relaxed)
    }

    /// Slots of the whole week reported so far.
    #[must_use]
    pub fn total(&self) -> u64 {
        Weekday::all()
            .iter()
            .map(|&day| self.planned(day) + self.skipped(day))
            .sum()
    }
}

impl PlanProgress for SlotTally {
    fn started(&self, _slots: u64) {}

    fn slot_finished(&self, day: Weekday, _hour: u8, planned: bool) {
        let counts = if planned { &self.planned } else { &self.skipped };
        counts[usize::from(day.index())].fetch_add(1, Ordering::Relaxed);
    }

    fn finished(&self, _points: usize, _skipped: usize) {}

    fn aborted(&self) {}
}
