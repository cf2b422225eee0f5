//! Merges the day plans into one validated [`PatrolSchedule`].

use chrono::{Duration, Timelike as _};
use patrol_card_incident_models::{PATROL_DURATION_MINUTES, PatrolSchedule, SLOTS_PER_WEEK};

use crate::generator::{DayPlan, SkippedSlot, SlotOutcome};

/// A schedule that breaks one of the structural rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid schedule: {message}")]
pub struct InvalidScheduleError {
    /// Which rule was broken.
    pub message: String,
}

/// Splits the day plans into planned points and skipped slots and builds
/// the ordered schedule.
///
/// # Errors
///
/// Returns [`InvalidScheduleError`] if the result has more than
/// [`SLOTS_PER_WEEK`] points or a point has the wrong duration.
pub fn assemble(
    plans: Vec<DayPlan>,
) -> Result<(PatrolSchedule, Vec<SkippedSlot>), InvalidScheduleError> {
    let mut points = Vec::new();
    let mut skipped = Vec::new();

    for plan in plans {
        for outcome in plan.outcomes {
            match outcome {
                SlotOutcome::Planned(point) => points.push(point),
                SlotOutcome::Skipped(slot) => skipped.push(slot),
            }
        }
    }
    skipped.sort_by_key(|slot| (slot.day, slot.hour));

    let schedule = PatrolSchedule::from_unsorted(points);
    validate(&schedule)?;

    Ok((schedule, skipped))
}

/// Checks the structural invariants of a schedule.
///
/// # Errors
///
/// Returns [`InvalidScheduleError`] describing the first broken rule.
pub fn validate(schedule: &PatrolSchedule) -> Result<(), InvalidScheduleError> {
    if schedule.len() > SLOTS_PER_WEEK {
        return Err(InvalidScheduleError {
            message: format!(
                "{} points exceed the weekly maximum of {SLOTS_PER_WEEK}",
                schedule.len()
            ),
        });
    }

    if !schedule.is_ordered() {
        return Err(InvalidScheduleError {
            message: "points are not ordered by day and start time".to_string(),
        });
    }

    let duration = Duration::minutes(PATROL_DURATION_MINUTES);
    for point in schedule.points() {
        if point.end_time - point.start_time != duration {
            return Err(InvalidScheduleError {
                message: format!(
                    "{} {} in {} does not last {PATROL_DURATION_MINUTES} minutes",
                    point.day,
                    point.start_hhmm(),
                    point.neighborhood
                ),
            });
        }
        if point.start_time.minute() != 0 {
            return Err(InvalidScheduleError {
                message: format!("{} {} does not start on the hour", point.day, point.start_hhmm()),
            });
        }
    }

    Ok(())
}
