//! Per-day patrol point generation.
//!
//! A day is 4 shifts of 6 hourly slots. For each slot a random incident
//! picks the neighborhood, the predictor and aggregator supply the
//! category and blended probability, and a second random incident from the
//! same neighborhood supplies the street and coordinates. A slot either
//! produces a [`PatrolPoint`] or is skipped with a [`SlotError`]; skipping
//! never affects the other slots.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use patrol_card_incident_models::{PatrolPoint, SLOTS_PER_SHIFT, Shift, Weekday};
use patrol_card_ingest::Dataset;
use patrol_card_predict::{PredictError, Predictor};
use rand::Rng;
use rand::seq::{IteratorRandom as _, SliceRandom as _};

use crate::aggregator::ProbabilityAggregator;
use crate::frequency::HistoricalFrequency;
use crate::progress::PlanProgress;

/// Reasons a single slot produced no patrol point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    /// The sampled neighborhood is unknown to the predictor.
    #[error("Unknown neighborhood '{neighborhood}'")]
    UnknownCategory {
        /// The rejected neighborhood.
        neighborhood: String,
    },

    /// There was no incident to sample from.
    #[error("No incident to sample in {scope}")]
    EmptySample {
        /// What was being sampled (the dataset or a neighborhood).
        scope: String,
    },

    /// The predictor failed for another reason.
    #[error("Prediction failed: {0}")]
    Prediction(PredictError),

    /// The slot time could not be built.
    #[error("Invalid start time for hour {hour}")]
    InvalidTime {
        /// The slot hour.
        hour: u8,
    },
}

impl From<PredictError> for SlotError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::UnknownCategory { neighborhood } => Self::UnknownCategory { neighborhood },
            other => Self::Prediction(other),
        }
    }
}

/// A slot that produced no patrol point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSlot {
    /// Day of the slot.
    pub day: Weekday,
    /// Hour of the slot.
    pub hour: u8,
    /// Why the slot was skipped.
    pub reason: SlotError,
}

/// The result of planning one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotOutcome {
    /// The slot produced a patrol point.
    Planned(PatrolPoint),
    /// The slot was skipped.
    Skipped(SkippedSlot),
}

/// All slot outcomes of one day, in slot order.
#[derive(Debug, Clone, PartialEq)]
pub struct DayPlan {
    /// The planned day.
    pub day: Weekday,
    /// One outcome per attempted slot.
    pub outcomes: Vec<SlotOutcome>,
}

/// The day worker observed the run's cancellation flag and stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Day worker cancelled")]
pub struct Cancelled;

/// Read-only inputs shared by every slot of a run.
pub struct SlotInputs<'a> {
    /// Historical incidents.
    pub dataset: &'a Dataset,
    /// Category predictor.
    pub predictor: &'a dyn Predictor,
    /// Historical category frequencies.
    pub history: &'a HistoricalFrequency,
    /// Date used for the slot start and end times.
    pub anchor_date: NaiveDate,
}

/// Builds the objective text for a slot.
#[must_use]
pub fn objective_text(category: &str, probability: f64, day: Weekday, hour: u8) -> String {
    format!(
        "Alta probabilidade de {category} na região no {day} às {hour}:00. Probabilidade: {probability:.2}"
    )
}

/// Builds the mission text for a neighborhood.
#[must_use]
pub fn mission_text(neighborhood: &str) -> String {
    format!("Patrulhamento preventivo em {neighborhood}")
}

/// Plans every slot of `day`.
///
/// The aggregator is owned by this call, so its cache lives for the whole
/// day. Keys always contain the day, so day workers never share a key.
///
/// # Errors
///
/// Returns [`Cancelled`] if `cancel` is set before all slots are planned.
pub fn plan_day<R: Rng>(
    inputs: &SlotInputs<'_>,
    day: Weekday,
    rng: &mut R,
    cancel: &AtomicBool,
    progress: &dyn PlanProgress,
) -> Result<DayPlan, Cancelled> {
    let mut aggregator = ProbabilityAggregator::new(inputs.predictor, inputs.history);
    let mut outcomes = Vec::with_capacity(usize::from(SLOTS_PER_SHIFT) * Shift::all().len());

    for shift in Shift::all() {
        for slot in 0..SLOTS_PER_SHIFT {
            if cancel.load(Ordering::Relaxed) {
                return Err(Cancelled);
            }

            let hour = shift.hour_of_slot(slot);
            let outcome = match plan_slot(inputs, &mut aggregator, day, hour, rng) {
                Ok(point) => SlotOutcome::Planned(point),
                Err(reason) => {
                    log::warn!("Skipping {day} {hour:02}:00: {reason}");
                    SlotOutcome::Skipped(SkippedSlot { day, hour, reason })
                }
            };
            progress.slot_finished(day, hour, matches!(outcome, SlotOutcome::Planned(_)));
            outcomes.push(outcome);
        }
    }

    let (hits, misses) = aggregator.cache().stats();
    log::debug!("{day}: planned {} slots (cache hits {hits}, misses {misses})", outcomes.len());

    Ok(DayPlan { day, outcomes })
}

/// Plans a single slot, sampling the neighborhood from the whole dataset.
///
/// # Errors
///
/// Returns [`SlotError`] if sampling, prediction, or time construction fails.
pub fn plan_slot<R: Rng>(
    inputs: &SlotInputs<'_>,
    aggregator: &mut ProbabilityAggregator<'_>,
    day: Weekday,
    hour: u8,
    rng: &mut R,
) -> Result<PatrolPoint, SlotError> {
    let neighborhood = inputs
        .dataset
        .records()
        .choose(rng)
        .map(|record| record.neighborhood.clone())
        .ok_or_else(|| SlotError::EmptySample {
            scope: "dataset".to_string(),
        })?;

    plan_slot_in(inputs, aggregator, &neighborhood, day, hour, rng)
}

/// Plans a single slot for an already chosen neighborhood.
///
/// # Errors
///
/// Returns [`SlotError`] if the neighborhood is unknown to the predictor,
/// has no incidents to sample a location from, or the time is invalid.
pub fn plan_slot_in<R: Rng>(
    inputs: &SlotInputs<'_>,
    aggregator: &mut ProbabilityAggregator<'_>,
    neighborhood: &str,
    day: Weekday,
    hour: u8,
    rng: &mut R,
) -> Result<PatrolPoint, SlotError> {
    let prediction = inputs.predictor.predict(neighborhood, day, hour)?;
    let blended = aggregator.blended_probability(neighborhood, day, hour)?;
    let objective = objective_text(&prediction.category, blended, day, hour);

    let location = inputs
        .dataset
        .records_in(neighborhood)
        .choose(rng)
        .ok_or_else(|| SlotError::EmptySample {
            scope: format!("neighborhood '{neighborhood}'"),
        })?;

    let start_time = inputs
        .anchor_date
        .and_hms_opt(u32::from(hour), 0, 0)
        .ok_or(SlotError::InvalidTime { hour })?;

    log::debug!(
        "{day} {hour:02}:00 -> {neighborhood} / {} ({}, {blended:.2})",
        location.street,
        prediction.category
    );

    Ok(PatrolPoint::new(
        day,
        start_time,
        neighborhood.to_string(),
        location.street.clone(),
        location.latitude,
        location.longitude,
        objective,
        mission_text(neighborhood),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Timelike as _};
    use patrol_card_incident_models::{IncidentRecord, PredictionResult};
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    use super::*;
    use crate::progress::NullProgress;

    struct FixedPredictor;

    impl Predictor for FixedPredictor {
        fn predict(
            &self,
            neighborhood: &str,
            _day: Weekday,
            _hour: u8,
        ) -> Result<PredictionResult, PredictError> {
            if neighborhood == "Bairro Novo" {
                return Err(PredictError::UnknownCategory {
                    neighborhood: neighborhood.to_string(),
                });
            }
            Ok(PredictionResult {
                category: "FURTO".to_string(),
                probability: 0.8,
            })
        }
    }

    fn record(neighborhood: &str, street: &str, day: Weekday, hour: u8) -> IncidentRecord {
        IncidentRecord {
            neighborhood: neighborhood.to_string(),
            day,
            hour,
            category: "FURTO".to_string(),
            latitude: -16.36,
            longitude: -46.90,
            street: street.to_string(),
            occurred_on: None,
        }
    }

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn objective_mentions_category_probability_day_and_hour() {
        assert_eq!(
            objective_text("ROUBO", 0.756, Weekday::Friday, 14),
            "Alta probabilidade de ROUBO na região no Sexta às 14:00. Probabilidade: 0.76"
        );
        assert_eq!(mission_text("Centro"), "Patrulhamento preventivo em Centro");
    }

    #[test]
    fn single_neighborhood_monday_ten_oclock() {
        let dataset =
            Dataset::new(vec![record("Centro", "Rua Direita", Weekday::Monday, 10); 5]).unwrap();
        let history = HistoricalFrequency::from_records(dataset.records());
        let inputs = SlotInputs {
            dataset: &dataset,
            predictor: &FixedPredictor,
            history: &history,
            anchor_date: anchor(),
        };
        let mut aggregator = ProbabilityAggregator::new(&FixedPredictor, &history);
        let mut rng = StdRng::seed_from_u64(1);

        let point = plan_slot(&inputs, &mut aggregator, Weekday::Monday, 10, &mut rng).unwrap();

        assert_eq!(point.neighborhood, "Centro");
        assert_eq!(point.street, "Rua Direita");
        assert_eq!(point.day, Weekday::Monday);
        assert_eq!(point.start_time.hour(), 10);
        assert_eq!(point.start_time.minute(), 0);
        assert_eq!(point.end_time, point.start_time + Duration::minutes(20));
        // Predicted 0.8, every Monday 10h incident is FURTO: (1.0 + 0.8) / 2.
        assert!(point.objective.ends_with("Probabilidade: 0.90"));
        assert!(point.objective.contains("Segunda às 10:00"));
        assert!(point.note.is_empty());
        assert_eq!(point.visit_order, None);
    }

    #[test]
    fn unknown_neighborhood_skips_only_that_slot() {
        let dataset = Dataset::new(vec![
            record("Centro", "Rua A", Weekday::Monday, 10),
            record("Bairro Novo", "Rua B", Weekday::Monday, 10),
        ])
        .unwrap();
        let history = HistoricalFrequency::from_records(dataset.records());
        let inputs = SlotInputs {
            dataset: &dataset,
            predictor: &FixedPredictor,
            history: &history,
            anchor_date: anchor(),
        };
        let mut rng = StdRng::seed_from_u64(42);

        let plan = plan_day(
            &inputs,
            Weekday::Tuesday,
            &mut rng,
            &AtomicBool::new(false),
            &NullProgress,
        )
        .unwrap();

        assert_eq!(plan.outcomes.len(), 24);
        let mut planned = 0;
        let mut skipped = 0;
        for outcome in &plan.outcomes {
            match outcome {
                SlotOutcome::Planned(point) => {
                    assert_eq!(point.neighborhood, "Centro");
                    planned += 1;
                }
                SlotOutcome::Skipped(slot) => {
                    assert_eq!(
                        slot.reason,
                        SlotError::UnknownCategory {
                            neighborhood: "Bairro Novo".to_string()
                        }
                    );
                    assert_eq!(slot.day, Weekday::Tuesday);
                    skipped += 1;
                }
            }
        }
        assert!(planned > 0, "other slots of the day must still be planned");
        assert!(skipped > 0, "the unknown neighborhood must be skipped");
    }

    #[test]
    fn plan_slot_in_unknown_neighborhood_is_unknown_category() {
        let dataset = Dataset::new(vec![record("Centro", "Rua A", Weekday::Monday, 10)]).unwrap();
        let history = HistoricalFrequency::from_records(dataset.records());
        let inputs = SlotInputs {
            dataset: &dataset,
            predictor: &FixedPredictor,
            history: &history,
            anchor_date: anchor(),
        };
        let mut aggregator = ProbabilityAggregator::new(&FixedPredictor, &history);
        let mut rng = StdRng::seed_from_u64(3);

        let err = plan_slot_in(
            &inputs,
            &mut aggregator,
            "Bairro Novo",
            Weekday::Monday,
            4,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, SlotError::UnknownCategory { .. }));
    }

    #[test]
    fn neighborhood_without_incidents_is_an_empty_sample() {
        let dataset = Dataset::new(vec![record("Centro", "Rua A", Weekday::Monday, 10)]).unwrap();
        let history = HistoricalFrequency::from_records(dataset.records());
        let inputs = SlotInputs {
            dataset: &dataset,
            predictor: &FixedPredictor,
            history: &history,
            anchor_date: anchor(),
        };
        let mut aggregator = ProbabilityAggregator::new(&FixedPredictor, &history);
        let mut rng = StdRng::seed_from_u64(3);

        let err = plan_slot_in(
            &inputs,
            &mut aggregator,
            "Jardim",
            Weekday::Monday,
            4,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, SlotError::EmptySample { .. }));
    }

    #[test]
    fn day_hours_follow_shift_and_slot() {
        let dataset = Dataset::new(vec![record("Centro", "Rua A", Weekday::Monday, 10)]).unwrap();
        let history = HistoricalFrequency::from_records(dataset.records());
        let inputs = SlotInputs {
            dataset: &dataset,
            predictor: &FixedPredictor,
            history: &history,
            anchor_date: anchor(),
        };
        let mut rng = StdRng::seed_from_u64(9);

        let plan = plan_day(
            &inputs,
            Weekday::Sunday,
            &mut rng,
            &AtomicBool::new(false),
            &NullProgress,
        )
        .unwrap();

        let hours: Vec<u32> = plan
            .outcomes
            .iter()
            .map(|outcome| match outcome {
                SlotOutcome::Planned(point) => point.start_time.hour(),
                SlotOutcome::Skipped(slot) => u32::from(slot.hour),
            })
            .collect();
        assert_eq!(hours, (0..24).collect::<Vec<u32>>());
    }

    #[test]
    fn cancelled_day_stops_early() {
        let dataset = Dataset::new(vec![record("Centro", "Rua A", Weekday::Monday, 10)]).unwrap();
        let history = HistoricalFrequency::from_records(dataset.records());
        let inputs = SlotInputs {
            dataset: &dataset,
            predictor: &FixedPredictor,
            history: &history,
            anchor_date: anchor(),
        };
        let mut rng = StdRng::seed_from_u64(9);

        let result = plan_day(
            &inputs,
            Weekday::Monday,
            &mut rng,
            &AtomicBool::new(true),
            &NullProgress,
        );
        assert_eq!(result, Err(Cancelled));
    }
}
