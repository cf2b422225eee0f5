#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weekly patrol schedule ("cartão programa") generation.
//!
//! [`ScheduleGenerator`] plans the seven days of the week concurrently, one
//! blocking worker per day, and merges the results into a single
//! [`PatrolSchedule`] ordered by day and start time.

pub mod aggregator;
pub mod assembler;
pub mod frequency;
pub mod generator;
pub mod progress;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use patrol_card_incident_models::{PatrolSchedule, SLOTS_PER_WEEK, Weekday};
use patrol_card_ingest::Dataset;
use patrol_card_predict::Predictor;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::assembler::{InvalidScheduleError, assemble};
use crate::frequency::HistoricalFrequency;
use crate::generator::{Cancelled, DayPlan, SkippedSlot, SlotInputs, plan_day};
use crate::progress::{PlanProgress, null_progress};

/// Errors that abort a whole generation run.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// A day worker failed unexpectedly.
    #[error("Day worker for {day} failed: {message}")]
    DayWorker {
        /// The day whose worker failed.
        day: Weekday,
        /// Panic message of the worker.
        message: String,
    },

    /// The merged schedule broke a structural rule.
    #[error(transparent)]
    InvalidSchedule(#[from] InvalidScheduleError),
}

/// Settings for a generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ScheduleConfig {
    /// Run seed. A random seed is drawn (and logged) when `None`.
    pub seed: Option<u64>,
    /// Date used for slot start and end times. Today when `None`.
    pub anchor_date: Option<NaiveDate>,
}

/// Output of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRun {
    /// The ordered weekly schedule.
    pub schedule: PatrolSchedule,
    /// Slots that produced no point, ordered by day and hour.
    pub skipped: Vec<SkippedSlot>,
    /// Seed the run used; passing it back reproduces the schedule.
    pub seed: u64,
}

/// Derives the RNG seed of one day worker from the run seed.
#[must_use]
pub fn day_seed(run_seed: u64, day: Weekday) -> u64 {
    run_seed ^ (u64::from(day.index()) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Generates weekly patrol schedules from a dataset and a predictor.
pub struct ScheduleGenerator {
    dataset: Dataset,
    predictor: Arc<dyn Predictor>,
    config: ScheduleConfig,
    progress: Arc<dyn PlanProgress>,
}

impl ScheduleGenerator {
    /// Creates a generator that reports no progress.
    #[must_use]
    pub fn new(dataset: Dataset, predictor: Arc<dyn Predictor>, config: ScheduleConfig) -> Self {
        Self {
            dataset,
            predictor,
            config,
            progress: null_progress(),
        }
    }

    /// Reports slot progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn PlanProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Plans the whole week.
    ///
    /// Each day runs on its own blocking worker with its own probability
    /// cache and RNG, so the result for a given seed does not depend on the
    /// order in which workers finish.
    ///
    /// # Errors
    ///
    /// * [`ScheduleError::DayWorker`] if any day worker panics. The other
    ///   workers are cancelled and no partial schedule is returned.
    /// * [`ScheduleError::InvalidSchedule`] if the merged schedule is
    ///   malformed.
    pub async fn generate(&self) -> Result<ScheduleRun, ScheduleError> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let anchor_date = self
            .config
            .anchor_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        log::info!(
            "Generating patrol schedule from {} incidents (seed {seed}, anchor {anchor_date})",
            self.dataset.len()
        );

        let history = Arc::new(HistoricalFrequency::from_records(self.dataset.records()));
        let cancel = Arc::new(AtomicBool::new(false));

        self.progress.started(SLOTS_PER_WEEK as u64);

        let mut tasks = JoinSet::new();

        for &day in Weekday::all() {
            let dataset = self.dataset.clone();
            let predictor = Arc::clone(&self.predictor);
            let history = Arc::clone(&history);
            let cancel = Arc::clone(&cancel);
            let progress = Arc::clone(&self.progress);

            tasks.spawn_blocking(move || {
                let planned = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    let inputs = SlotInputs {
                        dataset: &dataset,
                        predictor: &*predictor,
                        history: &history,
                        anchor_date,
                    };
                    let mut rng = StdRng::seed_from_u64(day_seed(seed, day));
                    plan_day(&inputs, day, &mut rng, &cancel, &*progress)
                }));
                (day, planned)
            });
        }

        let mut plans: Vec<DayPlan> = Vec::with_capacity(Weekday::all().len());
        let mut failure: Option<ScheduleError> = None;

        while let Some(joined) = tasks.join_next().await {
            let (day, planned) = match joined {
                Ok(done) => done,
                // Workers catch their own panics; only `abort_all` cancels.
                Err(err) if err.is_cancelled() => continue,
                Err(err) => std::panic::resume_unwind(err.into_panic()),
            };

            match planned {
                Ok(Ok(plan)) => {
                    log::debug!("{day} planned");
                    plans.push(plan);
                }
                Ok(Err(Cancelled)) => {}
                Err(payload) => {
                    if failure.is_some() {
                        continue;
                    }
                    cancel.store(true, Ordering::Relaxed);
                    tasks.abort_all();

                    let error = ScheduleError::DayWorker {
                        day,
                        message: panic_message(payload.as_ref()),
                    };
                    log::error!("{error}");
                    failure = Some(error);
                }
            }
        }

        if let Some(error) = failure {
            self.progress.aborted();
            return Err(error);
        }

        let (schedule, skipped) = assemble(plans).inspect_err(|_| self.progress.aborted())?;

        self.progress.finished(schedule.len(), skipped.len());
        log::info!(
            "Planned {} patrol points, skipped {} slots",
            schedule.len(),
            skipped.len()
        );

        Ok(ScheduleRun {
            schedule,
            skipped,
            seed,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "worker panicked".to_string())
}
