#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the patrol card binaries.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so log
//! lines are printed above any active progress bar instead of tearing it.
//! [`SlotsBar`] renders the slot events of a schedule run and
//! [`stages_bar`] tracks the pipeline stages.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::ProgressStyle;
use patrol_card_incident_models::Weekday;
use patrol_card_schedule::progress::PlanProgress;

pub use indicatif::{MultiProgress, ProgressBar};

/// Renders patrol slot events as a bar with a running skip count.
pub struct SlotsBar {
    bar: ProgressBar,
    skipped: AtomicU64,
}

impl SlotsBar {
    /// Adds a spinner to `multi` that becomes a slot bar once the run starts.
    #[must_use]
    pub fn new(multi: &MultiProgress) -> Arc<Self> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("Waiting for day workers");

        Arc::new(Self {
            bar,
            skipped: AtomicU64::new(0),
        })
    }

    fn message(skipped: u64) -> String {
        match skipped {
            0 => "Planning patrol slots".to_string(),
            1 => "Planning patrol slots (1 skipped)".to_string(),
            n => format!("Planning patrol slots ({n} skipped)"),
        }
    }
}

impl PlanProgress for SlotsBar {
    fn started(&self, slots: u64) {
        self.bar.set_length(slots);
        self.bar.set_position(0);
        self.bar.set_style(
            ProgressStyle::with_template("  {msg} {wide_bar:.cyan/dim} {pos}/{len} slots [{eta}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        self.bar.set_message(Self::message(0));
    }

    fn slot_finished(&self, day: Weekday, hour: u8, planned: bool) {
        if !planned {
            let skipped = self.skipped.fetch_add(1, Ordering::Relaxed) + 1;
            self.bar.set_message(Self::message(skipped));
            log::debug!("No patrol point for {day} {hour:02}:00");
        }
        self.bar.inc(1);
    }

    fn finished(&self, points: usize, skipped: usize) {
        self.bar
            .finish_with_message(format!("Planned {points} patrol points, {skipped} slots skipped"));
    }

    fn aborted(&self) {
        self.bar.finish_and_clear();
    }
}

/// Adds a bar over the `total` pipeline stages to `multi`.
#[must_use]
pub fn stages_bar(multi: &MultiProgress, total: u64) -> ProgressBar {
    let bar = multi.add(ProgressBar::new(total));
    bar.set_style(
        ProgressStyle::with_template("{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar
}

/// Installs `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] every progress bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // A logger may already be installed (tests, embedding binaries).
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
