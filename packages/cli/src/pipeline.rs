//! Load, train, plan, and export in one run.
//!
//! The blocking stages (CSV parsing, training, file output) run on
//! `spawn_blocking` so the runtime stays free for the day workers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use patrol_card_analytics::build_report;
use patrol_card_cli_utils::{MultiProgress, SlotsBar};
use patrol_card_ingest::{Dataset, LoadOptions, load_csv};
use patrol_card_predict::{CrimeClassifier, TrainingConfig, TrainingReport};
use patrol_card_schedule::{ScheduleConfig, ScheduleGenerator, ScheduleRun};

use crate::error::AppError;

/// Fully resolved settings for a `generate` run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Incident CSV.
    pub input: PathBuf,
    /// CSV parsing options.
    pub load: LoadOptions,
    /// Classifier hyper-parameters.
    pub training: TrainingConfig,
    /// Schedule settings.
    pub schedule: ScheduleConfig,
    /// Workbook output path.
    pub workbook: PathBuf,
    /// Map output path, `None` to skip the map.
    pub map: Option<PathBuf>,
}

/// Loads the incident CSV off the async runtime.
///
/// # Errors
///
/// Returns [`AppError::Ingest`] if the file cannot be loaded.
pub async fn load(input: &Path, options: LoadOptions) -> Result<Dataset, AppError> {
    let path = input.to_path_buf();
    let dataset = tokio::task::spawn_blocking(move || load_csv(&path, options)).await??;
    log::info!(
        "Loaded {} incidents across {} neighborhoods from {}",
        dataset.len(),
        dataset.neighborhoods().len(),
        input.display()
    );
    Ok(dataset)
}

/// Trains the classifier off the async runtime.
///
/// # Errors
///
/// Returns [`AppError::Train`] if training fails.
pub async fn train(
    dataset: &Dataset,
    config: TrainingConfig,
) -> Result<(CrimeClassifier, TrainingReport), AppError> {
    let dataset = dataset.clone();
    let trained =
        tokio::task::spawn_blocking(move || CrimeClassifier::train(&dataset, &config)).await??;
    Ok(trained)
}

/// Runs the whole pipeline and writes the workbook (and map).
///
/// # Errors
///
/// Returns the first [`AppError`] from any stage. Nothing is written if
/// generation fails.
pub async fn generate(
    options: GenerateOptions,
    multi: &MultiProgress,
) -> Result<ScheduleRun, AppError> {
    let start = Instant::now();
    let stages = patrol_card_cli_utils::stages_bar(multi, 4);

    stages.set_message("Loading incidents");
    let dataset = load(&options.input, options.load).await?;
    stages.inc(1);

    stages.set_message("Training classifier");
    let (classifier, report) = train(&dataset, options.training).await?;
    if let Some(accuracy) = report.accuracy {
        log::info!("Classifier accuracy: {:.2}%", accuracy * 100.0);
    }
    stages.inc(1);

    stages.set_message("Planning patrol points");
    let run = ScheduleGenerator::new(dataset, Arc::new(classifier), options.schedule)
        .with_progress(SlotsBar::new(multi))
        .generate()
        .await?;
    for slot in &run.skipped {
        log::debug!("Skipped {} {:02}:00: {}", slot.day, slot.hour, slot.reason);
    }
    stages.inc(1);

    stages.set_message("Exporting");
    let workbook = options.workbook.clone();
    let map = options.map.clone();
    let run = tokio::task::spawn_blocking(move || -> Result<ScheduleRun, AppError> {
        let mut run = run;
        patrol_card_export::write_workbook(&mut run.schedule, &workbook)?;
        if let Some(map) = &map {
            patrol_card_export::write_map(&run.schedule, map)?;
        }
        Ok(run)
    })
    .await??;
    stages.inc(1);
    stages.finish_with_message(format!("Done in {:.1}s", start.elapsed().as_secs_f64()));

    println!(
        "{} patrol points ({} slots skipped, seed {}) written to {}",
        run.schedule.len(),
        run.skipped.len(),
        run.seed,
        options.workbook.display()
    );
    if let Some(map) = &options.map {
        println!("Map written to {}", map.display());
    }

    Ok(run)
}

/// Loads the dataset and writes the dashboard report.
///
/// # Errors
///
/// Returns [`AppError`] if loading or writing fails.
pub async fn report(input: &Path, load_options: LoadOptions, output: &Path) -> Result<(), AppError> {
    let dataset = load(input, load_options).await?;
    let report = build_report(&dataset);
    patrol_card_analytics::write_report(&report, output)?;

    println!(
        "Report for {} incidents written to {}",
        report.total,
        output.display()
    );
    Ok(())
}

/// Trains the classifier and prints its held-out accuracy.
///
/// # Errors
///
/// Returns [`AppError`] if loading or training fails.
pub async fn evaluate(
    input: &Path,
    load_options: LoadOptions,
    training: TrainingConfig,
) -> Result<TrainingReport, AppError> {
    let dataset = load(input, load_options).await?;
    let (_, report) = train(&dataset, training).await?;

    println!(
        "Trained on {} incidents, tested on {} ({} categories, {} neighborhoods, seed {})",
        report.train_size, report.test_size, report.n_categories, report.n_neighborhoods, report.seed
    );
    match report.accuracy {
        Some(accuracy) => println!("Accuracy: {:.2}%", accuracy * 100.0),
        None => println!("Accuracy: n/a (no held-out records)"),
    }
    Ok(report)
}
