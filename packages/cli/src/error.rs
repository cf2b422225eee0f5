use patrol_card_analytics::AnalyticsError;
use patrol_card_export::ExportError;
use patrol_card_ingest::IngestError;
use patrol_card_predict::TrainError;
use patrol_card_schedule::ScheduleError;

use crate::config::ConfigError;

/// Any failure that ends a CLI run.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The incident CSV could not be loaded.
    #[error("Failed to load incidents: {0}")]
    Ingest(#[from] IngestError),

    /// The classifier could not be trained.
    #[error("Failed to train classifier: {0}")]
    Train(#[from] TrainError),

    /// Schedule generation failed.
    #[error("Failed to generate schedule: {0}")]
    Schedule(#[from] ScheduleError),

    /// An output artifact could not be written.
    #[error("Failed to export: {0}")]
    Export(#[from] ExportError),

    /// The crime report could not be written.
    #[error("Failed to write report: {0}")]
    Analytics(#[from] AnalyticsError),

    /// A background task failed.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Interactive prompt failure.
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// No incident CSV was given on the command line or in the config.
    #[error("No input CSV given (pass a path or set [input] csv in the config)")]
    MissingInput,
}
