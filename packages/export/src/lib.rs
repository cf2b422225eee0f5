#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output artifacts for a weekly patrol schedule: the "cartão programa"
//! spreadsheet and a `GeoJSON` map of the patrol points.

pub mod map;
pub mod xlsx;

pub use map::write_map;
pub use xlsx::write_workbook;

/// Errors that can occur while exporting a schedule.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Spreadsheet construction or save failure.
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// File system error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The schedule has no points.
    #[error("No patrol points to export")]
    EmptySchedule,
}
