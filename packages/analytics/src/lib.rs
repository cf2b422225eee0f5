#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard series computed from a historical incident dataset.
//!
//! Each public function backs one chart: incidents per hour, top
//! neighborhoods, incidents per weekday, the category Pareto, the daily
//! trend, and the shift distribution. [`build_report`] collects them all
//! into a serializable [`CrimeReport`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use patrol_card_analytics_models::{
    CategoryCount, CrimeReport, FrequencyRow, HourCount, ParetoEntry, ShiftCount, TimeSeriesPoint,
    WeekdayCount,
};
use patrol_card_incident_models::{IncidentRecord, Shift, Weekday};
use patrol_card_ingest::Dataset;
use thiserror::Error;

/// Number of entries in the ranked charts.
pub const TOP_N: usize = 10;

/// Errors that can occur while writing a report.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// File system error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Counts incidents per hour, ascending, omitting hours with none.
#[must_use]
pub fn crimes_by_hour(records: &[IncidentRecord]) -> Vec<HourCount> {
    let mut counts = BTreeMap::<u8, u64>::new();
    for record in records {
        *counts.entry(record.hour).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect()
}

/// Ranks `keys` by count, descending, ties by name, keeping the first `n`.
fn top_counts<'a>(keys: impl Iterator<Item = &'a str>, n: usize) -> Vec<CategoryCount> {
    let mut counts = HashMap::<&str, u64>::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut ranked: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(name, count)| CategoryCount {
            name: name.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(n);
    ranked
}

/// Returns the [`TOP_N`] neighborhoods with the most incidents.
#[must_use]
pub fn top_neighborhoods(records: &[IncidentRecord]) -> Vec<CategoryCount> {
    top_counts(records.iter().map(|r| r.neighborhood.as_str()), TOP_N)
}

/// Counts incidents per weekday, Monday to Sunday, including empty days.
#[must_use]
pub fn crimes_by_weekday(records: &[IncidentRecord]) -> Vec<WeekdayCount> {
    let mut counts = [0u64; 7];
    for record in records {
        counts[usize::from(record.day.index())] += 1;
    }
    Weekday::all()
        .iter()
        .zip(counts)
        .map(|(&day, count)| WeekdayCount {
            day,
            name: day.to_string(),
            count,
        })
        .collect()
}

/// Returns the [`TOP_N`] categories with their running share of the
/// charted total, in percent.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn category_pareto(records: &[IncidentRecord]) -> Vec<ParetoEntry> {
    let top = top_counts(records.iter().map(|r| r.category.as_str()), TOP_N);
    let total: u64 = top.iter().map(|c| c.count).sum();

    let mut running = 0u64;
    top.into_iter()
        .map(|entry| {
            running += entry.count;
            ParetoEntry {
                category: entry.name,
                count: entry.count,
                cumulative_percent: running as f64 / total as f64 * 100.0,
            }
        })
        .collect()
}

/// Counts incidents per date for records that have one, ascending.
#[must_use]
pub fn daily_trend(records: &[IncidentRecord]) -> Vec<TimeSeriesPoint> {
    let mut counts = BTreeMap::new();
    for date in records.iter().filter_map(|r| r.occurred_on) {
        *counts.entry(date).or_insert(0u64) += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| TimeSeriesPoint { date, count })
        .collect()
}

/// Counts incidents per shift, in chronological shift order.
#[must_use]
pub fn crimes_by_shift(records: &[IncidentRecord]) -> Vec<ShiftCount> {
    let mut counts = [0u64; 4];
    for record in records {
        counts[usize::from(Shift::from_hour(record.hour).index())] += 1;
    }
    Shift::all()
        .iter()
        .zip(counts)
        .map(|(&shift, count)| ShiftCount {
            shift,
            label: shift.label().to_string(),
            count,
        })
        .collect()
}

/// Counts incidents per `(neighborhood, day, hour)`, sorted by that key.
#[must_use]
pub fn frequency_report(records: &[IncidentRecord]) -> Vec<FrequencyRow> {
    let mut counts = BTreeMap::<(&str, Weekday, u8), u64>::new();
    for record in records {
        *counts
            .entry((record.neighborhood.as_str(), record.day, record.hour))
            .or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((neighborhood, day, hour), count)| FrequencyRow {
            neighborhood: neighborhood.to_string(),
            day,
            hour,
            count,
        })
        .collect()
}

/// Computes every dashboard series for `dataset`.
#[must_use]
pub fn build_report(dataset: &Dataset) -> CrimeReport {
    let records = dataset.records();
    log::info!("Building crime report from {} incidents", records.len());

    CrimeReport {
        total: records.len() as u64,
        by_hour: crimes_by_hour(records),
        top_neighborhoods: top_neighborhoods(records),
        by_weekday: crimes_by_weekday(records),
        top_categories: category_pareto(records),
        daily_trend: daily_trend(records),
        by_shift: crimes_by_shift(records),
        frequency: frequency_report(records),
    }
}

/// Writes `report` to `path` as pretty-printed JSON.
///
/// # Errors
///
/// * [`AnalyticsError::Json`] if serialization fails
/// * [`AnalyticsError::Io`] if the file cannot be written
pub fn write_report(report: &CrimeReport, path: &Path) -> Result<(), AnalyticsError> {
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    log::info!("Wrote crime report to {}", path.display());
    Ok(())
}
