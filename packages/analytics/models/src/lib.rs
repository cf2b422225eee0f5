#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Series types for the crime dashboard report.
//!
//! Every chart of the dashboard is backed by one of these types. They carry
//! no behavior; `patrol_card_analytics` computes them from a dataset.

use chrono::NaiveDate;
use patrol_card_incident_models::{Shift, Weekday};
use serde::{Deserialize, Serialize};

/// Incident count for a named bucket (neighborhood or category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Bucket name.
    pub name: String,
    /// Number of incidents.
    pub count: u64,
}

/// One bar of the crime type Pareto chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParetoEntry {
    /// Crime category.
    pub category: String,
    /// Number of incidents.
    pub count: u64,
    /// Running share of the charted categories, in percent.
    pub cumulative_percent: f64,
}

/// Incident count for an hour of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourCount {
    /// Hour, 0-23.
    pub hour: u8,
    /// Number of incidents.
    pub count: u64,
}

/// Incident count for a day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayCount {
    /// Day of the week.
    pub day: Weekday,
    /// Display name of the day.
    pub name: String,
    /// Number of incidents.
    pub count: u64,
}

/// Incident count for a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftCount {
    /// The shift.
    pub shift: Shift,
    /// Display label of the shift.
    pub label: String,
    /// Number of incidents.
    pub count: u64,
}

/// Incident count on a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// Calendar date.
    pub date: NaiveDate,
    /// Number of incidents.
    pub count: u64,
}

/// Incident count for one `(neighborhood, day, hour)` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyRow {
    /// Neighborhood.
    pub neighborhood: String,
    /// Day of the week.
    pub day: Weekday,
    /// Hour of the day.
    pub hour: u8,
    /// Number of incidents.
    pub count: u64,
}

/// All dashboard series for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeReport {
    /// Number of incidents in the dataset.
    pub total: u64,
    /// Incidents per hour, hours without incidents omitted.
    pub by_hour: Vec<HourCount>,
    /// The ten neighborhoods with the most incidents.
    pub top_neighborhoods: Vec<CategoryCount>,
    /// Incidents per weekday, Monday first.
    pub by_weekday: Vec<WeekdayCount>,
    /// The ten most frequent categories with cumulative share.
    pub top_categories: Vec<ParetoEntry>,
    /// Incidents per date, for records that carry one.
    pub daily_trend: Vec<TimeSeriesPoint>,
    /// Incidents per shift.
    pub by_shift: Vec<ShiftCount>,
    /// Grouped `(neighborhood, day, hour)` counts.
    pub frequency: Vec<FrequencyRow>,
}
