//! `GeoJSON` rendering of patrol points for map display.

use std::path::Path;

use patrol_card_incident_models::{PatrolPoint, PatrolSchedule, Weekday};
use serde_json::{Value, json};

use crate::ExportError;

/// Marker colour of each day, Monday first.
pub const DAY_COLORS: [&str; 7] = [
    "red",
    "blue",
    "green",
    "purple",
    "orange",
    "darkred",
    "lightgray",
];

/// Map centre `(latitude, longitude)` used when there is no point.
pub const DEFAULT_CENTER: (f64, f64) = (-16.36506, -46.902_011_8);

/// Returns the marker colour for `day`.
#[must_use]
pub const fn day_color(day: Weekday) -> &'static str {
    DAY_COLORS[day.index() as usize]
}

/// Returns `(day, colour)` for every day of the week.
#[must_use]
pub fn legend() -> Vec<(Weekday, &'static str)> {
    Weekday::all()
        .iter()
        .map(|&day| (day, day_color(day)))
        .collect()
}

/// Returns the map centre: the first point, or [`DEFAULT_CENTER`].
#[must_use]
pub fn center(schedule: &PatrolSchedule) -> (f64, f64) {
    schedule
        .points()
        .first()
        .map_or(DEFAULT_CENTER, |point| (point.latitude, point.longitude))
}

fn popup(point: &PatrolPoint) -> String {
    format!(
        "<b>Dia:</b> {}<br><b>Horário:</b> {} - {}<br><b>Bairro:</b> {}<br><b>Objetivo:</b> {}",
        point.day,
        point.start_hhmm(),
        point.end_hhmm(),
        point.neighborhood,
        point.objective
    )
}

/// Builds a `GeoJSON` feature for one patrol point.
#[must_use]
pub fn feature(point: &PatrolPoint) -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": [point.longitude, point.latitude]
        },
        "properties": {
            "day": point.day.index(),
            "dayName": point.day.to_string(),
            "color": day_color(point.day),
            "start": point.start_hhmm(),
            "end": point.end_hhmm(),
            "neighborhood": point.neighborhood,
            "street": point.street,
            "objective": point.objective,
            "mission": point.mission,
            "visitOrder": point.visit_order,
            "popup": popup(point),
        }
    })
}

/// Builds the `FeatureCollection` for a schedule, in schedule order.
#[must_use]
pub fn feature_collection(schedule: &PatrolSchedule) -> Value {
    let (lat, lng) = center(schedule);
    let legend: Vec<Value> = legend()
        .into_iter()
        .map(|(day, color)| json!({ "day": day.to_string(), "color": color }))
        .collect();

    json!({
        "type": "FeatureCollection",
        "center": [lat, lng],
        "legend": legend,
        "features": schedule.points().iter().map(feature).collect::<Vec<_>>(),
    })
}

/// Writes the schedule's `FeatureCollection` to `path`.
///
/// # Errors
///
/// * [`ExportError::Json`] if serialization fails
/// * [`ExportError::Io`] if the file cannot be written
pub fn write_map(schedule: &PatrolSchedule, path: &Path) -> Result<(), ExportError> {
    let collection = feature_collection(schedule);
    std::fs::write(path, serde_json::to_string_pretty(&collection)?)?;
    log::info!(
        "Exported {} map features to {}",
        schedule.len(),
        path.display()
    );
    Ok(())
}
