//! Field coercion helpers for incident exports.
//!
//! Exports use Brazilian conventions: `;` separated fields, comma decimal
//! separators in coordinates, `dd/mm/YYYY` dates and Portuguese weekday
//! names.

use std::str::FromStr as _;

use chrono::NaiveDate;
use patrol_card_incident_models::Weekday;

/// Parses an hour of day from `HH:MM:SS`, `HH:MM` or a bare `HH`.
///
/// Returns `None` if the value is empty, unparseable, or not in 0-23.
#[must_use]
pub fn parse_hour(value: &str) -> Option<u8> {
    let hour = value.trim().split(':').next()?.trim();
    let hour = hour.parse::<u8>().ok()?;
    (hour < 24).then_some(hour)
}

/// Parses a weekday from a 0-6 index.
#[must_use]
pub fn parse_weekday_index(value: &str) -> Option<Weekday> {
    let index = value.trim().parse::<u8>().ok()?;
    Weekday::from_index(index).ok()
}

/// Parses a weekday from its Portuguese name (`SEGUNDA-FEIRA`, `SÁBADO`...).
#[must_use]
pub fn parse_weekday_name(value: &str) -> Option<Weekday> {
    Weekday::from_str(value.trim()).ok()
}

/// Parses a coordinate, accepting either `,` or `.` as decimal separator.
///
/// Returns `None` if missing, unparseable, non-finite, or zero.
#[must_use]
pub fn parse_coordinate(value: &str) -> Option<f64> {
    let normalized = value.trim().replace(',', ".");
    let coordinate = normalized.parse::<f64>().ok()?;
    if !coordinate.is_finite() || coordinate == 0.0 {
        return None;
    }
    Some(coordinate)
}

/// Parses a `dd/mm/YYYY` date.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%d/%m/%Y").ok()
}

/// Trims a text field, returning `None` when nothing is left.
#[must_use]
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hour_formats() {
        assert_eq!(parse_hour("14:30:00"), Some(14));
        assert_eq!(parse_hour("07:05"), Some(7));
        assert_eq!(parse_hour(" 0 "), Some(0));
        assert_eq!(parse_hour("24:00:00"), None);
        assert_eq!(parse_hour(""), None);
    }

    #[test]
    fn parses_comma_decimal_coordinates() {
        let lat = parse_coordinate("-16,36506").unwrap();
        assert!((lat - -16.365_06).abs() < f64::EPSILON);
        let lng = parse_coordinate("-46.9020118").unwrap();
        assert!((lng - -46.902_011_8).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_zero_and_garbage_coordinates() {
        assert!(parse_coordinate("0").is_none());
        assert!(parse_coordinate("abc").is_none());
        assert!(parse_coordinate("NaN").is_none());
    }

    #[test]
    fn parses_weekdays() {
        assert_eq!(parse_weekday_name("QUARTA-FEIRA"), Some(Weekday::Wednesday));
        assert_eq!(parse_weekday_index("6"), Some(Weekday::Sunday));
        assert_eq!(parse_weekday_index("7"), None);
    }

    #[test]
    fn parses_brazilian_date() {
        let date = parse_date("25/12/2023").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 12, 25).unwrap());
        assert!(parse_date("2023-12-25").is_none());
    }
}
