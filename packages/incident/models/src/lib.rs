#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident, calendar and patrol point types for the patrol card generator.
//!
//! This crate defines the records shared by every stage of the pipeline:
//! historical [`IncidentRecord`]s produced by ingestion, the
//! [`PredictionResult`] returned by a predictor, and the [`PatrolPoint`]s
//! that make up a weekly [`PatrolSchedule`].

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Length of a single patrol assignment, in minutes.
pub const PATROL_DURATION_MINUTES: i64 = 20;

/// Number of fixed shifts in a day.
pub const SHIFTS_PER_DAY: u8 = 4;

/// Number of hourly slots in a shift.
pub const SLOTS_PER_SHIFT: u8 = 6;

/// Number of slots attempted for a full week (7 days x 4 shifts x 6 slots).
pub const SLOTS_PER_WEEK: usize = 7 * SHIFTS_PER_DAY as usize * SLOTS_PER_SHIFT as usize;

/// Day of the week, indexed 0 (Monday) through 6 (Sunday).
///
/// Parses the Portuguese weekday spellings found in incident exports
/// (`SEGUNDA-FEIRA`, `SÁBADO`, ...) and displays the short Portuguese name
/// used for sheet titles and objective text.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(into = "u8", try_from = "u8")]
#[strum(ascii_case_insensitive)]
pub enum Weekday {
    /// Segunda-feira
    #[strum(serialize = "SEGUNDA-FEIRA", serialize = "SEGUNDA", to_string = "Segunda")]
    Monday = 0,
    /// Terça-feira
    #[strum(
        serialize = "TERÇA-FEIRA",
        serialize = "TERCA-FEIRA",
        serialize = "TERÇA",
        serialize = "TERCA",
        to_string = "Terça"
    )]
    Tuesday = 1,
    /// Quarta-feira
    #[strum(serialize = "QUARTA-FEIRA", serialize = "QUARTA", to_string = "Quarta")]
    Wednesday = 2,
    /// Quinta-feira
    #[strum(serialize = "QUINTA-FEIRA", serialize = "QUINTA", to_string = "Quinta")]
    Thursday = 3,
    /// Sexta-feira
    #[strum(serialize = "SEXTA-FEIRA", serialize = "SEXTA", to_string = "Sexta")]
    Friday = 4,
    /// Sábado
    #[strum(serialize = "SÁBADO", serialize = "SABADO", to_string = "Sábado")]
    Saturday = 5,
    /// Domingo
    #[strum(serialize = "DOMINGO", to_string = "Domingo")]
    Sunday = 6,
}

impl Weekday {
    /// Returns the 0-based index of this day (Monday = 0).
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Creates a weekday from its 0-based index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is not in the range 0-6.
    pub const fn from_index(index: u8) -> Result<Self, InvalidWeekdayError> {
        match index {
            0 => Ok(Self::Monday),
            1 => Ok(Self::Tuesday),
            2 => Ok(Self::Wednesday),
            3 => Ok(Self::Thursday),
            4 => Ok(Self::Friday),
            5 => Ok(Self::Saturday),
            6 => Ok(Self::Sunday),
            _ => Err(InvalidWeekdayError { index }),
        }
    }

    /// Returns all days in week order, Monday first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Monday,
            Self::Tuesday,
            Self::Wednesday,
            Self::Thursday,
            Self::Friday,
            Self::Saturday,
            Self::Sunday,
        ]
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> Self {
        day.index()
    }
}

impl TryFrom<u8> for Weekday {
    type Error = InvalidWeekdayError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::from_index(index)
    }
}

/// Error returned when a weekday index is outside 0-6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidWeekdayError {
    /// The rejected index.
    pub index: u8,
}

impl std::fmt::Display for InvalidWeekdayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid weekday index {}: expected 0-6", self.index)
    }
}

impl std::error::Error for InvalidWeekdayError {}

/// One of the four fixed six-hour windows of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shift {
    /// 00h-06h
    Dawn = 0,
    /// 06h-12h
    Morning = 1,
    /// 12h-18h
    Afternoon = 2,
    /// 18h-24h
    Night = 3,
}

impl Shift {
    /// Returns the 0-based shift index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Returns the first hour covered by this shift.
    #[must_use]
    pub const fn start_hour(self) -> u8 {
        self.index() * SLOTS_PER_SHIFT
    }

    /// Returns the hour of the given slot (0-5) within this shift.
    #[must_use]
    pub const fn hour_of_slot(self, slot: u8) -> u8 {
        self.start_hour() + slot
    }

    /// Returns the shift containing the given hour of day.
    #[must_use]
    pub const fn from_hour(hour: u8) -> Self {
        match hour {
            0..=5 => Self::Dawn,
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Night,
        }
    }

    /// Returns the Portuguese label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dawn => "Madrugada (00h-06h)",
            Self::Morning => "Manhã (06h-12h)",
            Self::Afternoon => "Tarde (12h-18h)",
            Self::Night => "Noite (18h-00h)",
        }
    }

    /// Returns all shifts in chronological order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Dawn, Self::Morning, Self::Afternoon, Self::Night]
    }
}

/// One historical crime incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Neighborhood (bairro) where the incident happened.
    pub neighborhood: String,
    /// Day of the week the incident happened.
    pub day: Weekday,
    /// Hour of day (0-23).
    pub hour: u8,
    /// Crime category label (natureza principal).
    pub category: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Street (logradouro).
    pub street: String,
    /// Calendar date of the incident, when the source provides one.
    pub occurred_on: Option<chrono::NaiveDate>,
}

/// Lookup key shared by the predictor, the historical frequency table and
/// the probability cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    /// Neighborhood name.
    pub neighborhood: String,
    /// Day of the week.
    pub day: Weekday,
    /// Hour of day (0-23).
    pub hour: u8,
}

impl SlotKey {
    /// Creates a key from its parts.
    #[must_use]
    pub fn new(neighborhood: &str, day: Weekday, hour: u8) -> Self {
        Self {
            neighborhood: neighborhood.to_string(),
            day,
            hour,
        }
    }
}

/// The most likely crime category for a key and its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// Predicted crime category.
    pub category: String,
    /// Probability of the predicted category, in `[0, 1]`.
    pub probability: f64,
}

/// A single 20-minute patrol assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatrolPoint {
    /// Day of the week of the assignment.
    pub day: Weekday,
    /// Start of the assignment, always on the hour.
    pub start_time: NaiveDateTime,
    /// End of the assignment ([`PATROL_DURATION_MINUTES`] after the start).
    pub end_time: NaiveDateTime,
    /// Neighborhood to patrol.
    pub neighborhood: String,
    /// Street to patrol.
    pub street: String,
    /// Latitude of the patrol point.
    pub latitude: f64,
    /// Longitude of the patrol point.
    pub longitude: f64,
    /// Rationale derived from the predicted category and blended probability.
    pub objective: String,
    /// Mission text.
    pub mission: String,
    /// Free-form note, empty when generated.
    pub note: String,
    /// 1-based position within the day, assigned at export time.
    pub visit_order: Option<u32>,
}

impl PatrolPoint {
    /// Creates a point starting at `start_time` and lasting
    /// [`PATROL_DURATION_MINUTES`].
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        day: Weekday,
        start_time: NaiveDateTime,
        neighborhood: String,
        street: String,
        latitude: f64,
        longitude: f64,
        objective: String,
        mission: String,
    ) -> Self {
        Self {
            day,
            start_time,
            end_time: start_time + Duration::minutes(PATROL_DURATION_MINUTES),
            neighborhood,
            street,
            latitude,
            longitude,
            objective,
            mission,
            note: String::new(),
            visit_order: None,
        }
    }

    /// Returns the ordering key `(day, start_time)`.
    #[must_use]
    pub const fn sort_key(&self) -> (Weekday, NaiveDateTime) {
        (self.day, self.start_time)
    }

    /// Formats the start time as `HH:MM`.
    #[must_use]
    pub fn start_hhmm(&self) -> String {
        self.start_time.format("%H:%M").to_string()
    }

    /// Formats the end time as `HH:MM`.
    #[must_use]
    pub fn end_hhmm(&self) -> String {
        self.end_time.format("%H:%M").to_string()
    }
}

/// A week of patrol points, ordered by `(day, start_time)`.
///
/// Serialized as a plain list of points. Deserialization goes through
/// [`PatrolSchedule::from_unsorted`], so the order holds for any input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PatrolPoint>", into = "Vec<PatrolPoint>")]
pub struct PatrolSchedule {
    points: Vec<PatrolPoint>,
}

impl From<Vec<PatrolPoint>> for PatrolSchedule {
    fn from(points: Vec<PatrolPoint>) -> Self {
        Self::from_unsorted(points)
    }
}

impl From<PatrolSchedule> for Vec<PatrolPoint> {
    fn from(schedule: PatrolSchedule) -> Self {
        schedule.points
    }
}

impl PatrolSchedule {
    /// Builds a schedule from points in any order.
    ///
    /// The sort is stable, so points sharing a key keep their input order.
    #[must_use]
    pub fn from_unsorted(mut points: Vec<PatrolPoint>) -> Self {
        points.sort_by_key(PatrolPoint::sort_key);
        Self { points }
    }

    /// Returns all points in schedule order.
    #[must_use]
    pub fn points(&self) -> &[PatrolPoint] {
        &self.points
    }

    /// Consumes the schedule, returning its points.
    #[must_use]
    pub fn into_points(self) -> Vec<PatrolPoint> {
        self.points
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the schedule has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the points scheduled on `day`.
    #[must_use]
    pub fn for_day(&self, day: Weekday) -> &[PatrolPoint] {
        let start = self.points.partition_point(|p| p.day < day);
        let end = self.points.partition_point(|p| p.day <= day);
        &self.points[start..end]
    }

    /// Iterates over the days that have at least one point, in week order.
    pub fn days(&self) -> impl Iterator<Item = (Weekday, &[PatrolPoint])> {
        Weekday::all()
            .iter()
            .map(|&day| (day, self.for_day(day)))
            .filter(|(_, points)| !points.is_empty())
    }

    /// Assigns each point its 1-based rank within its day.
    pub fn assign_visit_order(&mut self) {
        let mut current: Option<Weekday> = None;
        let mut rank = 0u32;
        for point in &mut self.points {
            if current != Some(point.day) {
                current = Some(point.day);
                rank = 0;
            }
            rank += 1;
            point.visit_order = Some(rank);
        }
    }

    /// Returns `true` if the points are in `(day, start_time)` order.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.points
            .windows(2)
            .all(|pair| pair[0].sort_key() <= pair[1].sort_key())
    }
}
