#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loads historical crime incidents from CSV exports.
//!
//! The header is validated before any row is read: a missing required
//! column is a [`ValidationError`] and nothing downstream runs. Rows whose
//! fields cannot be coerced are skipped and counted. The surviving records
//! are wrapped in an immutable [`Dataset`] that is shared read-only by the
//! predictor, the schedule generator and the reports.

pub mod parsing;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use patrol_card_incident_models::{IncidentRecord, Weekday};

/// Numeric day-of-week column (0 = Monday).
pub const COL_DAY_INDEX: &str = "DIA_SEMANA";
/// Portuguese weekday name column, used when [`COL_DAY_INDEX`] is absent.
pub const COL_DAY_NAME: &str = "DIA_DA_SEMANA_FATO";
/// Time of the incident (`HH:MM:SS`).
pub const COL_HOUR: &str = "HORARIO_FATO";
/// Neighborhood.
pub const COL_NEIGHBORHOOD: &str = "BAIRRO";
/// Street.
pub const COL_STREET: &str = "LOGRADOURO";
/// Latitude.
pub const COL_LATITUDE: &str = "LATITUDE";
/// Longitude.
pub const COL_LONGITUDE: &str = "LONGITUDE";
/// Crime category.
pub const COL_CATEGORY: &str = "DESCR_NATUREZA_PRINCIPAL";
/// Optional incident date (`dd/mm/YYYY`).
pub const COL_DATE: &str = "DATA_FATO";

/// Default field delimiter of incident exports.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Errors raised when the input cannot be used at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// One or more required columns are absent from the header.
    #[error("Missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Names of the missing columns.
        columns: Vec<String>,
    },

    /// No usable record remains.
    #[error("Dataset is empty")]
    EmptyDataset,
}

/// Errors that can occur while loading incidents.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// I/O error opening the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Reasons a single row is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, thiserror::Error)]
enum RowError {
    #[error("invalid day of week")]
    Day,
    #[error("invalid hour")]
    Hour,
    #[error("missing neighborhood")]
    Neighborhood,
    #[error("missing category")]
    Category,
    #[error("invalid coordinates")]
    Coordinates,
    #[error("invalid UTF-8")]
    Encoding,
}

/// Options for [`load_csv`] and [`load_from_reader`].
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// Column positions resolved from the header.
struct ColumnIndex {
    day: DayColumn,
    hour: usize,
    neighborhood: usize,
    street: usize,
    latitude: usize,
    longitude: usize,
    category: usize,
    date: Option<usize>,
}

enum DayColumn {
    Index(usize),
    Name(usize),
}

impl ColumnIndex {
    /// Resolves every required column, collecting all that are missing.
    fn resolve(headers: &csv::StringRecord) -> Result<Self, ValidationError> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let mut missing = Vec::new();
        let mut require = |name: &str| {
            let found = position(name);
            if found.is_none() {
                missing.push(name.to_string());
            }
            found.unwrap_or_default()
        };

        let day = match (position(COL_DAY_INDEX), position(COL_DAY_NAME)) {
            (Some(i), _) => DayColumn::Index(i),
            (None, Some(i)) => DayColumn::Name(i),
            (None, None) => {
                require(COL_DAY_INDEX);
                DayColumn::Index(0)
            }
        };

        let columns = Self {
            day,
            hour: require(COL_HOUR),
            neighborhood: require(COL_NEIGHBORHOOD),
            street: require(COL_STREET),
            latitude: require(COL_LATITUDE),
            longitude: require(COL_LONGITUDE),
            category: require(COL_CATEGORY),
            date: position(COL_DATE),
        };

        if missing.is_empty() {
            Ok(columns)
        } else {
            Err(ValidationError::MissingColumns { columns: missing })
        }
    }

    fn parse_row(&self, row: &csv::ByteRecord) -> Result<IncidentRecord, RowError> {
        let fields = row
            .iter()
            .map(std::str::from_utf8)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| RowError::Encoding)?;
        let field = |i: usize| fields.get(i).copied().unwrap_or_default();

        let day = match self.day {
            DayColumn::Index(i) => parsing::parse_weekday_index(field(i)),
            DayColumn::Name(i) => parsing::parse_weekday_name(field(i)),
        }
        .ok_or(RowError::Day)?;
        let hour = parsing::parse_hour(field(self.hour)).ok_or(RowError::Hour)?;
        let neighborhood =
            parsing::non_empty(field(self.neighborhood)).ok_or(RowError::Neighborhood)?;
        let category = parsing::non_empty(field(self.category)).ok_or(RowError::Category)?;
        let latitude = parsing::parse_coordinate(field(self.latitude)).ok_or(RowError::Coordinates)?;
        let longitude =
            parsing::parse_coordinate(field(self.longitude)).ok_or(RowError::Coordinates)?;

        Ok(IncidentRecord {
            neighborhood,
            day,
            hour,
            category,
            latitude,
            longitude,
            street: field(self.street).trim().to_string(),
            occurred_on: self.date.and_then(|i| parsing::parse_date(field(i))),
        })
    }
}

/// Loads incidents from a CSV file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read, is not valid CSV,
/// lacks a required column, or has no usable rows.
pub fn load_csv(path: &Path, options: LoadOptions) -> Result<Dataset, IngestError> {
    log::info!("Loading incidents from {}", path.display());
    let file = std::fs::File::open(path)?;
    load_from_reader(file, options)
}

/// Loads incidents from any CSV reader.
///
/// # Errors
///
/// Returns [`IngestError`] if the input is not valid CSV, lacks a required
/// column, or has no usable rows. Rows that are not valid UTF-8 are skipped
/// like any other unparseable row.
pub fn load_from_reader<R: Read>(reader: R, options: LoadOptions) -> Result<Dataset, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnIndex::resolve(reader.headers()?)?;

    let mut records = Vec::new();
    let mut skipped: BTreeMap<RowError, u64> = BTreeMap::new();

    for row in reader.byte_records() {
        let row = row?;
        match columns.parse_row(&row) {
            Ok(record) => records.push(record),
            Err(reason) => *skipped.entry(reason).or_default() += 1,
        }
    }

    for (reason, count) in &skipped {
        log::warn!("Skipped {count} rows: {reason}");
    }

    let dataset = Dataset::new(records)?;
    log::info!(
        "Loaded {} incidents across {} neighborhoods",
        dataset.len(),
        dataset.neighborhoods().len()
    );
    Ok(dataset)
}

struct DatasetInner {
    records: Vec<IncidentRecord>,
    neighborhoods: Vec<String>,
    by_neighborhood: BTreeMap<String, Vec<usize>>,
}

/// An immutable snapshot of historical incidents.
///
/// Cloning is cheap: clones share the same records.
#[derive(Clone)]
pub struct Dataset {
    inner: Arc<DatasetInner>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("records", &self.inner.records.len())
            .field("neighborhoods", &self.inner.neighborhoods.len())
            .finish()
    }
}

impl Dataset {
    /// Builds a dataset from already-parsed records.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDataset`] if `records` is empty.
    pub fn new(records: Vec<IncidentRecord>) -> Result<Self, ValidationError> {
        if records.is_empty() {
            return Err(ValidationError::EmptyDataset);
        }

        let mut by_neighborhood: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            by_neighborhood
                .entry(record.neighborhood.clone())
                .or_default()
                .push(i);
        }
        let neighborhoods = by_neighborhood.keys().cloned().collect();

        Ok(Self {
            inner: Arc::new(DatasetInner {
                records,
                neighborhoods,
                by_neighborhood,
            }),
        })
    }

    /// Returns all records.
    #[must_use]
    pub fn records(&self) -> &[IncidentRecord] {
        &self.inner.records
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.records.len()
    }

    /// Always `false`: [`Dataset::new`] rejects an empty record list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.records.is_empty()
    }

    /// Returns the distinct neighborhoods, sorted.
    #[must_use]
    pub fn neighborhoods(&self) -> &[String] {
        &self.inner.neighborhoods
    }

    /// Returns the records located in `neighborhood`.
    pub fn records_in<'a>(
        &'a self,
        neighborhood: &str,
    ) -> impl Iterator<Item = &'a IncidentRecord> + use<'a> {
        self.inner
            .by_neighborhood
            .get(neighborhood)
            .into_iter()
            .flatten()
            .map(|&i| &self.inner.records[i])
    }

    /// Returns the number of records located in `neighborhood`.
    #[must_use]
    pub fn count_in(&self, neighborhood: &str) -> usize {
        self.inner
            .by_neighborhood
            .get(neighborhood)
            .map_or(0, Vec::len)
    }

    /// Returns the records that fall on `day`.
    pub fn records_on(&self, day: Weekday) -> impl Iterator<Item = &IncidentRecord> {
        self.inner.records.iter().filter(move |r| r.day == day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "DATA_FATO;HORARIO_FATO;DIA_DA_SEMANA_FATO;BAIRRO;LOGRADOURO;LATITUDE;LONGITUDE;DESCR_NATUREZA_PRINCIPAL";

    fn load(body: &str) -> Result<Dataset, IngestError> {
        load_from_reader(body.as_bytes(), LoadOptions::default())
    }

    #[test]
    fn loads_brazilian_export() {
        let csv = format!(
            "{HEADER}\n\
             04/03/2024;10:15:00;SEGUNDA-FEIRA;Centro;Rua Direita;-16,36506;-46,9020118;FURTO\n\
             05/03/2024;22:40:00;TERÇA-FEIRA;Vila Nova;Av. Brasil;-16,37;-46,91;ROUBO\n"
        );
        let dataset = load(&csv).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.neighborhoods(), ["Centro", "Vila Nova"]);

        let first = &dataset.records()[0];
        assert_eq!(first.day, Weekday::Monday);
        assert_eq!(first.hour, 10);
        assert_eq!(first.street, "Rua Direita");
        assert_eq!(first.category, "FURTO");
        assert!((first.latitude - -16.365_06).abs() < f64::EPSILON);
        assert_eq!(
            first.occurred_on,
            chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
        );
    }

    #[test]
    fn accepts_numeric_day_column() {
        let csv = "DIA_SEMANA;HORARIO_FATO;BAIRRO;LOGRADOURO;LATITUDE;LONGITUDE;DESCR_NATUREZA_PRINCIPAL\n\
                   6;03:00:00;Centro;Rua A;-16.1;-46.2;FURTO\n";
        let dataset = load(csv).unwrap();
        assert_eq!(dataset.records()[0].day, Weekday::Sunday);
        assert_eq!(dataset.records()[0].occurred_on, None);
    }

    #[test]
    fn missing_latitude_column_is_a_validation_error() {
        let csv = "DIA_SEMANA;HORARIO_FATO;BAIRRO;LOGRADOURO;LONGITUDE;DESCR_NATUREZA_PRINCIPAL\n\
                   0;10:00:00;Centro;Rua A;-46.2;FURTO\n";
        let err = load(csv).unwrap_err();
        match err {
            IngestError::Validation(ValidationError::MissingColumns { columns }) => {
                assert_eq!(columns, vec!["LATITUDE".to_string()]);
            }
            other => panic!("expected missing column error, got {other:?}"),
        }
    }

    #[test]
    fn reports_every_missing_column() {
        let csv = "BAIRRO;LOGRADOURO\nCentro;Rua A\n";
        let IngestError::Validation(ValidationError::MissingColumns { columns }) =
            load(csv).unwrap_err()
        else {
            panic!("expected missing columns");
        };
        assert!(columns.contains(&"DIA_SEMANA".to_string()));
        assert!(columns.contains(&"HORARIO_FATO".to_string()));
        assert!(columns.contains(&"LATITUDE".to_string()));
        assert!(columns.contains(&"LONGITUDE".to_string()));
        assert!(columns.contains(&"DESCR_NATUREZA_PRINCIPAL".to_string()));
        assert!(!columns.contains(&"BAIRRO".to_string()));
    }

    #[test]
    fn header_only_input_is_empty() {
        let err = load(&format!("{HEADER}\n")).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Validation(ValidationError::EmptyDataset)
        ));
    }

    #[test]
    fn skips_unparseable_rows() {
        let csv = format!(
            "{HEADER}\n\
             04/03/2024;10:15:00;SEGUNDA-FEIRA;Centro;Rua A;-16,3;-46,9;FURTO\n\
             04/03/2024;xx;SEGUNDA-FEIRA;Centro;Rua A;-16,3;-46,9;FURTO\n\
             04/03/2024;10:15:00;FERIADO;Centro;Rua A;-16,3;-46,9;FURTO\n\
             04/03/2024;10:15:00;SEGUNDA-FEIRA;;Rua A;-16,3;-46,9;FURTO\n\
             04/03/2024;10:15:00;SEGUNDA-FEIRA;Centro;Rua A;;-46,9;FURTO\n"
        );
        let dataset = load(&csv).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn skips_rows_that_are_not_utf8() {
        let mut csv = format!(
            "{HEADER}\n\
             04/03/2024;10:15:00;SEGUNDA-FEIRA;Centro;Rua A;-16,3;-46,9;FURTO\n"
        )
        .into_bytes();
        csv.extend_from_slice(b"05/03/2024;11:00:00;TER\xC7A-FEIRA;Centro;Rua B;-16,3;-46,9;ROUBO\n");
        csv.extend_from_slice(
            "06/03/2024;12:00:00;QUARTA-FEIRA;Jardim;Rua C;-16,4;-46,8;FURTO\n".as_bytes(),
        );

        let dataset = load_from_reader(csv.as_slice(), LoadOptions::default()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].day, Weekday::Monday);
        assert_eq!(dataset.records()[1].day, Weekday::Wednesday);
    }

    #[test]
    fn accepts_utf8_bom_header() {
        let csv = format!(
            "\u{feff}{HEADER}\n\
             04/03/2024;10:15:00;SEGUNDA-FEIRA;Centro;Rua A;-16,3;-46,9;FURTO\n"
        );
        assert_eq!(load(&csv).unwrap().len(), 1);
    }

    #[test]
    fn indexes_records_by_neighborhood() {
        let csv = format!(
            "{HEADER}\n\
             04/03/2024;10:15:00;SEGUNDA-FEIRA;Centro;Rua A;-16,3;-46,9;FURTO\n\
             04/03/2024;11:15:00;SEGUNDA-FEIRA;Jardim;Rua B;-16,4;-46,8;ROUBO\n\
             05/03/2024;12:15:00;TERÇA-FEIRA;Centro;Rua C;-16,5;-46,7;FURTO\n"
        );
        let dataset = load(&csv).unwrap();

        let streets: Vec<_> = dataset
            .records_in("Centro")
            .map(|r| r.street.as_str())
            .collect();
        assert_eq!(streets, vec!["Rua A", "Rua C"]);
        assert_eq!(dataset.count_in("Jardim"), 1);
        assert_eq!(dataset.count_in("Nowhere"), 0);
        assert_eq!(dataset.records_in("Nowhere").count(), 0);
        assert_eq!(dataset.records_on(Weekday::Tuesday).count(), 1);
    }

    #[test]
    fn empty_record_list_is_rejected() {
        assert_eq!(Dataset::new(Vec::new()).unwrap_err(), ValidationError::EmptyDataset);
    }
}
