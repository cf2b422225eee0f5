//! Multi-sheet spreadsheet rendering of a [`PatrolSchedule`].
//!
//! One sheet per day that has at least one point, named after the day
//! (`Segunda` .. `Domingo`). Each sheet has a header row followed by one
//! row per point in schedule order, and every column is sized to its
//! longest rendered value.

use std::path::Path;

use patrol_card_incident_models::{PatrolPoint, PatrolSchedule, Weekday};
use rust_xlsxwriter::{Format, Workbook};

use crate::ExportError;

/// Column headers, in output order.
pub const HEADERS: [&str; 11] = [
    "ORDEM_OCUPACAO",
    "DIA_SEMANA",
    "HORARIO_INICIO",
    "HORARIO_TERMINO",
    "BAIRRO",
    "LOGRADOURO",
    "LATITUDE",
    "LONGITUDE",
    "OBJETIVO",
    "MISSAO",
    "OBSERVACAO",
];

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Text cell.
    Text(String),
    /// Numeric cell.
    Number(f64),
}

impl CellValue {
    /// Returns the text the cell displays, used for column sizing.
    #[must_use]
    pub fn rendered(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Everything needed to write one day's sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    /// The day this sheet covers.
    pub day: Weekday,
    /// Sheet title.
    pub name: String,
    /// Data rows, header excluded.
    pub rows: Vec<[CellValue; HEADERS.len()]>,
    /// Column widths, header included in the sizing.
    pub widths: [f64; HEADERS.len()],
}

/// Returns the width for a column whose longest value has `max_chars`
/// characters.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn column_width(max_chars: usize) -> f64 {
    (max_chars + 2) as f64 * 1.2
}

fn row_for(point: &PatrolPoint, visit_order: u32) -> [CellValue; HEADERS.len()] {
    [
        CellValue::Number(f64::from(visit_order)),
        CellValue::Number(f64::from(point.day.index())),
        CellValue::Text(point.start_hhmm()),
        CellValue::Text(point.end_hhmm()),
        CellValue::Text(point.neighborhood.clone()),
        CellValue::Text(point.street.clone()),
        CellValue::Number(point.latitude),
        CellValue::Number(point.longitude),
        CellValue::Text(point.objective.clone()),
        CellValue::Text(point.mission.clone()),
        CellValue::Text(point.note.clone()),
    ]
}

/// Lays out the sheets for `schedule` without touching the filesystem.
///
/// The visit order of each row is its 1-based rank within the day.
#[must_use]
pub fn build_sheets(schedule: &PatrolSchedule) -> Vec<SheetData> {
    schedule
        .days()
        .map(|(day, points)| {
            let rows: Vec<_> = (1u32..)
                .zip(points)
                .map(|(rank, point)| row_for(point, rank))
                .collect();

            let widths = std::array::from_fn(|col| {
                let longest = rows
                    .iter()
                    .map(|row| row[col].rendered().chars().count())
                    .chain(std::iter::once(HEADERS[col].chars().count()))
                    .max()
                    .unwrap_or(0);
                column_width(longest)
            });

            SheetData {
                day,
                name: day.to_string(),
                rows,
                widths,
            }
        })
        .collect()
}

/// Assigns visit order to `schedule` and writes it to `path` as `.xlsx`.
///
/// # Errors
///
/// * [`ExportError::Xlsx`] if the workbook cannot be built or saved
/// * [`ExportError::EmptySchedule`] if there is nothing to write
pub fn write_workbook(schedule: &mut PatrolSchedule, path: &Path) -> Result<(), ExportError> {
    if schedule.is_empty() {
        return Err(ExportError::EmptySchedule);
    }

    schedule.assign_visit_order();
    let sheets = build_sheets(schedule);

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in &sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (col, header) in (0u16..).zip(HEADERS) {
            worksheet.write_string_with_format(0, col, header, &header_format)?;
        }

        for (row, cells) in (1u32..).zip(&sheet.rows) {
            for (col, cell) in (0u16..).zip(cells) {
                match cell {
                    CellValue::Text(text) => {
                        worksheet.write_string(row, col, text)?;
                    }
                    CellValue::Number(number) => {
                        worksheet.write_number(row, col, *number)?;
                    }
                }
            }
        }

        for (col, width) in (0u16..).zip(sheet.widths) {
            worksheet.set_column_width(col, width)?;
        }

        log::debug!("Sheet {}: {} rows", sheet.name, sheet.rows.len());
    }

    workbook.save(path)?;
    log::info!(
        "Wrote {} patrol points across {} sheets to {}",
        schedule.len(),
        sheets.len(),
        path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn point(day: Weekday, hour: u32, neighborhood: &str) -> PatrolPoint {
        PatrolPoint::new(
            day,
            NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            neighborhood.to_string(),
            "Rua Direita".to_string(),
            -16.36506,
            -46.902_011_8,
            format!("Alta probabilidade de FURTO na região no {day} às {hour}:00. Probabilidade: 0.50"),
            format!("Patrulhamento preventivo em {neighborhood}"),
        )
    }

    fn schedule() -> PatrolSchedule {
        PatrolSchedule::from_unsorted(vec![
            point(Weekday::Friday, 7, "Centro"),
            point(Weekday::Monday, 3, "Jardim"),
            point(Weekday::Monday, 1, "Centro"),
            point(Weekday::Monday, 2, "Vila Nova"),
        ])
    }

    #[test]
    fn one_sheet_per_non_empty_day() {
        let sheets = build_sheets(&schedule());

        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Segunda", "Sexta"]);
        assert_eq!(sheets[0].rows.len(), 3);
        assert_eq!(sheets[1].rows.len(), 1);
    }

    #[test]
    fn visit_order_is_contiguous_per_sheet() {
        for sheet in build_sheets(&schedule()) {
            let orders: Vec<CellValue> = sheet.rows.iter().map(|row| row[0].clone()).collect();
            #[allow(clippy::cast_precision_loss)]
            let expected: Vec<CellValue> = (1..=sheet.rows.len())
                .map(|n| CellValue::Number(n as f64))
                .collect();
            assert_eq!(orders, expected);
        }
    }

    #[test]
    fn rows_follow_schedule_order() {
        let sheets = build_sheets(&schedule());
        let starts: Vec<String> = sheets[0].rows.iter().map(|row| row[2].rendered()).collect();
        assert_eq!(starts, vec!["01:00", "02:00", "03:00"]);
        let ends: Vec<String> = sheets[0].rows.iter().map(|row| row[3].rendered()).collect();
        assert_eq!(ends, vec!["01:20", "02:20", "03:20"]);
        assert_eq!(sheets[0].rows[0][1], CellValue::Number(0.0));
        assert_eq!(sheets[1].rows[0][1], CellValue::Number(4.0));
    }

    #[test]
    fn widths_fit_longest_value() {
        let sheets = build_sheets(&schedule());
        let widths = sheets[0].widths;

        // Header "ORDEM_OCUPACAO" is longer than any visit order.
        assert!((widths[0] - column_width("ORDEM_OCUPACAO".len())).abs() < 1e-9);
        // "Vila Nova" is the longest neighborhood and longer than "BAIRRO".
        assert!((widths[4] - column_width("Vila Nova".len())).abs() < 1e-9);
        let objective = sheets[0].rows[0][8].rendered();
        assert!((widths[8] - column_width(objective.chars().count())).abs() < 1e-9);
        assert!((column_width(10) - 14.4).abs() < 1e-9);
    }

    fn read_entry(archive: &mut zip::ZipArchive<std::fs::File>, name: &str) -> String {
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut archive.by_name(name).unwrap(), &mut xml).unwrap();
        xml
    }

    #[test]
    fn writes_workbook_and_assigns_visit_order() {
        let dir = std::env::temp_dir().join("patrol_card_export_xlsx_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cartao_programa.xlsx");
        let mut schedule = schedule();

        write_workbook(&mut schedule, &path).unwrap();

        let orders: Vec<Option<u32>> = schedule.points().iter().map(|p| p.visit_order).collect();
        assert_eq!(orders, vec![Some(1), Some(2), Some(3), Some(1)]);

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let workbook = read_entry(&mut archive, "xl/workbook.xml");
        let monday = workbook.find(r#"name="Segunda""#).unwrap();
        let friday = workbook.find(r#"name="Sexta""#).unwrap();
        assert!(monday < friday);
        assert!(!workbook.contains(r#"name="Terça""#));

        // One header row plus one row per point.
        let rows = |xml: &str| xml.matches("<row ").count();
        assert_eq!(rows(&read_entry(&mut archive, "xl/worksheets/sheet1.xml")), 4);
        assert_eq!(rows(&read_entry(&mut archive, "xl/worksheets/sheet2.xml")), 2);
        assert!(archive.by_name("xl/worksheets/sheet3.xml").is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let path = std::env::temp_dir()
            .join("patrol_card_export_missing_dir")
            .join("nested")
            .join("cartao.xlsx");
        let err = write_workbook(&mut schedule(), &path).unwrap_err();
        assert!(matches!(err, ExportError::Xlsx(_)));
    }

    #[test]
    fn empty_schedule_is_rejected() {
        let path = std::env::temp_dir().join("patrol_card_empty.xlsx");
        let err = write_workbook(&mut PatrolSchedule::default(), &path).unwrap_err();
        assert!(matches!(err, ExportError::EmptySchedule));
    }
}
