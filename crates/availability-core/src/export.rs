//! Tabular export of filtered availability rows
//!
//! Rows are written either as UTF-8 CSV prefixed with a byte-order mark
//! (so spreadsheet tools keep accented names intact) or as a single-sheet
//! XLSX workbook. Both formats share the same header row.

use std::str::FromStr;

use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};
use crate::types::NumberedRecord;

/// UTF-8 byte-order mark written at the start of CSV exports
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header row shared by every export format
pub const HEADERS: [&str; 18] = [
    "#",
    "Name",
    "ID",
    "Date",
    "Altitude",
    "Location",
    "Capacity",
    "Available",
    "Status",
    "Reported Date",
    "Room Type",
    "Total",
    "Taxes",
    "Fees",
    "Max Guests",
    "Short Description",
    "Long Description",
    "Image",
];

const SHEET_NAME: &str = "Availability";

/// Longest string a spreadsheet cell accepts, in characters
pub const XLSX_MAX_CELL_CHARS: usize = 32_767;

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Delimited text with a UTF-8 BOM
    Csv,
    /// Spreadsheet workbook
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(AvailabilityError::Config(format!(
                "unknown export format '{}'",
                other
            ))),
        }
    }
}

/// A named, downloadable export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// One exported line; field names are the column headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "#")]
    pub sequence: usize,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Altitude")]
    pub altitude: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Capacity")]
    pub capacity: Option<u32>,
    #[serde(rename = "Available")]
    pub available: Option<u32>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Reported Date")]
    pub reported_date: Option<String>,
    #[serde(rename = "Room Type")]
    pub room_type: Option<String>,
    #[serde(rename = "Total")]
    pub total: Option<f64>,
    #[serde(rename = "Taxes")]
    pub taxes: Option<f64>,
    #[serde(rename = "Fees")]
    pub fees: Option<f64>,
    #[serde(rename = "Max Guests")]
    pub max_guests: Option<u32>,
    #[serde(rename = "Short Description")]
    pub short_description: Option<String>,
    #[serde(rename = "Long Description")]
    pub long_description: Option<String>,
    #[serde(rename = "Image")]
    pub image: Option<String>,
}

impl From<&NumberedRecord> for ExportRow {
    fn from(numbered: &NumberedRecord) -> Self {
        let r = &numbered.record;
        Self {
            sequence: numbered.sequence,
            name: r.entity_name.clone(),
            id: r.entity_id.clone(),
            date: r.query_date.clone(),
            altitude: r.altitude.clone(),
            location: r.location.clone(),
            capacity: r.capacity,
            available: r.available,
            status: r.status.clone(),
            reported_date: r.reported_date.clone(),
            room_type: r.room_type.clone(),
            total: r.total,
            taxes: r.taxes,
            fees: r.fees,
            max_guests: r.max_guests,
            short_description: r.short_description.clone(),
            long_description: r.long_description.clone(),
            image: r.image.clone(),
        }
    }
}

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

impl ExportRow {
    /// Cells in [`HEADERS`] order
    fn cells(&self) -> [Cell<'_>; 18] {
        fn text(value: &Option<String>) -> Cell<'_> {
            value.as_deref().map_or(Cell::Empty, Cell::Text)
        }
        fn number<T: Into<f64> + Copy>(value: Option<T>) -> Cell<'static> {
            value.map_or(Cell::Empty, |v| Cell::Number(v.into()))
        }

        [
            Cell::Number(self.sequence as f64),
            Cell::Text(&self.name),
            text(&self.id),
            Cell::Text(&self.date),
            text(&self.altitude),
            text(&self.location),
            number(self.capacity),
            number(self.available),
            text(&self.status),
            text(&self.reported_date),
            text(&self.room_type),
            number(self.total),
            number(self.taxes),
            number(self.fees),
            number(self.max_guests),
            text(&self.short_description),
            text(&self.long_description),
            text(&self.image),
        ]
    }
}

/// Serialize filtered rows into a downloadable file named `<base_name>.<ext>`.
///
/// # Errors
/// - `AvailabilityError::EmptyResult` if `rows` is empty; no empty file is produced
/// - `AvailabilityError::Csv` / `AvailabilityError::Xlsx` if the writer fails
pub fn export(rows: &[NumberedRecord], format: ExportFormat, base_name: &str) -> Result<ExportFile> {
    if rows.is_empty() {
        return Err(AvailabilityError::EmptyResult);
    }

    let export_rows: Vec<ExportRow> = rows.iter().map(ExportRow::from).collect();
    let bytes = match format {
        ExportFormat::Csv => write_csv(&export_rows)?,
        ExportFormat::Xlsx => write_xlsx(&export_rows)?,
    };

    Ok(ExportFile {
        file_name: format!("{}.{}", base_name, format.extension()),
        mime_type: format.mime_type(),
        bytes,
    })
}

fn write_csv(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| AvailabilityError::Io(e.into_error()))
}

fn write_xlsx(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let line = index as u32 + 1;
        for (col, cell) in row.cells().into_iter().enumerate() {
            match cell {
                Cell::Text(value) => {
                    worksheet.write_string(line, col as u16, truncate_cell(value))?;
                }
                Cell::Number(value) => {
                    worksheet.write_number(line, col as u16, value)?;
                }
                Cell::Empty => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Cut `value` to [`XLSX_MAX_CELL_CHARS`] characters.
fn truncate_cell(value: &str) -> &str {
    match value.char_indices().nth(XLSX_MAX_CELL_CHARS) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AvailabilityRecord;

    fn rows() -> Vec<NumberedRecord> {
        vec![
            NumberedRecord {
                sequence: 1,
                record: AvailabilityRecord {
                    entity_name: "Refuge des Évettes".to_string(),
                    entity_id: Some("52".to_string()),
                    query_date: "14/06/2025".to_string(),
                    altitude: Some("2 590 m".to_string()),
                    location: Some("Haute-Maurienne, Vanoise".to_string()),
                    capacity: Some(73),
                    available: Some(12),
                    status: Some("12 places disponibles (14/06/2025)".to_string()),
                    reported_date: Some("14/06/2025".to_string()),
                    ..Default::default()
                },
            },
            NumberedRecord {
                sequence: 2,
                record: AvailabilityRecord {
                    entity_name: "Mandarin Oriental".to_string(),
                    query_date: "2025-06-15".to_string(),
                    room_type: Some("Deluxe \"Harbour\" View".to_string()),
                    total: Some(6210.5),
                    taxes: Some(564.6),
                    fees: Some(0.0),
                    max_guests: Some(3),
                    ..Default::default()
                },
            },
        ]
    }

    fn read_back(bytes: &[u8]) -> Vec<ExportRow> {
        let body = bytes.strip_prefix(UTF8_BOM).expect("missing BOM");
        csv::Reader::from_reader(body)
            .deserialize()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_csv_starts_with_bom_and_headers() {
        let file = export(&rows(), ExportFormat::Csv, "refuges").unwrap();
        assert!(file.bytes.starts_with(UTF8_BOM));

        let text = std::str::from_utf8(&file.bytes[UTF8_BOM.len()..]).unwrap();
        let header_line = text.lines().next().unwrap();
        assert_eq!(header_line, HEADERS.join(","));
        assert_eq!(file.file_name, "refuges.csv");
        assert_eq!(file.mime_type, "text/csv; charset=utf-8");
    }

    #[test]
    fn test_csv_round_trip_keeps_accents() {
        let original = rows();
        let file = export(&original, ExportFormat::Csv, "refuges").unwrap();
        let parsed = read_back(&file.bytes);

        let expected: Vec<ExportRow> = original.iter().map(ExportRow::from).collect();
        assert_eq!(parsed, expected);
        assert_eq!(parsed[0].name, "Refuge des Évettes");
        assert_eq!(parsed[0].location.as_deref(), Some("Haute-Maurienne, Vanoise"));
        assert_eq!(parsed[1].room_type.as_deref(), Some("Deluxe \"Harbour\" View"));
    }

    #[test]
    fn test_xlsx_is_zip_container() {
        let file = export(&rows(), ExportFormat::Xlsx, "hongkong_mandarin_oriental_availability").unwrap();
        assert!(file.bytes.starts_with(b"PK"));
        assert_eq!(file.file_name, "hongkong_mandarin_oriental_availability.xlsx");
        assert_eq!(
            file.mime_type,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn test_xlsx_truncates_oversized_cells() {
        let mut long = rows();
        long[0].record.long_description = Some("é".repeat(40_000));
        let file = export(&long, ExportFormat::Xlsx, "long").unwrap();
        assert!(file.bytes.starts_with(b"PK"));

        let text = "a".repeat(XLSX_MAX_CELL_CHARS + 5);
        assert_eq!(truncate_cell(&text).len(), XLSX_MAX_CELL_CHARS);
        assert_eq!(truncate_cell("short"), "short");
        assert_eq!(truncate_cell(&"é".repeat(40_000)).chars().count(), XLSX_MAX_CELL_CHARS);
    }

    #[test]
    fn test_empty_rows_report_no_results() {
        for format in [ExportFormat::Csv, ExportFormat::Xlsx] {
            assert!(matches!(
                export(&[], format, "empty"),
                Err(AvailabilityError::EmptyResult)
            ));
        }
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
