//! Tabular extraction - statement file bytes to row records
//!
//! Two layouts are understood:
//! - spreadsheets (`.xlsx`, `.xls`): first sheet only, the header row is
//!   discovered by looking for the description column within the first
//!   rows, since banks prepend titles and account metadata;
//! - delimited text (`.csv`): the first line is a title and is dropped,
//!   the second line is the header.
//!
//! Cells are returned uninterpreted; dates and amounts are the
//! normalizer's job.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{CellValue, RowRecord};

/// Header text identifying the description column, and the header row
pub const HEADER_MARKER: &str = "Beskrivning";

/// Spreadsheet rows searched for the header before giving up
pub const HEADER_SCAN_ROWS: usize = 15;

/// Statement layouts the extractor can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementFormat {
    Spreadsheet,
    Delimited,
}

impl StatementFormat {
    /// Pick a layout from the text after the last `.` of the file name
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = filename.rsplit('.').next().unwrap_or_default().to_lowercase();
        match extension.as_str() {
            "xlsx" | "xls" => Ok(StatementFormat::Spreadsheet),
            "csv" => Ok(StatementFormat::Delimited),
            _ => Err(Error::UnsupportedFormat(extension)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementFormat::Spreadsheet => "spreadsheet",
            StatementFormat::Delimited => "delimited",
        }
    }
}

/// Reads statement files into row records
#[derive(Debug, Clone)]
pub struct TabularExtractor {
    delimiter: u8,
}

impl Default for TabularExtractor {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl TabularExtractor {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Extract row records from a statement buffer
    ///
    /// Fails on an unknown extension, an unreadable workbook, a missing
    /// header row or malformed delimited text.
    pub fn extract(&self, buffer: &[u8], filename: &str) -> Result<Vec<RowRecord>> {
        let rows = match StatementFormat::from_filename(filename)? {
            StatementFormat::Spreadsheet => extract_spreadsheet(buffer)?,
            StatementFormat::Delimited => self.extract_delimited(buffer)?,
        };
        tracing::debug!(rows = rows.len(), "extracted statement rows");
        Ok(rows)
    }

    fn extract_delimited(&self, buffer: &[u8]) -> Result<Vec<RowRecord>> {
        let text = String::from_utf8_lossy(buffer);
        let body = text.split_once('\n').map(|(_, rest)| rest).unwrap_or_default();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: RowRecord = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.to_string(), text_cell(value)))
                .collect();
            if has_description(&row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

fn extract_spreadsheet(buffer: &[u8]) -> Result<Vec<RowRecord>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(buffer.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Spreadsheet("Workbook has no sheets".to_string()))??;
    rows_from_range(&range)
}

/// Locate the header row in a sheet and key the rows below it
pub(crate) fn rows_from_range(range: &Range<Data>) -> Result<Vec<RowRecord>> {
    let rows: Vec<&[Data]> = range.rows().collect();

    let header_idx = rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| {
            row.iter()
                .any(|cell| cell_value(cell).to_string().contains(HEADER_MARKER))
        })
        .ok_or(Error::HeaderNotFound {
            scanned: rows.len().min(HEADER_SCAN_ROWS),
        })?;

    let headers: Vec<String> = rows[header_idx]
        .iter()
        .map(|cell| cell_value(cell).to_string())
        .collect();

    let records = rows[header_idx + 1..]
        .iter()
        .map(|row| {
            headers
                .iter()
                .zip(row.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell_value(cell)))
                .collect::<RowRecord>()
        })
        .filter(has_description)
        .collect();

    Ok(records)
}

/// Spreadsheet cell to engine cell; date cells keep their serial number
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => text_cell(s),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

fn text_cell(value: &str) -> CellValue {
    if value.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(value.to_string())
    }
}

fn has_description(row: &RowRecord) -> bool {
    row.get(HEADER_MARKER).is_some_and(CellValue::is_present)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    /// Build a sheet from rows of cells, starting at A1
    fn sheet(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(
            StatementFormat::from_filename("Kontoutdrag.XLSX").unwrap(),
            StatementFormat::Spreadsheet
        );
        assert_eq!(
            StatementFormat::from_filename("export.2025.xls").unwrap(),
            StatementFormat::Spreadsheet
        );
        assert_eq!(
            StatementFormat::from_filename("trans.csv").unwrap(),
            StatementFormat::Delimited
        );
        assert!(matches!(
            StatementFormat::from_filename("statement.pdf"),
            Err(Error::UnsupportedFormat(ext)) if ext == "pdf"
        ));
        assert!(StatementFormat::from_filename("no_extension").is_err());
    }

    #[test]
    fn test_header_found_below_title_rows() {
        let range = sheet(vec![
            vec![text("Kontoutdrag"), Data::Empty, Data::Empty],
            vec![text("Konto: 1234"), Data::Empty, Data::Empty],
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![text("Bokföringsdag"), text("Beskrivning"), text("Belopp")],
            vec![Data::Float(45667.0), text("ICA MAXI"), Data::Float(-120.5)],
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![text("2025-01-11"), text("Lön"), Data::Int(25000)],
        ]);

        let rows = rows_from_range(&range).unwrap();
        assert_eq!(rows.len(), 2, "blank separator row is dropped");
        assert_eq!(rows[0]["Beskrivning"], CellValue::Text("ICA MAXI".into()));
        assert_eq!(rows[0]["Bokföringsdag"], CellValue::Number(45667.0));
        assert_eq!(rows[0]["Belopp"], CellValue::Number(-120.5));
        assert_eq!(rows[1]["Belopp"], CellValue::Number(25000.0));
    }

    #[test]
    fn test_header_marker_matches_substring() {
        let range = sheet(vec![
            vec![text("Datum"), text("Beskrivning av köp"), text("Belopp")],
            vec![text("2025-01-01"), text("x"), Data::Float(1.0)],
        ]);
        // Header is found, but rows are keyed by the full header text
        let rows = rows_from_range(&range).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_header_not_found_within_window() {
        let mut rows: Vec<Vec<Data>> = (0..HEADER_SCAN_ROWS)
            .map(|i| vec![text(&format!("rad {}", i))])
            .collect();
        rows.push(vec![text("Beskrivning")]);
        let range = sheet(rows);

        match rows_from_range(&range) {
            Err(Error::HeaderNotFound { scanned }) => assert_eq!(scanned, HEADER_SCAN_ROWS),
            other => panic!("expected HeaderNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_header_on_last_scanned_row() {
        let mut rows: Vec<Vec<Data>> = (0..HEADER_SCAN_ROWS - 1)
            .map(|_| vec![Data::Empty, Data::Empty])
            .collect();
        rows.push(vec![text("Beskrivning"), text("Belopp")]);
        rows.push(vec![text("Hyra"), Data::Float(-9000.0)]);

        let records = rows_from_range(&sheet(rows)).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_unreadable_workbook_is_fatal() {
        let extractor = TabularExtractor::default();
        let result = extractor.extract(b"this is not a workbook", "statement.xlsx");
        assert!(matches!(result, Err(Error::Spreadsheet(_))));
    }

    #[test]
    fn test_delimited_drops_title_line() {
        let csv = "Transaktioner 2025-01-01 - 2025-01-31\n\
                   Bokföringsdag,Beskrivning,Belopp,Referens\n\
                   2025-01-10,ICA MAXI,\"-120,50\",123\n\
                   \n\
                   2025-01-11, Lön ,25000,\n";
        let rows = TabularExtractor::default()
            .extract(csv.as_bytes(), "export.csv")
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Belopp"], CellValue::Text("-120,50".into()));
        assert_eq!(rows[0]["Referens"], CellValue::Text("123".into()));
        assert_eq!(rows[1]["Beskrivning"], CellValue::Text("Lön".into()));
        assert_eq!(rows[1]["Referens"], CellValue::Empty);
    }

    #[test]
    fn test_delimited_custom_delimiter() {
        let csv = "Titel\r\nBokföringsdag;Beskrivning;Belopp\r\n2025-02-01;Hyra;-9000,00\r\n";
        let rows = TabularExtractor::new(b';')
            .extract(csv.as_bytes(), "export.csv")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Belopp"], CellValue::Text("-9000,00".into()));
    }

    #[test]
    fn test_delimited_ragged_record_is_fatal() {
        let csv = "Titel\nBeskrivning,Belopp\nHyra,-9000,extra\n";
        let result = TabularExtractor::default().extract(csv.as_bytes(), "x.csv");
        assert!(matches!(result, Err(Error::Csv(_))));
    }

    #[test]
    fn test_delimited_title_only() {
        let rows = TabularExtractor::default()
            .extract(b"Just a title", "x.csv")
            .unwrap();
        assert!(rows.is_empty());
    }
}
