//! Transaction normalization - row records to canonical transactions
//!
//! Banks spell their headers differently, so each logical field is
//! resolved by probing a fixed list of accepted column names. Rows that
//! cannot be normalized are skipped, never reported as errors.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use crate::domain::{CanonicalTransaction, CellValue, RowRecord};
use super::extract::HEADER_MARKER;

/// Accepted names for the booking date column
pub const DATE_COLUMNS: &[&str] = &["Bokföringsdag", "Bokforingsdag", "Transaktionsdag"];

/// Accepted names for the description column
pub const DESCRIPTION_COLUMNS: &[&str] = &[HEADER_MARKER];

/// Accepted names for the amount column (some exports pad the header)
pub const AMOUNT_COLUMNS: &[&str] = &["Belopp", "Belopp "];

/// Accepted names for the reference column
pub const REFERENCE_COLUMNS: &[&str] = &["Referens"];

/// First alias whose cell has content
fn probe<'a>(row: &'a RowRecord, aliases: &[&str]) -> Option<&'a CellValue> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .find(|cell| cell.is_present())
}

/// Normalize one row, or `None` when date, description or amount is
/// missing or unreadable
pub fn normalize(row: &RowRecord) -> Option<CanonicalTransaction> {
    let date = match probe(row, DATE_COLUMNS)? {
        CellValue::Number(serial) => excel_serial_to_date(*serial)?,
        CellValue::Text(text) => text.chars().take(10).collect(),
        CellValue::Empty => return None,
    };

    let description = probe(row, DESCRIPTION_COLUMNS)?.to_string().trim().to_string();
    if description.is_empty() {
        return None;
    }

    let amount = match probe(row, AMOUNT_COLUMNS)? {
        CellValue::Number(n) => Decimal::try_from(*n).ok()?,
        CellValue::Text(text) => parse_amount_text(text)?,
        CellValue::Empty => return None,
    };

    let reference = probe(row, REFERENCE_COLUMNS).map(|cell| cell.to_string());

    Some(CanonicalTransaction::new(
        date,
        description,
        amount,
        reference,
        row.clone(),
    ))
}

/// Normalize every row, dropping the ones that fail
pub fn normalize_all(rows: &[RowRecord]) -> Vec<CanonicalTransaction> {
    let transactions: Vec<CanonicalTransaction> = rows.iter().filter_map(normalize).collect();
    let skipped = rows.len() - transactions.len();
    if skipped > 0 {
        tracing::debug!(skipped, "skipped rows missing date, description or amount");
    }
    transactions
}

/// Parse an amount written with a decimal comma, e.g. `"-1 234,50"`
///
/// All whitespace is removed and the first comma becomes a period.
pub fn parse_amount_text(text: &str) -> Option<Decimal> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = compact.replacen(',', ".", 1);
    Decimal::from_str(&normalized).ok()
}

/// Convert a spreadsheet date serial to `YYYY-MM-DD`
///
/// Serial 1 is 1900-01-01 under the spreadsheet leap-year quirk, so the
/// epoch is 1899-12-30. The fractional part (time of day) is dropped.
pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_days(Days::new(serial.floor() as u64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, CellValue)]) -> RowRecord {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0).unwrap(), "2025-01-10");
        assert_eq!(excel_serial_to_date(45667.75).unwrap(), "2025-01-10");
        assert_eq!(excel_serial_to_date(61.0).unwrap(), "1900-03-01");
        assert!(excel_serial_to_date(-1.0).is_none());
        assert!(excel_serial_to_date(f64::NAN).is_none());
    }

    #[test]
    fn test_parse_amount_text() {
        assert_eq!(parse_amount_text("-120,50"), Some(Decimal::new(-12050, 2)));
        assert_eq!(parse_amount_text("-1 234,50"), Some(Decimal::new(-123450, 2)));
        assert_eq!(parse_amount_text("1\u{a0}000"), Some(Decimal::new(1000, 0)));
        assert_eq!(parse_amount_text("99.95"), Some(Decimal::new(9995, 2)));
        assert_eq!(parse_amount_text("12,5,0"), None);
        assert_eq!(parse_amount_text("abc"), None);
        assert_eq!(parse_amount_text(""), None);
    }

    #[test]
    fn test_normalize_spreadsheet_row() {
        let r = row(&[
            ("Bokföringsdag", CellValue::Number(45667.0)),
            ("Beskrivning", text("  ICA MAXI STORMARKNAD ")),
            ("Belopp", CellValue::Number(-120.5)),
            ("Referens", CellValue::Number(5501.0)),
        ]);

        let tx = normalize(&r).unwrap();
        assert_eq!(tx.date, "2025-01-10");
        assert_eq!(tx.description, "ICA MAXI STORMARKNAD");
        assert_eq!(tx.amount, Decimal::new(-1205, 1));
        assert_eq!(tx.reference.as_deref(), Some("5501"));
        assert!(!tx.is_duplicate);
        assert!(!tx.has_suggestion());
        assert_eq!(tx.original_row, r);
    }

    #[test]
    fn test_normalize_text_row_with_aliases() {
        let r = row(&[
            ("Bokforingsdag", CellValue::Empty),
            ("Transaktionsdag", text("2025-03-15T10:22:00")),
            ("Beskrivning", text("Spotify")),
            ("Belopp ", text("-119,00")),
        ]);

        let tx = normalize(&r).unwrap();
        assert_eq!(tx.date, "2025-03-15");
        assert_eq!(tx.amount, Decimal::new(-11900, 2));
        assert_eq!(tx.reference, None);
    }

    #[test]
    fn test_first_present_alias_wins() {
        let r = row(&[
            ("Bokföringsdag", text("2025-01-02")),
            ("Transaktionsdag", text("2025-01-01")),
            ("Beskrivning", text("Hyra")),
            ("Belopp", text("-9000")),
        ]);
        assert_eq!(normalize(&r).unwrap().date, "2025-01-02");
    }

    #[test]
    fn test_zero_amount_is_kept() {
        let r = row(&[
            ("Bokföringsdag", text("2025-01-02")),
            ("Beskrivning", text("Avgift")),
            ("Belopp", CellValue::Number(0.0)),
        ]);
        assert_eq!(normalize(&r).unwrap().amount, Decimal::ZERO);
    }

    #[test]
    fn test_rows_missing_fields_are_skipped() {
        let no_amount = row(&[
            ("Bokföringsdag", text("2025-01-02")),
            ("Beskrivning", text("Hyra")),
        ]);
        let no_date = row(&[("Beskrivning", text("Hyra")), ("Belopp", text("-1"))]);
        let blank_description = row(&[
            ("Bokföringsdag", text("2025-01-02")),
            ("Beskrivning", text("   ")),
            ("Belopp", text("-1")),
        ]);
        let bad_amount = row(&[
            ("Bokföringsdag", text("2025-01-02")),
            ("Beskrivning", text("Hyra")),
            ("Belopp", text("n/a")),
        ]);

        assert!(normalize(&no_amount).is_none());
        assert!(normalize(&no_date).is_none());
        assert!(normalize(&blank_description).is_none());
        assert!(normalize(&bad_amount).is_none());
    }

    #[test]
    fn test_normalize_all_drops_failures() {
        let good = row(&[
            ("Bokföringsdag", text("2025-01-02")),
            ("Beskrivning", text("Hyra")),
            ("Belopp", text("-9000")),
        ]);
        let bad = row(&[("Beskrivning", text("Saldo"))]);

        let txs = normalize_all(&[good.clone(), bad, good]);
        assert_eq!(txs.len(), 2);
    }
}
