//! Calendar month arithmetic on `YYYY-MM` strings
//!
//! Months are kept as zero-padded, fixed-width text so that string
//! comparison and chronological order agree. Every value produced here
//! preserves that width.

use std::sync::OnceLock;

use regex::Regex;

use super::result::{Error, Result};

/// Four-digit year, two-digit month 01-12
const MONTH_PATTERN: &str = r"^\d{4}-(0[1-9]|1[0-2])$";

/// Last year representable in a four-digit month
pub const MAX_YEAR: i64 = 9999;

fn month_regex() -> Option<&'static Regex> {
    static MONTH_RE: OnceLock<Option<Regex>> = OnceLock::new();
    MONTH_RE.get_or_init(|| Regex::new(MONTH_PATTERN).ok()).as_ref()
}

/// Check that a string is a well-formed `YYYY-MM` month
pub fn is_valid_month(month: &str) -> bool {
    month_regex().is_some_and(|re| re.is_match(month))
}

/// Validate a month field, naming the field in the error
pub fn validate_month(field: &str, month: &str) -> Result<()> {
    if is_valid_month(month) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "{} must be a YYYY-MM month, got '{}'",
            field, month
        )))
    }
}

/// The `YYYY-MM` prefix of an ISO date string
///
/// Shorter inputs are returned whole.
pub fn month_of_date(date: &str) -> &str {
    match date.char_indices().nth(7) {
        Some((idx, _)) => &date[..idx],
        None => date,
    }
}

/// Advance a `YYYY-MM` month by `step` months
///
/// Month overflow rolls into the year (`2025-11` + 3 = `2026-02`). The
/// result is always zero-padded. Fails when the input cannot be parsed
/// or when the result would not sort after the input, which is what
/// keeps schedule iteration finite.
pub fn next_month(current: &str, step: u32) -> Result<String> {
    let (_, next) = step_month(current, step)?;
    ensure_advances(current, next)
}

/// Like [`next_month`], but `None` once the result would leave the
/// four-digit year range
pub fn checked_next_month(current: &str, step: u32) -> Result<Option<String>> {
    let (year, next) = step_month(current, step)?;
    if year > MAX_YEAR {
        return Ok(None);
    }
    ensure_advances(current, next).map(Some)
}

fn step_month(current: &str, step: u32) -> Result<(i64, String)> {
    if step == 0 {
        return Err(Error::validation("month step must be at least 1"));
    }

    let (year_str, month_str) = current
        .split_once('-')
        .ok_or_else(|| Error::validation(format!("Invalid month '{}'", current)))?;

    let year: i64 = year_str
        .parse()
        .map_err(|_| Error::validation(format!("Invalid year in '{}'", current)))?;
    let month: i64 = month_str
        .parse()
        .map_err(|_| Error::validation(format!("Invalid month in '{}'", current)))?;

    if !(1..=12).contains(&month) {
        return Err(Error::validation(format!("Month out of range in '{}'", current)));
    }

    let zero_based = month - 1 + i64::from(step);
    let next_year = year + zero_based / 12;
    Ok((next_year, format!("{:04}-{:02}", next_year, zero_based % 12 + 1)))
}

fn ensure_advances(current: &str, next: String) -> Result<String> {
    if next.as_str() <= current {
        return Err(Error::validation(format!(
            "Month '{}' does not sort after '{}'",
            next, current
        )));
    }
    Ok(next)
}
