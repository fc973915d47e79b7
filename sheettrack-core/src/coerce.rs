//! Cell value coercion
//!
//! Malformed cells are expected in hand-maintained sheets, so every failure
//! path yields `None` instead of an error.

use crate::source::CellValue;
use chrono::NaiveDate;

/// Two-digit years from here on belong to the 1900s (`69` is 1969)
const CENTURY_PIVOT: i32 = 69;

/// Parse a percentage cell (`"100,00%"`, `"25%"`, `42`).
pub fn parse_percentage(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => percentage_from_text(s),
        _ => None,
    }
}

/// Text form of [`parse_percentage`]
pub fn percentage_from_text(raw: &str) -> Option<f64> {
    let replaced = raw.replace(',', ".");
    let trimmed = replaced.trim();
    let cleaned = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a completion date cell.
pub fn parse_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => date_from_text(s),
        _ => None,
    }
}

/// Text form of [`parse_date`].
///
/// Day/month/two-digit-year as typed in the progress sheets (`6/3/25`).
/// Day and month take one or two digits, the year exactly two.
pub fn date_from_text(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    let &[day, month, year] = parts.as_slice() else {
        return None;
    };

    let digits = |s: &str, max_len: usize| {
        !s.is_empty() && s.len() <= max_len && s.bytes().all(|b| b.is_ascii_digit())
    };
    if !digits(day, 2) || !digits(month, 2) || !digits(year, 2) || year.len() != 2 {
        return None;
    }

    let yy: i32 = year.parse().ok()?;
    let full_year = if yy >= CENTURY_PIVOT { 1900 + yy } else { 2000 + yy };
    NaiveDate::from_ymd_opt(full_year, month.parse().ok()?, day.parse().ok()?)
}
