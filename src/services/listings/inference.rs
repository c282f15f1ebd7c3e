use once_cell::sync::Lazy;
use regex::Regex;

use super::utils::{is_date_string, parse_plain_number};
use crate::models::{CellValue, ColumnType, Row};

pub const TYPE_DETECTION_ROWS: usize = 50;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://.+").unwrap());
static CURRENCY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?\s?[\d,]+(\.\d+)?$").unwrap());

/// Classifies `header` from the rows it is given. Every non-empty sample has
/// to agree for a type to hold; one outlier demotes the column.
pub fn detect_column_type(header: &str, sample: &[Row]) -> ColumnType {
    let mut is_url = true;
    let mut is_currency = true;
    let mut is_number = true;
    let mut is_date = true;
    let mut samples_checked = 0;

    for row in sample {
        let value = match row.get(header) {
            Some(value) if !value.is_empty() => value,
            _ => continue,
        };
        samples_checked += 1;

        if let CellValue::Number(n) = value {
            is_url = false;
            is_date = false;
            if n.is_nan() {
                is_number = false;
                is_currency = false;
            }
            continue;
        }

        let text = value.as_text().unwrap_or_default();
        let text = text.trim();

        if !URL_PATTERN.is_match(text) {
            is_url = false;
        }
        if !CURRENCY_PATTERN.is_match(text) {
            is_currency = false;
        }
        if parse_plain_number(text).is_none() {
            is_number = false;
            is_currency = false;
        }
        if !is_date_string(text) {
            is_date = false;
        }
    }

    if samples_checked == 0 {
        return ColumnType::String;
    }

    match () {
        _ if is_url => ColumnType::Url,
        _ if is_currency && header.to_lowercase().contains("price") => ColumnType::Currency,
        _ if is_number => ColumnType::Number,
        _ if is_date => ColumnType::Date,
        _ => ColumnType::String,
    }
}
