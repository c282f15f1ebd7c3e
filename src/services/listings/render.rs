use super::derived::format_price_per_sqft;
use super::utils::{format_currency, parse_date, parse_plain_number};
use crate::models::{CellValue, ColumnType};

/// Display text for one cell. Anything that does not fit its column type is
/// shown as the raw string.
pub fn format_cell(value: &CellValue, column_type: ColumnType) -> String {
    let raw = match value.as_text() {
        Some(raw) => raw,
        None => return String::new(),
    };

    match column_type {
        ColumnType::Url => raw.trim().to_string(),
        ColumnType::Currency => match value {
            CellValue::Number(n) => format_currency(*n, 0),
            _ => parse_plain_number(&raw)
                .map(|n| format_currency(n, 0))
                .unwrap_or(raw),
        },
        ColumnType::Date => parse_date(&raw)
            .map(|date| date.format("%-m/%-d/%Y").to_string())
            .unwrap_or(raw),
        ColumnType::Number | ColumnType::String => raw,
    }
}

pub fn format_derived_cell(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) => format_price_per_sqft(*n),
        _ => String::new(),
    }
}
