use once_cell::sync::Lazy;
use regex::Regex;

use super::utils::{format_currency, parse_loose_number};
use crate::models::{CellValue, DerivedSource, Row};

pub const DERIVED_HEADER: &str = "Price Per Sq. Ft.";

static PRICE_PER_EXCLUSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)price per|per sq|per sqft").unwrap());
static PRICE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)price").unwrap());
static AREA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)footage|sq.ft|sqft|sq ft|living area|lot area|area").unwrap()
});

/// Picks the price and area headers to derive from, or `None` when the CSV
/// already carries a price-per-square-foot column or lacks either source.
pub fn find_derived_source(headers: &[String]) -> Option<DerivedSource> {
    let derived_lower = DERIVED_HEADER.to_lowercase();
    if headers.iter().any(|h| h.to_lowercase() == derived_lower) {
        return None;
    }

    let price_header = headers
        .iter()
        .find(|h| h.to_lowercase() == "price")
        .or_else(|| {
            headers
                .iter()
                .find(|h| PRICE_PATTERN.is_match(h) && !PRICE_PER_EXCLUSION.is_match(h))
        })?;

    let area_header = headers
        .iter()
        .find(|h| AREA_PATTERN.is_match(h) && !PRICE_PER_EXCLUSION.is_match(h))?;

    Some(DerivedSource {
        price_header: price_header.clone(),
        area_header: area_header.clone(),
    })
}

/// Built from the literal source headers so the same CSV layout always maps
/// to the same key.
pub fn derived_key(source: &DerivedSource) -> String {
    format!(
        "derived_price_per_sqft__{}__{}",
        source.price_header, source.area_header
    )
}

/// Price divided by area, absent when either side is unusable or area is zero.
pub fn derive_value(row: &Row, source: &DerivedSource) -> Option<f64> {
    let price = row.get(&source.price_header).and_then(cell_number)?;
    let area = row.get(&source.area_header).and_then(cell_number)?;
    if area == 0.0 {
        return None;
    }
    let value = price / area;
    value.is_finite().then_some(value)
}

pub fn derive_cell(row: &Row, source: &DerivedSource) -> CellValue {
    derive_value(row, source)
        .map(CellValue::Number)
        .unwrap_or(CellValue::Absent)
}

pub fn format_price_per_sqft(value: f64) -> String {
    let decimals = if value.abs() < 1.0 { 2 } else { 0 };
    format!("{}/sqft", format_currency(value, decimals))
}

fn cell_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) | CellValue::Absent => None,
        CellValue::Text(s) => parse_loose_number(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(price: &str, area: &str) -> Row {
        let mut row = Row::new();
        row.insert("Price".into(), CellValue::from_raw(price));
        row.insert("Footage".into(), CellValue::from_raw(area));
        row
    }

    #[test]
    fn prefers_exact_price_header() {
        let source = find_derived_source(&headers(&["List Price", "Price", "Sq Ft"])).unwrap();
        assert_eq!(source.price_header, "Price");
        assert_eq!(source.area_header, "Sq Ft");
    }

    #[test]
    fn skips_price_per_headers_when_searching() {
        let source =
            find_derived_source(&headers(&["Price Per Unit", "Sale Price", "Living Area"])).unwrap();
        assert_eq!(source.price_header, "Sale Price");
        assert_eq!(source.area_header, "Living Area");
    }

    #[test]
    fn existing_column_blocks_derivation() {
        assert!(find_derived_source(&headers(&["Price", "Footage", "PRICE PER SQ. FT."])).is_none());
        assert!(find_derived_source(&headers(&["Price", "Beds"])).is_none());
        assert!(find_derived_source(&headers(&["Address", "Footage"])).is_none());
    }

    #[test]
    fn derives_and_formats_price_per_foot() {
        let source = DerivedSource {
            price_header: "Price".into(),
            area_header: "Footage".into(),
        };
        let value = derive_value(&row("$500,000", "2000"), &source).unwrap();
        assert_eq!(value, 250.0);
        assert_eq!(format_price_per_sqft(value), "$250/sqft");
        assert_eq!(format_price_per_sqft(0.5), "$0.50/sqft");
        assert_eq!(format_price_per_sqft(1234.4), "$1,234/sqft");
    }

    #[test]
    fn unusable_inputs_are_absent_not_zero() {
        let source = DerivedSource {
            price_header: "Price".into(),
            area_header: "Footage".into(),
        };
        assert_eq!(derive_cell(&row("$500,000", "0"), &source), CellValue::Absent);
        assert_eq!(derive_cell(&row("call", "2000"), &source), CellValue::Absent);
        assert_eq!(derive_cell(&row("$500,000", ""), &source), CellValue::Absent);
        assert_eq!(derive_cell(&row("$300,000", "1,500"), &source), CellValue::Number(200.0));
    }

    #[test]
    fn key_is_stable_for_same_headers() {
        let a = find_derived_source(&headers(&["Price", "Footage"])).unwrap();
        let b = find_derived_source(&headers(&["Footage", "Price", "Beds"])).unwrap();
        assert_eq!(derived_key(&a), derived_key(&b));
        assert_eq!(derived_key(&a), "derived_price_per_sqft__Price__Footage");
    }
}
