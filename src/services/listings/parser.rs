use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::AppError;
use crate::models::{CellValue, Row};

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Header-driven CSV reader for listing exports.
pub struct CsvListingParser {
    delimiter: u8,
    trim: bool,
}

impl Default for CsvListingParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: true,
        }
    }
}

impl CsvListingParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn parse_content(&self, content: &str) -> Result<ParsedCsv, AppError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(if self.trim { Trim::All } else { Trim::None })
            .flexible(true)
            .from_reader(content.as_bytes());

        let raw_headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?;
        if raw_headers.iter().all(|h| h.is_empty()) {
            return Err(AppError::ParseError("CSV is missing a header row".to_string()));
        }
        let headers = unique_headers(raw_headers);

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            rows.push(self.parse_row(&headers, &record));
        }

        tracing::debug!("Parsed {} rows across {} columns", rows.len(), headers.len());
        Ok(ParsedCsv { headers, rows })
    }

    /// Short records are padded with absent cells, extra fields are dropped.
    fn parse_row(&self, headers: &[String], record: &StringRecord) -> Row {
        headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let value = record
                    .get(idx)
                    .map(CellValue::from_raw)
                    .unwrap_or(CellValue::Absent);
                (header.clone(), value)
            })
            .collect()
    }
}

/// A repeated header name gets `_2`, `_3`, ... so every column keeps its
/// own cell in the row.
fn unique_headers(record: &StringRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    record
        .iter()
        .map(|raw| {
            let mut header = raw.to_string();
            let mut counter = 2;
            while !seen.insert(header.clone()) {
                header = format!("{}_{}", raw, counter);
                counter += 1;
            }
            if header != raw {
                tracing::warn!("Renamed duplicate CSV header {:?} to {:?}", raw, header);
            }
            header
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_rows() {
        let csv = "Price,Short Address,Beds\n\"$500,000\",1 Main St,3\n$350000, 2 Oak Ave ,2\n";
        let parsed = CsvListingParser::new().parse_content(csv).unwrap();

        assert_eq!(parsed.headers, vec!["Price", "Short Address", "Beds"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0]["Price"], CellValue::Text("$500,000".into()));
        assert_eq!(parsed.rows[1]["Short Address"], CellValue::Text("2 Oak Ave".into()));
    }

    #[test]
    fn pads_short_rows_and_skips_blank_lines() {
        let csv = "\u{feff}A,B,C\n1,2\n,,\n\n4,5,6,7\n";
        let parsed = CsvListingParser::new().parse_content(csv).unwrap();

        assert_eq!(parsed.headers, vec!["A", "B", "C"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0]["C"], CellValue::Absent);
        assert_eq!(parsed.rows[1].len(), 3);
        assert!(parsed.rows.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn duplicate_headers_keep_their_own_values() {
        let parsed = CsvListingParser::new()
            .parse_content("Price,Beds,Price,Price_2\n$100,3,$999,x\n")
            .unwrap();

        assert_eq!(parsed.headers, vec!["Price", "Beds", "Price_2", "Price_2_2"]);
        let row = &parsed.rows[0];
        assert_eq!(row.len(), parsed.headers.len());
        assert_eq!(row["Price"], CellValue::Text("$100".into()));
        assert_eq!(row["Price_2"], CellValue::Text("$999".into()));
        assert_eq!(row["Price_2_2"], CellValue::Text("x".into()));
    }

    #[test]
    fn rows_keep_header_order() {
        let parsed = CsvListingParser::new()
            .parse_content("Short Address,Price,Beds\n1 Main St,$1,2\n")
            .unwrap();
        let keys: Vec<_> = parsed.rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Short Address", "Price", "Beds"]);
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        let err = CsvListingParser::new().parse_content("").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn custom_delimiter() {
        let parsed = CsvListingParser::new()
            .with_delimiter(b';')
            .with_trim(false)
            .parse_content("Price;Beds\n100;2\n")
            .unwrap();
        assert_eq!(parsed.rows[0]["Beds"], CellValue::Text("2".into()));
    }
}
