use std::collections::HashSet;
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use super::derived::{derived_key, find_derived_source, DERIVED_HEADER};
use super::inference::{detect_column_type, TYPE_DETECTION_ROWS};
use super::parser::ParsedCsv;
use super::utils::sanitize_key;
use super::visibility::is_visible_by_default;
use crate::models::{CellValue, ColumnDescriptor, ColumnType, Dataset, ListingRow, Row};

pub struct ListingAnalyzer {
    sample_rows: usize,
}

impl Default for ListingAnalyzer {
    fn default() -> Self {
        Self::new(TYPE_DETECTION_ROWS)
    }
}

impl ListingAnalyzer {
    pub fn new(sample_rows: usize) -> Self {
        Self { sample_rows: sample_rows.max(1) }
    }

    pub fn analyze(&self, parsed: ParsedCsv) -> Dataset {
        let start = std::time::Instant::now();
        let columns = self.describe_columns(&parsed.headers, &parsed.rows);

        let rows = parsed
            .rows
            .into_iter()
            .enumerate()
            .map(|(index, cells)| ListingRow {
                id: row_id(index, &parsed.headers, &cells),
                cells,
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "Analyzed {} rows, {} columns in {:?}",
            rows.len(),
            columns.len(),
            start.elapsed()
        );

        Dataset {
            headers: parsed.headers,
            rows,
            columns,
        }
    }

    /// One descriptor per header, in header order, plus the derived column
    /// when one applies.
    pub fn describe_columns(&self, headers: &[String], rows: &[Row]) -> Vec<ColumnDescriptor> {
        let sample = &rows[..rows.len().min(self.sample_rows)];

        let types: Vec<ColumnType> = headers
            .par_iter()
            .map(|header| detect_column_type(header, sample))
            .collect();

        let mut existing_keys = HashSet::new();
        let mut columns: Vec<ColumnDescriptor> = headers
            .iter()
            .zip(types)
            .map(|(header, column_type)| ColumnDescriptor {
                header: header.clone(),
                key: sanitize_key(header, &mut existing_keys),
                column_type,
                visible: is_visible_by_default(header, column_type, false),
                derived: None,
            })
            .collect();

        if let Some(source) = find_derived_source(headers) {
            tracing::debug!(
                "Deriving {} from {:?} / {:?}",
                DERIVED_HEADER,
                source.price_header,
                source.area_header
            );
            columns.push(ColumnDescriptor {
                header: DERIVED_HEADER.to_string(),
                key: sanitize_key(&derived_key(&source), &mut existing_keys),
                column_type: ColumnType::Currency,
                visible: is_visible_by_default(DERIVED_HEADER, ColumnType::Currency, true),
                derived: Some(source),
            });
        }

        columns
    }
}

/// `<index>-<first 12 hex digits of sha256(cells in header order)>`.
pub fn row_id(index: usize, headers: &[String], row: &Row) -> String {
    let mut hasher = Sha256::new();
    for header in headers {
        hasher.update(header.as_bytes());
        hasher.update([0x1f]);
        match row.get(header) {
            Some(CellValue::Text(s)) => hasher.update(s.as_bytes()),
            Some(CellValue::Number(n)) => hasher.update(n.to_bits().to_be_bytes()),
            Some(CellValue::Absent) | None => {}
        }
        hasher.update([0x1e]);
    }
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}", index, &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listings::parser::CsvListingParser;

    fn analyze(csv: &str) -> Dataset {
        let parsed = CsvListingParser::new().parse_content(csv).unwrap();
        ListingAnalyzer::default().analyze(parsed)
    }

    #[test]
    fn builds_descriptors_with_visibility() {
        let dataset = analyze(
            "Price,Short Address,Beds,Zestimate,URL,Listing Link\n\
             \"$500,000\",1 Main St,3,\"$510,000\",https://z.com/1,https://z.com/a\n",
        );
        let by_header = |h: &str| dataset.columns.iter().find(|c| c.header == h).unwrap();

        assert_eq!(by_header("Price").column_type, ColumnType::Currency);
        assert!(by_header("Price").visible);
        assert!(by_header("Beds").visible);
        assert!(!by_header("Zestimate").visible);
        assert!(by_header("Listing Link").visible);
        assert_eq!(by_header("Listing Link").key, "Listing_Link");
        assert!(dataset.derived_column().is_none());
    }

    #[test]
    fn adds_derived_column_when_sources_exist() {
        let dataset = analyze("Price,Sq Ft\n\"$500,000\",2000\n\"$1\",0\n");
        let derived = dataset.derived_column().unwrap();

        assert_eq!(derived.header, DERIVED_HEADER);
        assert_eq!(derived.key, "derived_price_per_sqft__Price__Sq_Ft");
        assert!(derived.visible);
        assert_eq!(dataset.columns.len(), 3);
    }

    #[test]
    fn existing_price_per_column_is_used_as_is() {
        let dataset = analyze("Price,Footage,Price Per Sq. Ft.\n\"$500,000\",2000,$250\n");
        assert!(dataset.derived_column().is_none());
        let existing = dataset
            .columns
            .iter()
            .find(|c| c.header == "Price Per Sq. Ft.")
            .unwrap();
        assert!(existing.visible);
    }

    #[test]
    fn colliding_headers_get_distinct_keys() {
        let dataset = analyze("Price!,Price?\n1,2\n");
        let keys: Vec<_> = dataset.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["Price_", "Price__2"]);
    }

    #[test]
    fn identical_rows_get_distinct_ids() {
        let dataset = analyze("Price,Beds\n100,2\n100,2\n");
        assert_ne!(dataset.rows[0].id, dataset.rows[1].id);
        assert!(dataset.rows[0].id.starts_with("0-"));
        assert!(dataset.rows[1].id.starts_with("1-"));

        let again = analyze("Price,Beds\n100,2\n100,2\n");
        assert_eq!(dataset.rows[0].id, again.rows[0].id);
    }

    #[test]
    fn only_the_first_sample_rows_drive_inference() {
        let headers = vec!["Beds".to_string()];
        let mut rows: Vec<Row> = (0..3)
            .map(|i| Row::from([("Beds".to_string(), CellValue::Text(i.to_string()))]))
            .collect();
        rows.push(Row::from([("Beds".to_string(), CellValue::Text("studio".into()))]));

        let columns = ListingAnalyzer::new(3).describe_columns(&headers, &rows);
        assert_eq!(columns[0].column_type, ColumnType::Number);

        let columns = ListingAnalyzer::new(50).describe_columns(&headers, &rows);
        assert_eq!(columns[0].column_type, ColumnType::String);
    }
}
