use serde::{Deserialize, Serialize};
use indexmap::IndexMap;

/// A single scalar in a listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Absent,
}

impl CellValue {
    /// Empty cells are absent.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            CellValue::Absent
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Absent => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Absent => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(n.to_string()),
        }
    }
}

/// One listing, keyed by the CSV header names in header order.
pub type Row = IndexMap<String, CellValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Currency,
    Number,
    Date,
    Url,
    String,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Currency | ColumnType::Number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSource {
    pub price_header: String,
    pub area_header: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub header: String,
    pub key: String,
    pub column_type: ColumnType,
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRow {
    pub id: String,
    pub cells: Row,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<ListingRow>,
    pub columns: Vec<ColumnDescriptor>,
}

impl Dataset {
    pub fn row(&self, id: &str) -> Option<&ListingRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn derived_column(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.derived.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub file_name: String,
    pub size: usize,
    #[serde(default)]
    pub last_modified: Option<i64>,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    pub row: Row,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_values_serialize_as_plain_scalars() {
        let mut row = Row::new();
        row.insert("Price".into(), CellValue::Text("$1".into()));
        row.insert("Beds".into(), CellValue::Number(3.0));
        row.insert("Notes".into(), CellValue::Absent);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Price":"$1","Beds":3.0,"Notes":null}"#);

        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn empty_raw_cells_are_absent() {
        assert_eq!(CellValue::from_raw(""), CellValue::Absent);
        assert!(CellValue::Text(String::new()).is_empty());
        assert!(!CellValue::from_raw("0").is_empty());
    }
}
