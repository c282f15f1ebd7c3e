use serde::Serialize;
use indexmap::IndexMap;

use super::derived::derive_cell;
use super::render::{format_cell, format_derived_cell};
use crate::models::{CellValue, ColumnDescriptor, ColumnType, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterVariant {
    Range,
    Text,
}

impl From<ColumnType> for FilterVariant {
    fn from(column_type: ColumnType) -> Self {
        if column_type.is_numeric() {
            FilterVariant::Range
        } else {
            FilterVariant::Text
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub key: String,
    pub header: String,
    pub column_type: ColumnType,
    pub visible: bool,
    pub filter: FilterVariant,
    pub derived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellView {
    pub value: CellValue,
    pub display: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub id: String,
    pub cells: IndexMap<String, CellView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    pub columns: Vec<ColumnView>,
    pub rows: Vec<RowView>,
}

impl TableView {
    pub fn build<'a, I>(columns: &[ColumnDescriptor], rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Row)>,
    {
        let column_views = columns
            .iter()
            .map(|c| ColumnView {
                key: c.key.clone(),
                header: c.header.clone(),
                column_type: c.column_type,
                visible: c.visible,
                filter: c.column_type.into(),
                derived: c.derived.is_some(),
            })
            .collect();

        let rows = rows
            .into_iter()
            .map(|(id, row)| RowView {
                id: id.to_string(),
                cells: columns
                    .iter()
                    .map(|column| (column.key.clone(), cell_view(column, row)))
                    .collect(),
            })
            .collect();

        TableView {
            columns: column_views,
            rows,
        }
    }
}

fn cell_view(column: &ColumnDescriptor, row: &Row) -> CellView {
    match &column.derived {
        Some(source) => {
            let value = derive_cell(row, source);
            let display = format_derived_cell(&value);
            CellView { value, display }
        }
        None => {
            let value = row.get(&column.header).cloned().unwrap_or(CellValue::Absent);
            let display = format_cell(&value, column.column_type);
            CellView { value, display }
        }
    }
}
