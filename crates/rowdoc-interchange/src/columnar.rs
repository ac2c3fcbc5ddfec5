//! Columnar (structure-of-arrays) table layout
//!
//! The default row layout stores one object per row, which is verbose but
//! easy to read and diff. The columnar layout stores each table as
//!
//! ```json
//! { "recordCount": 3, "data": { "<col>": [v0, v1, v2], ... } }
//! ```
//!
//! which is smaller at the cost of readability. The two layouts carry the
//! same cells with one normalization: a member a row omits comes back as an
//! explicit null, since every column array must have `recordCount` entries.
//!
//! Only export can produce this layout. Import consumes the row layout.

use crate::document::{Document, RowObject, TableRows};
use indexmap::IndexMap;
use thiserror::Error;

/// Errors raised while reading a columnar table back into rows.
#[derive(Debug, Error)]
pub enum ColumnarFormatError {
    #[error("columnar table must be an object with 'recordCount' and 'data'")]
    NotColumnar,

    #[error("'recordCount' must be a non-negative integer")]
    BadRecordCount,

    #[error("'data' must be a mapping of column name to value array")]
    DataNotMapping,

    #[error("column '{column}' must be an array")]
    ColumnNotArray { column: String },

    #[error("column '{column}' has {actual} values, recordCount says {expected}")]
    LengthMismatch {
        column: String,
        actual: usize,
        expected: usize,
    },
}

/// Convert one table from row layout to columnar layout.
///
/// Column order is the order of first appearance across the rows.
pub fn table_to_columnar(rows: &TableRows) -> serde_json::Value {
    let mut columns: IndexMap<String, Vec<serde_json::Value>> = IndexMap::new();
    for row in rows.iter() {
        for column in row.columns() {
            columns.entry(column.clone()).or_default();
        }
    }

    for row in rows.iter() {
        for (column, values) in columns.iter_mut() {
            let cell = row
                .get(column)
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            values.push(cell);
        }
    }

    let mut data = serde_json::Map::new();
    for (column, values) in columns {
        data.insert(column, serde_json::Value::Array(values));
    }

    let mut table = serde_json::Map::new();
    table.insert("recordCount".into(), serde_json::Value::from(rows.len()));
    table.insert("data".into(), serde_json::Value::Object(data));
    serde_json::Value::Object(table)
}

/// Convert one columnar table back into row layout.
pub fn table_from_columnar(value: &serde_json::Value) -> Result<TableRows, ColumnarFormatError> {
    let table = value.as_object().ok_or(ColumnarFormatError::NotColumnar)?;
    let record_count = table
        .get("recordCount")
        .ok_or(ColumnarFormatError::NotColumnar)?
        .as_u64()
        .ok_or(ColumnarFormatError::BadRecordCount)? as usize;
    let data = table
        .get("data")
        .ok_or(ColumnarFormatError::NotColumnar)?
        .as_object()
        .ok_or(ColumnarFormatError::DataNotMapping)?;

    let mut columns = Vec::with_capacity(data.len());
    for (column, values) in data {
        let values = values
            .as_array()
            .ok_or_else(|| ColumnarFormatError::ColumnNotArray {
                column: column.clone(),
            })?;
        if values.len() != record_count {
            return Err(ColumnarFormatError::LengthMismatch {
                column: column.clone(),
                actual: values.len(),
                expected: record_count,
            });
        }
        columns.push((column, values));
    }

    let mut rows = TableRows::new();
    for index in 0..record_count {
        let mut row = RowObject::new();
        for (column, values) in &columns {
            row.insert_json((*column).clone(), values[index].clone());
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Re-express a whole document with every table in columnar layout.
///
/// The envelope (`version`, `schema`, table order) is unchanged.
pub fn document_to_columnar(document: &Document) -> serde_json::Value {
    let mut schema = serde_json::Map::new();
    for (table, rows) in &document.schema {
        schema.insert(table.clone(), table_to_columnar(rows));
    }

    let mut doc = serde_json::Map::new();
    doc.insert(
        "version".into(),
        serde_json::Value::String(document.version.clone()),
    );
    doc.insert("schema".into(), serde_json::Value::Object(schema));
    serde_json::Value::Object(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_rows() -> TableRows {
        let mut rows = TableRows::new();
        let mut a = RowObject::new();
        a.insert_json("id", json!(1));
        a.insert_json("label", json!("first"));
        rows.push(a);
        let mut b = RowObject::new();
        b.insert_json("id", json!(2));
        b.insert_json("label", json!(null));
        rows.push(b);
        rows
    }

    #[test]
    fn test_rows_convert_to_columnar() {
        let value = table_to_columnar(&sample_rows());
        assert_eq!(
            value,
            json!({
                "recordCount": 2,
                "data": { "id": [1, 2], "label": ["first", null] }
            })
        );
    }

    #[test]
    fn test_empty_table_has_zero_record_count() {
        let value = table_to_columnar(&TableRows::new());
        assert_eq!(value, json!({ "recordCount": 0, "data": {} }));
    }

    #[test]
    fn test_columnar_converts_back_to_rows() {
        let rows = sample_rows();
        let back = table_from_columnar(&table_to_columnar(&rows)).unwrap();
        assert_eq!(back, rows);
    }

    /// A member a row omits is normalized to an explicit null.
    #[test]
    fn test_omitted_member_becomes_null() {
        let mut rows = TableRows::new();
        let mut a = RowObject::new();
        a.insert_json("id", json!(1));
        a.insert_json("extra", json!("x"));
        rows.push(a);
        let mut b = RowObject::new();
        b.insert_json("id", json!(2));
        rows.push(b);

        let value = table_to_columnar(&rows);
        assert_eq!(value["data"]["extra"], json!(["x", null]));

        let back = table_from_columnar(&value).unwrap();
        assert_eq!(back.0[1].get("extra"), Some(&json!(null)));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let value = json!({ "recordCount": 3, "data": { "id": [1, 2] } });
        assert!(matches!(
            table_from_columnar(&value),
            Err(ColumnarFormatError::LengthMismatch { ref column, actual: 2, expected: 3 })
                if column == "id"
        ));
    }

    #[test]
    fn test_non_columnar_value_is_rejected() {
        assert!(matches!(
            table_from_columnar(&json!([1, 2])),
            Err(ColumnarFormatError::NotColumnar)
        ));
        assert!(matches!(
            table_from_columnar(&json!({ "recordCount": -1, "data": {} })),
            Err(ColumnarFormatError::BadRecordCount)
        ));
    }

    #[test]
    fn test_document_to_columnar_keeps_envelope() {
        let mut document = Document::new();
        document.schema.insert("T".into(), sample_rows());
        let value = document_to_columnar(&document);
        assert_eq!(value["version"], json!("1.0.0"));
        assert_eq!(value["schema"]["T"]["recordCount"], json!(2));
    }
}
