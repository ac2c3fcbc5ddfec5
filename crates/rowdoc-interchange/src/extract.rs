//! Column extraction
//!
//! One cell comes off the cursor per call, dispatched on the column's
//! category. The ordering rules here are the correctness core of the whole
//! export path:
//!
//! - Bound categories (integers, floats, fixed-width text) test for null
//!   BEFORE any typed read. Reading a null bound column raises a driver
//!   error instead of producing a value.
//! - Streamed categories (long text, long binary) fetch the data FIRST and
//!   test for null AFTER. Testing first either raises a driver error or,
//!   worse, silently turns a null into an empty string.
//!
//! A failing cell does not kill the row. The cell degrades to null, the
//! failure is recorded against the column, and the caller decides whether
//! the aggregate is worth surfacing.

use crate::document::RowObject;
use crate::transcode;
use rowdoc_core::{CategoryMap, ColumnCategory, ResultCursor, Result, RowdocError, TypedValue};

/// One failed cell: which column, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFailure {
    pub column: String,
    pub cause: String,
}

/// A fully walked row: the emitted row object plus any per-column failures.
///
/// Failed cells are present in `row` as nulls.
#[derive(Debug)]
pub struct RowExtraction {
    pub row: RowObject,
    pub failures: Vec<ColumnFailure>,
}

impl RowExtraction {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Split into the emitted row and, if any cell failed, the aggregate
    /// error with the row serialized as it was emitted.
    pub fn into_parts(self) -> (RowObject, Option<ColumnExtractionError>) {
        if self.failures.is_empty() {
            return (self.row, None);
        }
        let row =
            serde_json::to_string(&self.row).unwrap_or_else(|_| "<unserializable>".into());
        let error = ColumnExtractionError {
            row,
            failures: self.failures,
        };
        (self.row, Some(error))
    }

    /// Aggregate the failures into a reportable error, discarding the row.
    pub fn into_error(self) -> Option<ColumnExtractionError> {
        self.into_parts().1
    }
}

/// Aggregate error for a row with one or more failed cells.
///
/// The message leads with the row as emitted, then one line per failed
/// column.
#[derive(Debug)]
pub struct ColumnExtractionError {
    pub row: String,
    pub failures: Vec<ColumnFailure>,
}

impl std::fmt::Display for ColumnExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bad row: [{}]", self.row)?;
        for failure in &self.failures {
            write!(
                f,
                "\nError on column: {}, what: {}",
                failure.column, failure.cause
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ColumnExtractionError {}

/// Extract one cell at `index`, honoring the category's null-timing rule.
pub async fn extract_column(
    cursor: &mut dyn ResultCursor,
    index: usize,
    category: ColumnCategory,
) -> Result<TypedValue> {
    match category {
        ColumnCategory::SmallInteger => {
            if cursor.is_null(index).await? {
                Ok(TypedValue::Null)
            } else {
                Ok(TypedValue::Integer(cursor.get_i64(index).await?))
            }
        }
        ColumnCategory::FloatingPoint => {
            if cursor.is_null(index).await? {
                Ok(TypedValue::Null)
            } else {
                Ok(TypedValue::Real(cursor.get_f64(index).await?))
            }
        }
        ColumnCategory::LegacyText | ColumnCategory::Unrepresented => {
            if cursor.is_null(index).await? {
                Ok(TypedValue::Null)
            } else {
                let bytes = cursor.get_legacy_text(index).await?;
                Ok(TypedValue::Text(decode_legacy(&bytes)?))
            }
        }
        ColumnCategory::UnicodeText => {
            if cursor.is_null(index).await? {
                Ok(TypedValue::Null)
            } else {
                let units = cursor.get_wide_text(index).await?;
                Ok(TypedValue::Text(decode_wide(&units)?))
            }
        }
        ColumnCategory::StreamedLegacyText => {
            // Fetch before the null test; see the module docs.
            let bytes = cursor.get_legacy_text(index).await?;
            if cursor.is_null(index).await? {
                Ok(TypedValue::Null)
            } else {
                Ok(TypedValue::Text(decode_legacy(&bytes)?))
            }
        }
        ColumnCategory::StreamedUnicodeText => {
            let units = cursor.get_wide_text(index).await?;
            if cursor.is_null(index).await? {
                Ok(TypedValue::Null)
            } else {
                Ok(TypedValue::Text(decode_wide(&units)?))
            }
        }
        ColumnCategory::StreamedBinary => {
            let bytes = cursor.get_bytes(index).await?;
            if cursor.is_null(index).await? {
                Ok(TypedValue::Null)
            } else {
                Ok(TypedValue::Blob(bytes))
            }
        }
    }
}

/// Walk every column of the current row.
///
/// Metadata lookups (name, type) are fatal; cell extraction failures are
/// collected and the cell degrades to null.
pub async fn extract_row(
    cursor: &mut dyn ResultCursor,
    categories: &CategoryMap,
) -> Result<RowExtraction> {
    let mut row = RowObject::new();
    let mut failures = Vec::new();

    for index in 0..cursor.column_count() {
        let name = cursor.column_name(index)?;
        let column_type = cursor.column_type(index)?;
        let category = categories.categorize(column_type);
        match extract_column(cursor, index, category).await {
            Ok(value) => row.insert(name, value),
            Err(error) => {
                failures.push(ColumnFailure {
                    column: name.clone(),
                    cause: error.to_string(),
                });
                row.insert(name, TypedValue::Null);
            }
        }
    }

    Ok(RowExtraction { row, failures })
}

fn decode_legacy(bytes: &[u8]) -> Result<String> {
    transcode::legacy_to_utf8(bytes).map_err(|e| RowdocError::Column(e.to_string()))
}

fn decode_wide(units: &[u16]) -> Result<String> {
    transcode::wide_to_utf8(units).map_err(|e| RowdocError::Column(e.to_string()))
}
