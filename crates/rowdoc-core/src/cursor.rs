//! Result cursor trait

use crate::{ColumnType, Result};
use async_trait::async_trait;

/// A query result positioned on one row at a time.
///
/// The cursor is the narrow contract the extraction layer consumes; a driver
/// implements it over whatever its engine provides. Two rules of the
/// protocol matter for correctness:
///
/// - For bound (fixed-width) columns, `is_null` is only meaningful *before*
///   a typed getter is called, and a null bound column must never be read
///   through a typed getter.
/// - For streamed (long text/binary) columns, `is_null` is only meaningful
///   *after* a getter has fetched the column once; querying it earlier
///   reports an arbitrary answer.
///
/// Which rule applies to a column is decided by its `ColumnCategory`, not by
/// the cursor.
#[async_trait]
pub trait ResultCursor: Send {
    /// Advance to the next row. Returns `false` when the result is drained.
    async fn next_row(&mut self) -> Result<bool>;

    /// Number of columns in the result.
    fn column_count(&self) -> usize;

    /// Column name by index.
    fn column_name(&self, index: usize) -> Result<String>;

    /// Driver-declared column type by index.
    fn column_type(&self, index: usize) -> Result<ColumnType>;

    /// Null state of a column on the current row, subject to the timing
    /// rules above.
    async fn is_null(&mut self, index: usize) -> Result<bool>;

    /// Read the column as a 64-bit signed integer.
    async fn get_i64(&mut self, index: usize) -> Result<i64>;

    /// Read the column as a double.
    async fn get_f64(&mut self, index: usize) -> Result<f64>;

    /// Read the column as legacy-encoded (single-byte code page) text.
    async fn get_legacy_text(&mut self, index: usize) -> Result<Vec<u8>>;

    /// Read the column as wide (two-byte) text.
    async fn get_wide_text(&mut self, index: usize) -> Result<Vec<u16>>;

    /// Read the column as raw bytes.
    async fn get_bytes(&mut self, index: usize) -> Result<Vec<u8>>;
}
