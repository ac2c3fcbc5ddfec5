//! SQLite connection implementation

use async_trait::async_trait;
use encoding_rs::{EncoderResult, WINDOWS_1252};
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, OpenFlags};
use rowdoc_core::{
    ColumnType, Connection, ResultCursor, Result, RowdocError, Transaction,
};
use std::sync::Arc;

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: Arc<Mutex<RusqliteConnection>>,
}

impl SqliteConnection {
    /// Open a SQLite database
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                RowdocError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            RusqliteConnection::open_with_flags(path, flags).map_err(|e| {
                RowdocError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    path, e
                ))
            })?
        };

        // PRAGMA commands return results, so use pragma_update
        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            RowdocError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;

        tracing::info!(path = %path, "SQLite database connection established");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    async fn query(&self, sql: &str) -> Result<Box<dyn ResultCursor>> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing query");
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| RowdocError::Query(format!("Failed to prepare query: {}", e)))?;

        // Column metadata comes from sqlite3_column_decltype, the type named
        // in CREATE TABLE. Expression columns have none and fall through to
        // the text fallback category.
        let columns: Vec<(String, ColumnType)> = stmt
            .columns()
            .iter()
            .map(|col| {
                (
                    col.name().to_string(),
                    column_type_from_decl(col.decl_type()),
                )
            })
            .collect();

        let mut rows = Vec::new();
        let mut query_rows = stmt
            .query([])
            .map_err(|e| RowdocError::Query(format!("Failed to execute query: {}", e)))?;

        while let Some(row) = query_rows
            .next()
            .map_err(|e| RowdocError::Query(format!("Failed to fetch row: {}", e)))?
        {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value = row
                    .get_ref(i)
                    .map_err(|e| RowdocError::Query(e.to_string()))?
                    .into();
                values.push(value);
            }
            rows.push(values);
        }

        tracing::debug!(row_count = rows.len(), "query executed successfully");
        Ok(Box::new(SqliteCursor {
            columns,
            rows,
            position: None,
        }))
    }

    async fn execute(&self, statement: &[u8]) -> Result<u64> {
        let sql = decode_statement(statement);
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing statement");
        let conn = self.conn.lock();

        let rows_affected = conn
            .execute(&sql, [])
            .map_err(|e| RowdocError::Query(format!("Failed to execute statement: {}", e)))?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(rows_affected as u64)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        tracing::debug!("beginning SQLite transaction");
        {
            let conn = self.conn.lock();
            // DEFERRED means the write lock is only acquired when the first
            // write occurs.
            conn.execute_batch("BEGIN DEFERRED")
                .map_err(|e| RowdocError::Query(format!("Failed to begin transaction: {}", e)))?;
        }
        Ok(Box::new(SqliteTransaction {
            conn: Arc::clone(&self.conn),
            committed: false,
            rolled_back: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing SQLite connection");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

/// SQLite transaction wrapper.
///
/// Issues raw `BEGIN DEFERRED` / `COMMIT` / `ROLLBACK` SQL so that it can
/// share the connection `Arc<Mutex<…>>` without running into rusqlite's
/// borrow-based transaction lifetime requirements.
pub struct SqliteTransaction {
    conn: Arc<Mutex<RusqliteConnection>>,
    committed: bool,
    rolled_back: bool,
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        // If the transaction is abandoned without an explicit
        // commit/rollback, issue a best-effort rollback so the connection is
        // left in a clean state.
        if !self.committed && !self.rolled_back {
            tracing::warn!(
                "SQLite transaction dropped without commit or rollback, issuing automatic rollback"
            );
            let conn = self.conn.lock();
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                tracing::error!(error = %e, "automatic rollback on drop failed");
            }
        }
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn execute(&self, statement: &[u8]) -> Result<u64> {
        let sql = decode_statement(statement);
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing statement in SQLite transaction");
        let conn = self.conn.lock();

        let rows_affected = conn
            .execute(&sql, [])
            .map_err(|e| RowdocError::Query(format!("Failed to execute statement: {}", e)))?;
        Ok(rows_affected as u64)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("committing SQLite transaction");

        if self.rolled_back {
            return Err(RowdocError::Query("Transaction already rolled back".into()));
        }
        if self.committed {
            return Err(RowdocError::Query("Transaction already committed".into()));
        }

        {
            let conn = self.conn.lock();
            conn.execute_batch("COMMIT")
                .map_err(|e| RowdocError::Query(format!("Failed to commit transaction: {}", e)))?;
        }
        self.committed = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("rolling back SQLite transaction");

        if self.committed {
            return Err(RowdocError::Query("Transaction already committed".into()));
        }
        if self.rolled_back {
            return Ok(());
        }

        {
            let conn = self.conn.lock();
            conn.execute_batch("ROLLBACK")
                .map_err(|e| RowdocError::Query(format!("Failed to rollback transaction: {}", e)))?;
        }
        self.rolled_back = true;
        Ok(())
    }
}

/// Buffered result cursor.
///
/// SQLite hands rows back synchronously while the statement borrows the
/// connection, so the whole result set is materialized at query time and the
/// cursor walks the buffer.
pub struct SqliteCursor {
    columns: Vec<(String, ColumnType)>,
    rows: Vec<Vec<rusqlite::types::Value>>,
    position: Option<usize>,
}

impl SqliteCursor {
    fn cell(&self, index: usize) -> Result<&rusqlite::types::Value> {
        let row = self
            .position
            .ok_or_else(|| RowdocError::Driver("cursor is not positioned on a row".into()))?;
        self.rows[row]
            .get(index)
            .ok_or_else(|| RowdocError::Driver(format!("column index {} out of range", index)))
    }

    fn text_cell(&self, index: usize) -> Result<String> {
        use rusqlite::types::Value;
        match self.cell(index)? {
            // Null reached only via the streamed fetch-first path; the null
            // test afterwards discards this.
            Value::Null => Ok(String::new()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Real(f) => Ok(f.to_string()),
            Value::Text(s) => Ok(s.clone()),
            Value::Blob(b) => std::str::from_utf8(b)
                .map(|s| s.to_string())
                .map_err(|e| RowdocError::Column(format!("blob is not text: {}", e))),
        }
    }
}

#[async_trait]
impl ResultCursor for SqliteCursor {
    async fn next_row(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(self.rows.len());
            Ok(false)
        }
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> Result<String> {
        self.columns
            .get(index)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| RowdocError::Driver(format!("column index {} out of range", index)))
    }

    fn column_type(&self, index: usize) -> Result<ColumnType> {
        self.columns
            .get(index)
            .map(|(_, ty)| *ty)
            .ok_or_else(|| RowdocError::Driver(format!("column index {} out of range", index)))
    }

    async fn is_null(&mut self, index: usize) -> Result<bool> {
        Ok(matches!(self.cell(index)?, rusqlite::types::Value::Null))
    }

    async fn get_i64(&mut self, index: usize) -> Result<i64> {
        match self.cell(index)? {
            rusqlite::types::Value::Integer(i) => Ok(*i),
            other => Err(RowdocError::Column(format!(
                "column {} is not an integer: {:?}",
                index, other
            ))),
        }
    }

    async fn get_f64(&mut self, index: usize) -> Result<f64> {
        match self.cell(index)? {
            rusqlite::types::Value::Real(f) => Ok(*f),
            rusqlite::types::Value::Integer(i) => Ok(*i as f64),
            other => Err(RowdocError::Column(format!(
                "column {} is not a float: {:?}",
                index, other
            ))),
        }
    }

    async fn get_legacy_text(&mut self, index: usize) -> Result<Vec<u8>> {
        Ok(encode_legacy(&self.text_cell(index)?))
    }

    async fn get_wide_text(&mut self, index: usize) -> Result<Vec<u16>> {
        Ok(self.text_cell(index)?.encode_utf16().collect())
    }

    async fn get_bytes(&mut self, index: usize) -> Result<Vec<u8>> {
        use rusqlite::types::Value;
        match self.cell(index)? {
            Value::Null => Ok(Vec::new()),
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.clone().into_bytes()),
            other => Err(RowdocError::Column(format!(
                "column {} is not binary: {:?}",
                index, other
            ))),
        }
    }
}

/// Map a declared column type onto the converter's type codes.
fn column_type_from_decl(decl: Option<&str>) -> ColumnType {
    let Some(decl) = decl else {
        return ColumnType::Other(0);
    };
    let upper = decl.to_uppercase();

    if upper.contains("BIGINT") {
        ColumnType::BigInt
    } else if upper.contains("SMALLINT") {
        ColumnType::SmallInt
    } else if upper.contains("TINYINT") {
        ColumnType::TinyInt
    } else if upper.contains("INT") {
        ColumnType::Integer
    } else if upper.contains("NVARCHAR") || upper.contains("NCHAR") {
        ColumnType::WVarChar
    } else if upper.contains("VARCHAR") {
        ColumnType::VarChar
    } else if upper.contains("CHAR") {
        ColumnType::Char
    } else if upper.contains("NTEXT") {
        ColumnType::WLongVarChar
    } else if upper.contains("TEXT") || upper.contains("MEMO") || upper.contains("CLOB") {
        ColumnType::LongVarChar
    } else if upper.contains("BLOB") || upper.contains("BINARY") {
        ColumnType::LongVarBinary
    } else if upper.contains("NUMERIC") {
        ColumnType::Numeric
    } else if upper.contains("DECIMAL") {
        ColumnType::Decimal
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        ColumnType::Double
    } else {
        ColumnType::Other(0)
    }
}

/// Statements arrive legacy-encoded (windows-1252); SQLite wants UTF-8.
fn decode_statement(statement: &[u8]) -> String {
    WINDOWS_1252
        .decode_without_bom_handling(statement)
        .0
        .into_owned()
}

/// SQLite stores UTF-8; legacy text reads re-encode to windows-1252 with
/// '?' for characters outside the repertoire.
fn encode_legacy(text: &str) -> Vec<u8> {
    let mut encoder = WINDOWS_1252.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 1024];
    let mut remaining = text;
    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(remaining, &mut buf, true);
        out.extend_from_slice(&buf[..written]);
        remaining = &remaining[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => continue,
            EncoderResult::Unmappable(_) => out.push(b'?'),
        }
    }
    out
}
