//! Document import
//!
//! Two phases against the destination:
//!
//! 1. Clear every destination table in deletion order (children before
//!    parents), recording affected row counts. Any failure here is fatal:
//!    continuing would insert into tables that still hold old rows.
//! 2. Insert in creation order (parents before children), one transaction
//!    per table. A failing row rolls back its table and the import moves on
//!    to the next table; the summary records which tables made it.
//!
//! Empty row objects are skipped, not inserted. A table named in the order
//! but absent from the document simply gets zero inserts.

use crate::document::Document;
use crate::statement;
use rowdoc_core::{Connection, DependencyOrder, RowdocError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort an import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to clear table '{table}': {source}")]
    Deletion {
        table: String,
        #[source]
        source: RowdocError,
    },
}

/// A table whose transaction was rolled back.
#[derive(Debug, Clone)]
pub struct TableFailure {
    pub table: String,
    pub reason: String,
}

/// What the import did, table by table.
#[derive(Debug, Default)]
pub struct ImportSummary {
    /// (table, rows affected by the DELETE), in deletion order
    pub deleted: Vec<(String, u64)>,
    /// (table, rows inserted), in creation order, committed tables only
    pub inserted: Vec<(String, usize)>,
    /// Tables rolled back during the insertion phase
    pub failures: Vec<TableFailure>,
}

impl ImportSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_inserted(&self) -> usize {
        self.inserted.iter().map(|(_, n)| n).sum()
    }
}

/// Replays a document into the destination.
pub struct Importer {
    connection: Arc<dyn Connection>,
    order: DependencyOrder,
}

impl Importer {
    pub fn new(connection: Arc<dyn Connection>, order: DependencyOrder) -> Self {
        Self { connection, order }
    }

    /// Run both phases. The summary lists per-table outcomes; only a
    /// deletion-phase failure aborts.
    pub async fn import(&self, document: &Document) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary::default();

        for table in self.order.deletion() {
            let affected = self.clear_table(table).await?;
            summary.deleted.push((table.clone(), affected));
        }

        for table in self.order.creation() {
            match self.insert_table(table, document).await {
                Ok(rows) => summary.inserted.push((table.clone(), rows)),
                Err(reason) => {
                    warn!(table = %table, %reason, "table rolled back");
                    summary.failures.push(TableFailure {
                        table: table.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            tables = summary.inserted.len(),
            rows = summary.total_inserted(),
            failed_tables = summary.failures.len(),
            "import complete"
        );
        Ok(summary)
    }

    async fn clear_table(&self, table: &str) -> Result<u64, ImportError> {
        let fail = |source: RowdocError| ImportError::Deletion {
            table: table.to_string(),
            source,
        };

        let delete = statement::build_delete(table)
            .map_err(|e| fail(RowdocError::Other(e.to_string())))?;
        let affected = self.connection.execute(&delete).await.map_err(fail)?;
        info!(table = %table, affected, "table cleared");
        Ok(affected)
    }

    /// Insert one table inside its own transaction. The error string is the
    /// rollback reason for the summary.
    async fn insert_table(&self, table: &str, document: &Document) -> Result<usize, String> {
        let rows = match document.table_rows(table) {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                debug!(table = %table, "no rows in document");
                return Ok(0);
            }
        };

        let tx = self
            .connection
            .begin_transaction()
            .await
            .map_err(|e| format!("failed to begin transaction: {e}"))?;

        let mut inserted = 0usize;
        for row in rows.iter() {
            let insert = match statement::build_insert(table, row) {
                Ok(Some(insert)) => insert,
                Ok(None) => {
                    debug!(table = %table, "skipping empty row object");
                    continue;
                }
                Err(error) => {
                    rollback(tx, table).await;
                    return Err(error.to_string());
                }
            };
            if let Err(error) = tx.execute(&insert).await {
                rollback(tx, table).await;
                return Err(format!("row {inserted} failed: {error}"));
            }
            inserted += 1;
        }

        tx.commit()
            .await
            .map_err(|e| format!("commit failed: {e}"))?;
        info!(table = %table, rows = inserted, "table imported");
        Ok(inserted)
    }
}

async fn rollback(tx: Box<dyn rowdoc_core::Transaction>, table: &str) {
    if let Err(error) = tx.rollback().await {
        warn!(table = %table, %error, "rollback failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode;
    use async_trait::async_trait;
    use rowdoc_core::{Result, ResultCursor, Transaction};
    use std::sync::Mutex;

    /// Connection double that logs every statement and transaction event in
    /// order, and can be told to fail statements containing a substring.
    struct TrackingConnection {
        log: Arc<Mutex<Vec<String>>>,
        fail_on: Vec<String>,
        affected: u64,
    }

    impl TrackingConnection {
        fn new() -> Self {
            Self {
                log: Arc::new(Mutex::new(Vec::new())),
                fail_on: Vec::new(),
                affected: 3,
            }
        }

        fn failing_on(mut self, needle: &str) -> Self {
            self.fail_on.push(needle.to_string());
            self
        }

        fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
            Arc::clone(&self.log)
        }
    }

    fn decode(statement: &[u8]) -> String {
        transcode::legacy_to_utf8(statement).unwrap_or_else(|_| String::new())
    }

    fn run_statement(
        log: &Arc<Mutex<Vec<String>>>,
        fail_on: &[String],
        statement: &[u8],
    ) -> Result<u64> {
        let text = decode(statement);
        if fail_on.iter().any(|needle| text.contains(needle)) {
            log.lock().unwrap().push(format!("FAILED {text}"));
            return Err(RowdocError::Query(format!("scripted failure: {text}")));
        }
        log.lock().unwrap().push(text);
        Ok(1)
    }

    #[async_trait]
    impl Connection for TrackingConnection {
        fn driver_name(&self) -> &str {
            "tracking"
        }

        async fn query(&self, _sql: &str) -> Result<Box<dyn ResultCursor>> {
            Err(RowdocError::NotSupported("tracking connection is write-only".into()))
        }

        async fn execute(&self, statement: &[u8]) -> Result<u64> {
            run_statement(&self.log, &self.fail_on, statement)?;
            Ok(self.affected)
        }

        async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
            self.log.lock().unwrap().push("BEGIN".into());
            Ok(Box::new(TrackingTransaction {
                log: Arc::clone(&self.log),
                fail_on: self.fail_on.clone(),
            }))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }

        fn is_closed(&self) -> bool {
            false
        }
    }

    struct TrackingTransaction {
        log: Arc<Mutex<Vec<String>>>,
        fail_on: Vec<String>,
    }

    #[async_trait]
    impl Transaction for TrackingTransaction {
        async fn execute(&self, statement: &[u8]) -> Result<u64> {
            run_statement(&self.log, &self.fail_on, statement)
        }

        async fn commit(self: Box<Self>) -> Result<()> {
            self.log.lock().unwrap().push("COMMIT".into());
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            self.log.lock().unwrap().push("ROLLBACK".into());
            Ok(())
        }
    }

    fn order(deletion: &[&str], creation: &[&str]) -> DependencyOrder {
        DependencyOrder::new(
            deletion.iter().map(|s| s.to_string()).collect(),
            creation.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    fn document(json: &str) -> Document {
        Document::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_deletes_children_first_then_inserts_parents_first() {
        let connection = TrackingConnection::new();
        let log = connection.log_handle();
        let importer = Importer::new(
            Arc::new(connection),
            order(&["Child", "Parent"], &["Parent", "Child"]),
        );

        let doc = document(
            r#"{"version":"1.0.0","schema":{
                "Parent":[{"id":1}],
                "Child":[{"id":10,"parent":1}]
            }}"#,
        );
        let summary = importer.import(&doc).await.unwrap();

        assert!(summary.is_clean());
        assert_eq!(summary.deleted, [("Child".to_string(), 3), ("Parent".to_string(), 3)]);
        assert_eq!(
            summary.inserted,
            [("Parent".to_string(), 1), ("Child".to_string(), 1)]
        );

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            [
                "DELETE FROM Child",
                "DELETE FROM Parent",
                "BEGIN",
                "INSERT INTO Parent (id) VALUES (1)",
                "COMMIT",
                "BEGIN",
                "INSERT INTO Child (id, parent) VALUES (10, 1)",
                "COMMIT",
            ]
        );
    }

    #[tokio::test]
    async fn test_deletion_failure_is_fatal() {
        let connection = TrackingConnection::new().failing_on("DELETE FROM Parent");
        let importer = Importer::new(
            Arc::new(connection),
            order(&["Child", "Parent"], &["Parent", "Child"]),
        );

        let doc = document(r#"{"version":"1.0.0","schema":{}}"#);
        let err = importer.import(&doc).await.unwrap_err();
        assert!(matches!(err, ImportError::Deletion { table, .. } if table == "Parent"));
    }

    #[tokio::test]
    async fn test_failing_row_rolls_back_only_its_table() {
        let connection = TrackingConnection::new().failing_on("INSERT INTO B");
        let log = connection.log_handle();
        let importer = Importer::new(Arc::new(connection), order(&["C", "B", "A"], &["A", "B", "C"]));

        let doc = document(
            r#"{"version":"1.0.0","schema":{
                "A":[{"id":1}],
                "B":[{"id":2}],
                "C":[{"id":3}]
            }}"#,
        );
        let summary = importer.import(&doc).await.unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].table, "B");
        assert_eq!(summary.inserted, [("A".to_string(), 1), ("C".to_string(), 1)]);

        let log = log.lock().unwrap();
        let b_fail = log.iter().position(|l| l.starts_with("FAILED INSERT INTO B")).unwrap();
        assert_eq!(log[b_fail + 1], "ROLLBACK");
        assert!(log.contains(&"INSERT INTO C (id) VALUES (3)".to_string()));
    }

    #[tokio::test]
    async fn test_unsupported_cell_aborts_its_table() {
        let connection = TrackingConnection::new();
        let log = connection.log_handle();
        let importer = Importer::new(Arc::new(connection), order(&["T", "U"], &["U", "T"]));

        let doc = document(
            r#"{"version":"1.0.0","schema":{
                "U":[{"flag":true}],
                "T":[{"id":1}]
            }}"#,
        );
        let summary = importer.import(&doc).await.unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].table, "U");
        assert!(summary.failures[0].reason.contains("unsupported value kind"));
        assert_eq!(summary.inserted, [("T".to_string(), 1)]);

        let log = log.lock().unwrap();
        assert!(!log.iter().any(|l| l.contains("INSERT INTO U")));
        assert!(log.contains(&"ROLLBACK".to_string()));
    }

    #[tokio::test]
    async fn test_empty_row_objects_are_skipped() {
        let connection = TrackingConnection::new();
        let log = connection.log_handle();
        let importer = Importer::new(Arc::new(connection), order(&["T"], &["T"]));

        let doc = document(r#"{"version":"1.0.0","schema":{"T":[{},{"id":1},{}]}}"#);
        let summary = importer.import(&doc).await.unwrap();

        assert_eq!(summary.inserted, [("T".to_string(), 1)]);
        let log = log.lock().unwrap();
        let inserts = log.iter().filter(|l| l.starts_with("INSERT")).count();
        assert_eq!(inserts, 1);
    }

    #[tokio::test]
    async fn test_table_missing_from_document_inserts_nothing() {
        let connection = TrackingConnection::new();
        let log = connection.log_handle();
        let importer = Importer::new(Arc::new(connection), order(&["Gone", "T"], &["T", "Gone"]));

        let doc = document(r#"{"version":"1.0.0","schema":{"T":[{"id":1}]}}"#);
        let summary = importer.import(&doc).await.unwrap();

        assert!(summary.is_clean());
        assert_eq!(
            summary.inserted,
            [("T".to_string(), 1), ("Gone".to_string(), 0)]
        );
        // Still cleared, though: the order names it.
        assert_eq!(summary.deleted[0].0, "Gone");
        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|l| *l == "BEGIN").count(), 1);
    }

    #[tokio::test]
    async fn test_accented_text_reaches_the_destination_encoded() {
        struct ByteCheck {
            log: Arc<Mutex<Vec<Vec<u8>>>>,
        }

        #[async_trait]
        impl Connection for ByteCheck {
            fn driver_name(&self) -> &str {
                "bytes"
            }
            async fn query(&self, _sql: &str) -> Result<Box<dyn ResultCursor>> {
                Err(RowdocError::NotSupported("write-only".into()))
            }
            async fn execute(&self, statement: &[u8]) -> Result<u64> {
                self.log.lock().unwrap().push(statement.to_vec());
                Ok(0)
            }
            async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
                Ok(Box::new(ByteCheckTx {
                    log: Arc::clone(&self.log),
                }))
            }
            async fn close(&self) -> Result<()> {
                Ok(())
            }
            fn is_closed(&self) -> bool {
                false
            }
        }

        struct ByteCheckTx {
            log: Arc<Mutex<Vec<Vec<u8>>>>,
        }

        #[async_trait]
        impl Transaction for ByteCheckTx {
            async fn execute(&self, statement: &[u8]) -> Result<u64> {
                self.log.lock().unwrap().push(statement.to_vec());
                Ok(1)
            }
            async fn commit(self: Box<Self>) -> Result<()> {
                Ok(())
            }
            async fn rollback(self: Box<Self>) -> Result<()> {
                Ok(())
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let importer = Importer::new(
            Arc::new(ByteCheck {
                log: Arc::clone(&log),
            }),
            order(&["T"], &["T"]),
        );

        let doc = document(r#"{"version":"1.0.0","schema":{"T":[{"label":"café"}]}}"#);
        importer.import(&doc).await.unwrap();

        let log = log.lock().unwrap();
        let insert = log.iter().find(|s| s.starts_with(b"INSERT")).unwrap();
        assert_eq!(
            insert.as_slice(),
            b"INSERT INTO T (label) VALUES ('caf\xE9')"
        );
    }
}
