//! Table export
//!
//! Runs each configured extraction query, walks the cursor row by row
//! through the column extractor, and assembles the versioned document.
//! Tables land in the document in configuration order; rows keep the order
//! the query produced them in.
//!
//! A row with failed cells is still emitted (the cells degrade to null) and
//! the aggregate failure is logged and reported. Query and cursor metadata
//! errors abort the export.

use crate::document::{Document, TableRows};
use crate::extract::{self, ColumnExtractionError};
use rowdoc_core::{CategoryMap, Connection, RowdocError, TableExportSpec};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("table '{table}': {source}")]
    Table {
        table: String,
        #[source]
        source: RowdocError,
    },
}

/// Per-table export accounting.
#[derive(Debug)]
pub struct TableReport {
    pub table: String,
    pub row_count: usize,
    /// One entry per row that had failing cells
    pub failures: Vec<ColumnExtractionError>,
}

/// The assembled document plus per-table accounting.
#[derive(Debug)]
pub struct ExportOutcome {
    pub document: Document,
    pub reports: Vec<TableReport>,
}

impl ExportOutcome {
    pub fn is_clean(&self) -> bool {
        self.reports.iter().all(|r| r.failures.is_empty())
    }
}

/// Drives extraction queries into a document.
pub struct Exporter {
    connection: Arc<dyn Connection>,
    categories: CategoryMap,
}

impl Exporter {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            categories: CategoryMap::new(),
        }
    }

    /// Replace the default type categorization.
    pub fn with_categories(mut self, categories: CategoryMap) -> Self {
        self.categories = categories;
        self
    }

    /// Export every configured table into a fresh document.
    pub async fn export(&self, tables: &[TableExportSpec]) -> Result<ExportOutcome, ExportError> {
        let mut document = Document::new();
        let mut reports = Vec::with_capacity(tables.len());

        for spec in tables {
            let report = self.export_table(spec, &mut document).await?;
            reports.push(report);
        }

        info!(
            tables = reports.len(),
            rows = document.total_rows(),
            "export complete"
        );
        Ok(ExportOutcome { document, reports })
    }

    async fn export_table(
        &self,
        spec: &TableExportSpec,
        document: &mut Document,
    ) -> Result<TableReport, ExportError> {
        let fail = |source: RowdocError| ExportError::Table {
            table: spec.name.clone(),
            source,
        };

        let mut cursor = self.connection.query(&spec.query).await.map_err(fail)?;
        let mut rows = TableRows::new();
        let mut failures = Vec::new();

        while cursor.next_row().await.map_err(fail)? {
            let extraction = extract::extract_row(cursor.as_mut(), &self.categories)
                .await
                .map_err(fail)?;
            let (row, error) = extraction.into_parts();
            if let Some(error) = error {
                warn!(table = %spec.name, error = %error, "row extracted with column failures");
                failures.push(error);
            }
            rows.push(row);
        }

        debug!(table = %spec.name, rows = rows.len(), bad_rows = failures.len(), "table exported");
        let row_count = rows.len();
        document.schema.insert(spec.name.clone(), rows);

        Ok(TableReport {
            table: spec.name.clone(),
            row_count,
            failures,
        })
    }
}
