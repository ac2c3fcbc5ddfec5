//! ROWDOC Interchange - rows ↔ document conversion
//!
//! This crate implements both directions of the converter:
//!
//! - Export: drive a result cursor through the column extractor and the
//!   text transcoder, assemble the rows into a versioned JSON document.
//! - Import: validate the document envelope, delete destination tables in
//!   dependency order, rebuild and execute INSERT statements in the inverse
//!   order, one transaction per table.
//!
//! The extractor (`extract`) and the transcoder (`transcode`) are the
//! correctness-critical pieces; both are pure over the cursor contract and
//! unit-tested against protocol-enforcing mocks.

pub mod columnar;
pub mod document;
pub mod exporter;
pub mod extract;
pub mod importer;
pub mod statement;
pub mod transcode;

pub use columnar::{document_to_columnar, table_from_columnar, table_to_columnar};
pub use document::{Document, DocumentFormatError, RowObject, TableRows};
pub use exporter::{ExportError, ExportOutcome, Exporter, TableReport};
pub use extract::{ColumnExtractionError, ColumnFailure, RowExtraction, extract_column, extract_row};
pub use importer::{ImportError, ImportSummary, Importer, TableFailure};
pub use transcode::TranscodeError;
