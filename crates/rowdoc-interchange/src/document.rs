//! Document model and envelope validation
//!
//! The document is the export output and the import input:
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "schema": {
//!     "<tableName>": [ { "<col>": <value>, ... }, ... ]
//!   }
//! }
//! ```
//!
//! Member order is load-bearing. A row re-emitted from a document must
//! reproduce the member order it was read in, because the import path walks
//! the members in stored order when it builds the column list and value
//! list of an INSERT statement. Every map in this module preserves
//! insertion order.
//!
//! Cells are plain JSON values rather than `TypedValue`s: a document whose
//! cells fall outside the supported scalar kinds still parses, and the
//! offending cell is only rejected when the importer tries to build a
//! literal from it.

use indexmap::IndexMap;
use rowdoc_core::TypedValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version stamped on every exported document.
pub const DOCUMENT_VERSION: &str = "1.0.0";

/// Errors raised while validating the document envelope.
///
/// All of these are fatal and are raised before any statement is issued.
#[derive(Debug, Error)]
pub enum DocumentFormatError {
    #[error("document is missing the required 'version' member")]
    MissingVersion,

    #[error("document 'version' must be a string")]
    VersionNotString,

    #[error("document is missing the required 'schema' member")]
    MissingSchema,

    #[error("document 'schema' must be a mapping of table name to row array")]
    SchemaNotMapping,

    #[error("table '{table}' must be an array of row objects")]
    TableNotArray { table: String },

    #[error("table '{table}' contains a non-object row (index {index})")]
    RowNotObject { table: String, index: usize },

    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One row: an ordered mapping from column name to cell value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowObject(serde_json::Map<String, serde_json::Value>);

impl RowObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a marshaled value under `column`, keeping insertion order.
    pub fn insert(&mut self, column: impl Into<String>, value: TypedValue) {
        self.0.insert(column.into(), value.into());
    }

    /// Append a raw JSON cell under `column`.
    pub fn insert_json(&mut self, column: impl Into<String>, value: serde_json::Value) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.0.get(column)
    }

    /// Members in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Column names in stored order.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, serde_json::Value)> for RowObject {
    fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// All exported rows of one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableRows(pub Vec<RowObject>);

impl TableRows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: RowObject) {
        self.0.push(row);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowObject> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The top-level export/import structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document format version
    pub version: String,
    /// Table name → rows, in export order
    pub schema: IndexMap<String, TableRows>,
}

/// Thin wrapper used solely to check envelope members before the shape of
/// the schema is validated. Keeping this private prevents callers from
/// relying on it for anything else.
#[derive(Deserialize)]
struct EnvelopeProbe {
    version: Option<serde_json::Value>,
    schema: Option<serde_json::Value>,
}

impl Document {
    /// Create an empty document stamped with the current version.
    pub fn new() -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            schema: IndexMap::new(),
        }
    }

    /// Parse and validate a document from JSON bytes.
    ///
    /// This is the only parsing entry point: it guarantees that `version`
    /// is a string, that `schema` is a mapping, and that every table value
    /// is an array of objects, before the caller gets a `Document` it could
    /// act on.
    pub fn from_slice(data: &[u8]) -> Result<Self, DocumentFormatError> {
        let probe: EnvelopeProbe = serde_json::from_slice(data)?;

        let version = match probe.version {
            None => return Err(DocumentFormatError::MissingVersion),
            Some(serde_json::Value::String(s)) => s,
            Some(_) => return Err(DocumentFormatError::VersionNotString),
        };

        let schema_value = match probe.schema {
            None => return Err(DocumentFormatError::MissingSchema),
            Some(serde_json::Value::Object(map)) => map,
            Some(_) => return Err(DocumentFormatError::SchemaNotMapping),
        };

        let mut schema = IndexMap::with_capacity(schema_value.len());
        for (table, value) in schema_value {
            let rows_value = match value {
                serde_json::Value::Array(rows) => rows,
                _ => return Err(DocumentFormatError::TableNotArray { table }),
            };
            let mut rows = TableRows::new();
            for (index, row) in rows_value.into_iter().enumerate() {
                match row {
                    serde_json::Value::Object(members) => rows.push(RowObject(members)),
                    _ => return Err(DocumentFormatError::RowNotObject { table, index }),
                }
            }
            schema.insert(table, rows);
        }

        Ok(Self { version, schema })
    }

    /// Parse and validate a document from a JSON string.
    pub fn from_str(json: &str) -> Result<Self, DocumentFormatError> {
        Self::from_slice(json.as_bytes())
    }

    /// Rows for one table, if the document carries it.
    pub fn table_rows(&self, table: &str) -> Option<&TableRows> {
        self.schema.get(table)
    }

    /// Total row count across all tables.
    pub fn total_rows(&self) -> usize {
        self.schema.values().map(TableRows::len).sum()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
