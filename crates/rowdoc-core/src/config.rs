//! Export/import configuration
//!
//! The table list and the dependency orders are external configuration.
//! They are deserialized once, validated, and passed into the exporter and
//! importer at construction; nothing in the core computes them.

use crate::RowdocError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One table to export: a destination name and the query that produces its
/// rows (and their order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableExportSpec {
    /// Table name as it appears in the document
    pub name: String,
    /// Extraction query, including any ORDER BY
    pub query: String,
}

impl TableExportSpec {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
        }
    }
}

/// The two referential orderings over table identifiers.
///
/// `deletion` lists children before parents; `creation` lists parents before
/// children. Import always deletes in `deletion` order and inserts in
/// `creation` order. The orders are supplied, not derived, but they must
/// name the same set of tables or the import would delete tables it never
/// refills (or vice versa).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOrder {
    deletion: Vec<String>,
    creation: Vec<String>,
}

impl DependencyOrder {
    /// Build a validated order pair.
    pub fn new(
        deletion: Vec<String>,
        creation: Vec<String>,
    ) -> Result<Self, RowdocError> {
        let deletion_set: HashSet<&str> = deletion.iter().map(String::as_str).collect();
        let creation_set: HashSet<&str> = creation.iter().map(String::as_str).collect();
        if deletion_set.len() != deletion.len() || creation_set.len() != creation.len() {
            return Err(RowdocError::Configuration(
                "dependency orders must not repeat a table".into(),
            ));
        }
        if deletion_set != creation_set {
            return Err(RowdocError::Configuration(format!(
                "deletion order and creation order name different tables \
                 (deletion: [{}], creation: [{}])",
                deletion.join(", "),
                creation.join(", ")
            )));
        }
        Ok(Self { deletion, creation })
    }

    /// Tables in child-before-parent order, for the deletion phase.
    pub fn deletion(&self) -> &[String] {
        &self.deletion
    }

    /// Tables in parent-before-child order, for the insertion phase.
    pub fn creation(&self) -> &[String] {
        &self.creation
    }
}
