//! DML statement assembly
//!
//! The import path writes by concatenating literals into plain DELETE and
//! INSERT statements; there is no parameter binding across the destination
//! drivers. Statements leave here as legacy-encoded (windows-1252) bytes
//! because the destination expects its own code page, not UTF-8.
//!
//! Only the scalar cell kinds have a literal form. Booleans, arrays and
//! nested objects parse fine at the document layer but have no destination
//! representation, so building a literal from one is an error the importer
//! turns into a table-level abort.

use crate::document::RowObject;
use crate::transcode::{self, TranscodeError};
use thiserror::Error;

/// Errors raised while building a statement from document cells.
#[derive(Debug, Error)]
pub enum StatementError {
    #[error("unsupported value kind '{kind}' for column '{column}'")]
    UnsupportedValueKind { column: String, kind: &'static str },

    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

/// Render one cell as a SQL literal.
///
/// `NULL` bare, integers as digits, reals via their shortest decimal form,
/// text single-quoted with embedded quotes doubled.
pub fn literal(column: &str, value: &serde_json::Value) -> Result<String, StatementError> {
    match value {
        serde_json::Value::Null => Ok("NULL".to_string()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                // serde_json numbers are i64, u64 or finite f64.
                Ok(n.as_f64().unwrap_or_default().to_string())
            }
        }
        serde_json::Value::String(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        serde_json::Value::Bool(_) => Err(StatementError::UnsupportedValueKind {
            column: column.to_string(),
            kind: "boolean",
        }),
        serde_json::Value::Array(_) => Err(StatementError::UnsupportedValueKind {
            column: column.to_string(),
            kind: "array",
        }),
        serde_json::Value::Object(_) => Err(StatementError::UnsupportedValueKind {
            column: column.to_string(),
            kind: "object",
        }),
    }
}

/// Build the INSERT for one row, replaying the row's member order verbatim
/// into the column and value lists.
///
/// Returns `Ok(None)` for an empty row object: there is nothing to insert
/// and skipping it is not an error.
pub fn build_insert(table: &str, row: &RowObject) -> Result<Option<Vec<u8>>, StatementError> {
    if row.is_empty() {
        return Ok(None);
    }

    let mut columns = String::new();
    let mut values = String::new();
    for (index, (column, cell)) in row.iter().enumerate() {
        if index > 0 {
            columns.push_str(", ");
            values.push_str(", ");
        }
        columns.push_str(column);
        values.push_str(&literal(column, cell)?);
    }

    let statement = format!("INSERT INTO {table} ({columns}) VALUES ({values})");
    Ok(Some(transcode::utf8_to_legacy(&statement)?))
}

/// Build the DELETE that clears one table.
pub fn build_delete(table: &str) -> Result<Vec<u8>, StatementError> {
    Ok(transcode::utf8_to_legacy(&format!("DELETE FROM {table}"))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_literals() {
        assert_eq!(literal("c", &json!(null)).unwrap(), "NULL");
        assert_eq!(literal("c", &json!(42)).unwrap(), "42");
        assert_eq!(literal("c", &json!(-7)).unwrap(), "-7");
        assert_eq!(literal("c", &json!(18446744073709551615u64)).unwrap(), "18446744073709551615");
        assert_eq!(literal("c", &json!(2.5)).unwrap(), "2.5");
        assert_eq!(literal("c", &json!("plain")).unwrap(), "'plain'");
    }

    #[test]
    fn test_embedded_quote_is_doubled() {
        assert_eq!(
            literal("c", &json!("it's here")).unwrap(),
            "'it''s here'"
        );
        assert_eq!(literal("c", &json!("''")).unwrap(), "''''''");
    }

    #[test]
    fn test_unsupported_kinds_are_rejected() {
        for (value, kind) in [
            (json!(true), "boolean"),
            (json!([1, 2]), "array"),
            (json!({"a": 1}), "object"),
        ] {
            let err = literal("flag", &value).unwrap_err();
            match err {
                StatementError::UnsupportedValueKind { column, kind: k } => {
                    assert_eq!(column, "flag");
                    assert_eq!(k, kind);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_insert_replays_member_order() {
        let mut row = RowObject::new();
        row.insert_json("zeta", json!(1));
        row.insert_json("alpha", json!("x"));
        row.insert_json("mid", json!(null));
        let statement = build_insert("Tags", &row).unwrap().unwrap();
        assert_eq!(
            statement,
            b"INSERT INTO Tags (zeta, alpha, mid) VALUES (1, 'x', NULL)"
        );
    }

    #[test]
    fn test_empty_row_builds_nothing() {
        assert!(build_insert("Tags", &RowObject::new()).unwrap().is_none());
    }

    /// Text re-encodes to the destination code page; 'é' is the single
    /// byte 0xE9 in windows-1252.
    #[test]
    fn test_text_is_encoded_to_the_legacy_code_page() {
        let mut row = RowObject::new();
        row.insert_json("label", json!("café"));
        let statement = build_insert("T", &row).unwrap().unwrap();
        assert_eq!(statement, b"INSERT INTO T (label) VALUES ('caf\xE9')");
    }

    #[test]
    fn test_character_outside_the_code_page_degrades() {
        let mut row = RowObject::new();
        row.insert_json("label", json!("日"));
        let statement = build_insert("T", &row).unwrap().unwrap();
        assert_eq!(statement, b"INSERT INTO T (label) VALUES ('?')");
    }

    #[test]
    fn test_delete_statement() {
        assert_eq!(build_delete("Tags").unwrap(), b"DELETE FROM Tags");
    }
}
