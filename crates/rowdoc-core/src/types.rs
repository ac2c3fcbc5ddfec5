//! Core value types for ROWDOC

use serde::{Deserialize, Serialize};

/// A single marshaled column value.
///
/// This is the closed set of SQL value kinds the converter preserves.
/// Exactly one variant is active and there is no implicit coercion between
/// variants; anything the extractor cannot represent in one of these kinds
/// is read through the legacy-text fallback path instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    /// SQL NULL
    Null,
    /// 64-bit signed integer (tinyint through bigint)
    Integer(i64),
    /// IEEE double (float, real, double, numeric, decimal)
    Real(f64),
    /// UTF-8 text, already transcoded from the column's wire encoding
    Text(String),
    /// Raw binary value
    Blob(Vec<u8>),
}

impl TypedValue {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Real(v) => Some(*v),
            TypedValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Document-cell representation: blobs become arrays of 0-255 integers,
/// everything else maps onto the matching JSON kind.
impl From<TypedValue> for serde_json::Value {
    fn from(value: TypedValue) -> Self {
        match value {
            TypedValue::Null => serde_json::Value::Null,
            TypedValue::Integer(i) => serde_json::Value::Number(i.into()),
            TypedValue::Real(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                // JSON has no NaN/Infinity; a non-finite double degrades to
                // null rather than producing invalid output.
                .unwrap_or(serde_json::Value::Null),
            TypedValue::Text(s) => serde_json::Value::String(s),
            TypedValue::Blob(bytes) => serde_json::Value::Array(
                bytes
                    .into_iter()
                    .map(|b| serde_json::Value::Number(b.into()))
                    .collect(),
            ),
        }
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::Null => write!(f, "NULL"),
            TypedValue::Integer(v) => write!(f, "{}", v),
            TypedValue::Real(v) => write!(f, "{}", v),
            TypedValue::Text(v) => write!(f, "{}", v),
            TypedValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}
