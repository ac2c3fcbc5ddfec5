//! Driver column type codes and the category dispatch table

use std::collections::HashMap;

/// Driver-reported column type, as the transport declares it.
///
/// The named variants cover the codes the extractor dispatches on;
/// everything else is carried through as `Other` with the raw driver code so
/// the fallback path can still log what it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    VarChar,
    LongVarChar,
    WChar,
    WVarChar,
    WLongVarChar,
    LongVarBinary,
    /// Any other driver type code
    Other(i16),
}

impl ColumnType {
    /// Map a raw ODBC-style type code onto a `ColumnType`.
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => ColumnType::Char,
            2 => ColumnType::Numeric,
            3 => ColumnType::Decimal,
            4 => ColumnType::Integer,
            5 => ColumnType::SmallInt,
            6 => ColumnType::Float,
            7 => ColumnType::Real,
            8 => ColumnType::Double,
            12 => ColumnType::VarChar,
            -1 => ColumnType::LongVarChar,
            -4 => ColumnType::LongVarBinary,
            -5 => ColumnType::BigInt,
            -6 => ColumnType::TinyInt,
            -8 => ColumnType::WChar,
            -9 => ColumnType::WVarChar,
            -10 => ColumnType::WLongVarChar,
            other => ColumnType::Other(other),
        }
    }

    /// The raw ODBC-style code for this type.
    pub fn code(&self) -> i16 {
        match self {
            ColumnType::Char => 1,
            ColumnType::Numeric => 2,
            ColumnType::Decimal => 3,
            ColumnType::Integer => 4,
            ColumnType::SmallInt => 5,
            ColumnType::Float => 6,
            ColumnType::Real => 7,
            ColumnType::Double => 8,
            ColumnType::VarChar => 12,
            ColumnType::LongVarChar => -1,
            ColumnType::LongVarBinary => -4,
            ColumnType::BigInt => -5,
            ColumnType::TinyInt => -6,
            ColumnType::WChar => -8,
            ColumnType::WVarChar => -9,
            ColumnType::WLongVarChar => -10,
            ColumnType::Other(code) => *code,
        }
    }
}

/// Extraction category for a column.
///
/// The category decides two things: how the raw value is read (integer,
/// double, legacy bytes, wide text, raw bytes) and when the column's null
/// state may be queried. Bound (fixed-width) categories must be tested for
/// null *before* any typed read; streamed categories only report a reliable
/// null state *after* a fetch was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCategory {
    /// tinyint/smallint/integer/bigint, read as i64
    SmallInteger,
    /// float/real/double/numeric/decimal, read as f64
    FloatingPoint,
    /// char/varchar, legacy-encoded bytes transcoded to UTF-8
    LegacyText,
    /// wchar/wvarchar, wide text transcoded to UTF-8
    UnicodeText,
    /// long varchar: fetch first, then test null
    StreamedLegacyText,
    /// long wvarchar: fetch first, then test null
    StreamedUnicodeText,
    /// long varbinary: fetch first, then test null
    StreamedBinary,
    /// Anything else: best-effort read through the legacy text path
    Unrepresented,
}

impl ColumnCategory {
    /// Whether the category's null state is only determinable after a fetch.
    pub fn is_streamed(&self) -> bool {
        matches!(
            self,
            ColumnCategory::StreamedLegacyText
                | ColumnCategory::StreamedUnicodeText
                | ColumnCategory::StreamedBinary
        )
    }
}

/// The type-code → category table.
///
/// The default mapping treats plain char/varchar as legacy-encoded text.
/// Some sources declare those columns but store wide text in them; rather
/// than hard-coding one answer, the mapping is overridable per type:
///
/// ```
/// use rowdoc_core::{CategoryMap, ColumnCategory, ColumnType};
///
/// let map = CategoryMap::default()
///     .with_override(ColumnType::VarChar, ColumnCategory::UnicodeText);
/// assert_eq!(map.categorize(ColumnType::VarChar), ColumnCategory::UnicodeText);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CategoryMap {
    overrides: HashMap<ColumnType, ColumnCategory>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a column type to a different category than the default table.
    pub fn with_override(mut self, ty: ColumnType, category: ColumnCategory) -> Self {
        self.overrides.insert(ty, category);
        self
    }

    /// Total mapping from driver type to extraction category.
    pub fn categorize(&self, ty: ColumnType) -> ColumnCategory {
        if let Some(category) = self.overrides.get(&ty) {
            return *category;
        }
        match ty {
            ColumnType::TinyInt
            | ColumnType::SmallInt
            | ColumnType::Integer
            | ColumnType::BigInt => ColumnCategory::SmallInteger,

            ColumnType::Float
            | ColumnType::Real
            | ColumnType::Double
            | ColumnType::Numeric
            | ColumnType::Decimal => ColumnCategory::FloatingPoint,

            ColumnType::Char | ColumnType::VarChar => ColumnCategory::LegacyText,
            ColumnType::WChar | ColumnType::WVarChar => ColumnCategory::UnicodeText,

            ColumnType::LongVarChar => ColumnCategory::StreamedLegacyText,
            ColumnType::WLongVarChar => ColumnCategory::StreamedUnicodeText,
            ColumnType::LongVarBinary => ColumnCategory::StreamedBinary,

            ColumnType::Other(_) => ColumnCategory::Unrepresented,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes_round_trip() {
        for code in [-10, -9, -8, -6, -5, -4, -1, 1, 2, 3, 4, 5, 6, 7, 8, 12, 99] {
            assert_eq!(ColumnType::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_default_table_matches_driver_contract() {
        let map = CategoryMap::default();
        assert_eq!(
            map.categorize(ColumnType::BigInt),
            ColumnCategory::SmallInteger
        );
        assert_eq!(
            map.categorize(ColumnType::Decimal),
            ColumnCategory::FloatingPoint
        );
        assert_eq!(map.categorize(ColumnType::VarChar), ColumnCategory::LegacyText);
        assert_eq!(map.categorize(ColumnType::WChar), ColumnCategory::UnicodeText);
        assert_eq!(
            map.categorize(ColumnType::LongVarChar),
            ColumnCategory::StreamedLegacyText
        );
        assert_eq!(
            map.categorize(ColumnType::WLongVarChar),
            ColumnCategory::StreamedUnicodeText
        );
        assert_eq!(
            map.categorize(ColumnType::LongVarBinary),
            ColumnCategory::StreamedBinary
        );
        assert_eq!(
            map.categorize(ColumnType::Other(-98)),
            ColumnCategory::Unrepresented
        );
    }

    #[test]
    fn test_override_rewires_a_single_type() {
        let map = CategoryMap::default()
            .with_override(ColumnType::Char, ColumnCategory::UnicodeText);
        assert_eq!(map.categorize(ColumnType::Char), ColumnCategory::UnicodeText);
        // Sibling type keeps the default route.
        assert_eq!(map.categorize(ColumnType::VarChar), ColumnCategory::LegacyText);
    }

    #[test]
    fn test_streamed_flag() {
        assert!(ColumnCategory::StreamedBinary.is_streamed());
        assert!(ColumnCategory::StreamedLegacyText.is_streamed());
        assert!(ColumnCategory::StreamedUnicodeText.is_streamed());
        assert!(!ColumnCategory::SmallInteger.is_streamed());
        assert!(!ColumnCategory::Unrepresented.is_streamed());
    }
}
