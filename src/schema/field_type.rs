//! Field type definitions
//!
//! Defines the value kinds a field can hold and what each kind supports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Field data type
///
/// Scalar types map one-to-one onto a typed posting store. `Slice` and `Map`
/// are composite declarations that expand into scalar fields when the index is
/// built. `All` is the synthetic match-all field and cannot be declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Boolean value
    Bool,
    /// Exact-match string, indexed as a single term
    Keyword,
    /// Analyzed string; every token is a separate term and feeds BM25
    Text,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 64-bit unsigned integer
    UnsignedLong,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Repeated values of a single child type
    Slice,
    /// Nested object whose children become `parent.child` fields
    Map,
    /// Synthetic "document exists" field
    All,
}

impl FieldType {
    /// Check if this is a composite (slice/map) declaration
    pub fn is_composite(&self) -> bool {
        matches!(self, FieldType::Slice | FieldType::Map)
    }

    /// Check if this type is analyzed into tokens
    pub fn is_analyzed(&self) -> bool {
        matches!(self, FieldType::Text)
    }

    /// Check if this is one of the numeric kinds
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Byte
                | FieldType::Short
                | FieldType::Integer
                | FieldType::Long
                | FieldType::UnsignedLong
                | FieldType::Float
                | FieldType::Double
        )
    }

    /// Check if this type may appear in a user schema
    pub fn is_declarable(&self) -> bool {
        !matches!(self, FieldType::All)
    }

    /// Get the schema name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Byte => "byte",
            FieldType::Short => "short",
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::UnsignedLong => "unsigned_long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Slice => "slice",
            FieldType::Map => "map",
            FieldType::All => "all",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_kinds() {
        assert!(FieldType::Slice.is_composite());
        assert!(FieldType::Map.is_composite());
        assert!(!FieldType::Keyword.is_composite());

        assert!(FieldType::Text.is_analyzed());
        assert!(!FieldType::Keyword.is_analyzed());

        assert!(FieldType::UnsignedLong.is_numeric());
        assert!(FieldType::Float.is_numeric());
        assert!(!FieldType::Bool.is_numeric());

        assert!(!FieldType::All.is_declarable());
        assert!(FieldType::Bool.is_declarable());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&FieldType::UnsignedLong).unwrap();
        assert_eq!(json, "\"unsigned_long\"");

        let parsed: FieldType = serde_json::from_str("\"double\"").unwrap();
        assert_eq!(parsed, FieldType::Double);
        assert_eq!(parsed.to_string(), "double");
    }
}
