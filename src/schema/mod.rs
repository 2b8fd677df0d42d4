//! Schema and field type system
//!
//! This module defines the schema system for quarry, including:
//! - Field types (bool, keyword, text, the integer and float kinds)
//! - Composite declarations (slice, map) and their flattening
//! - Index mappings and their invariants

mod field_type;
mod mapping;

pub use field_type::FieldType;
pub use mapping::{FieldMapping, IndexMapping, LeafField, ALL_FIELD};
