//! Index snapshots
//!
//! `Index::flush` captures every field's forward index (plus the relevance
//! counters of text fields) into an [`IndexSnapshot`]; `Index::restore`
//! rebuilds an equivalent index. The caller owns the bytes and any file I/O.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::schema::{FieldType, IndexMapping};
use crate::store::{DocumentId, RelevanceStore};

/// Snapshot version for compatibility checking
pub const SNAPSHOT_VERSION: u32 = 1;

/// Forward index of one field, keyed by value type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StoreSnapshot {
    Bool(Vec<(DocumentId, Vec<bool>)>),
    Keyword(Vec<(DocumentId, Vec<String>)>),
    Text(Vec<(DocumentId, Vec<String>)>),
    Byte(Vec<(DocumentId, Vec<i8>)>),
    Short(Vec<(DocumentId, Vec<i16>)>),
    Integer(Vec<(DocumentId, Vec<i32>)>),
    Long(Vec<(DocumentId, Vec<i64>)>),
    UnsignedLong(Vec<(DocumentId, Vec<u64>)>),
    Float(Vec<(DocumentId, Vec<OrderedFloat<f32>>)>),
    Double(Vec<(DocumentId, Vec<OrderedFloat<f64>>)>),
    All(Vec<(DocumentId, Vec<bool>)>),
}

/// Contents of one field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub name: String,
    pub field_type: FieldType,
    pub store: StoreSnapshot,
    pub relevance: Option<RelevanceStore>,
}

/// Complete snapshot of an index
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: u32,
    pub name: String,
    /// Mapping in its JSON form
    mapping: String,
    pub fields: Vec<FieldSnapshot>,
}

impl IndexSnapshot {
    /// Create a new snapshot with the current version
    pub fn new(name: impl Into<String>, mapping: &IndexMapping, fields: Vec<FieldSnapshot>) -> Result<Self> {
        let mapping = serde_json::to_string(mapping)
            .map_err(|e| SearchError::Internal(format!("failed to encode mapping: {}", e)))?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            name: name.into(),
            mapping,
            fields,
        })
    }

    /// Decode the stored mapping
    pub fn mapping(&self) -> Result<IndexMapping> {
        serde_json::from_str(&self.mapping)
            .map_err(|e| SearchError::Schema(format!("snapshot mapping is invalid: {}", e)))
    }

    /// Serialize snapshot to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize snapshot from bytes, rejecting newer versions
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let snapshot: Self = bincode::deserialize(data)?;
        if !snapshot.is_compatible() {
            return Err(SearchError::IncompatibleSnapshot {
                expected: SNAPSHOT_VERSION,
                actual: snapshot.version,
            });
        }
        Ok(snapshot)
    }

    /// Check if this snapshot version is compatible
    pub fn is_compatible(&self) -> bool {
        self.version <= SNAPSHOT_VERSION
    }
}
