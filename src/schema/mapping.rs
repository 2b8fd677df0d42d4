//! Index mapping definitions
//!
//! A mapping declares every field of an index. It is fixed when the index is
//! created; composite declarations are flattened into scalar fields here.

use super::field_type::FieldType;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Name of the synthetic match-all field
pub const ALL_FIELD: &str = "_all";

/// Field mapping configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Reject documents that omit this field
    #[serde(default)]
    pub required: bool,

    /// Analyzer chain, by registry name (text only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analyzers: Vec<String>,

    /// Child declarations (slice/map only)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, FieldMapping>,
}

impl FieldMapping {
    /// Create a new field mapping with the given type
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            analyzers: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    /// Create a text field mapping with an analyzer chain
    pub fn text<I, S>(analyzers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut mapping = Self::new(FieldType::Text);
        mapping.analyzers = analyzers.into_iter().map(Into::into).collect();
        mapping
    }

    /// Create a keyword field mapping
    pub fn keyword() -> Self {
        Self::new(FieldType::Keyword)
    }

    /// Create a bool field mapping
    pub fn boolean() -> Self {
        Self::new(FieldType::Bool)
    }

    /// Create a long field mapping
    pub fn long() -> Self {
        Self::new(FieldType::Long)
    }

    /// Create a double field mapping
    pub fn double() -> Self {
        Self::new(FieldType::Double)
    }

    /// Create a slice mapping whose elements follow `element`
    pub fn slice(element: FieldMapping) -> Self {
        let mut mapping = Self::new(FieldType::Slice);
        mapping.children.insert("element".to_string(), element);
        mapping
    }

    /// Create an empty map mapping; add children with `with_child`
    pub fn map() -> Self {
        Self::new(FieldType::Map)
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Add a child declaration
    pub fn with_child(mut self, name: impl Into<String>, child: FieldMapping) -> Self {
        self.children.insert(name.into(), child);
        self
    }

    fn validate(&self, path: &str) -> Result<()> {
        if !self.field_type.is_declarable() {
            return Err(SearchError::Schema(format!(
                "{}: type '{}' cannot be declared",
                path, self.field_type
            )));
        }

        if self.field_type.is_analyzed() && self.analyzers.is_empty() {
            return Err(SearchError::Schema(format!(
                "{}: text fields must declare at least one analyzer",
                path
            )));
        }
        if !self.field_type.is_analyzed() && !self.analyzers.is_empty() {
            return Err(SearchError::Schema(format!(
                "{}: analyzers are only allowed on text fields",
                path
            )));
        }

        match self.field_type {
            FieldType::Slice | FieldType::Map if self.children.is_empty() => {
                Err(SearchError::Schema(format!(
                    "{}: {} fields must declare at least one child",
                    path, self.field_type
                )))
            }
            FieldType::Slice if self.children.len() != 1 => Err(SearchError::Schema(format!(
                "{}: slice fields must declare exactly one child",
                path
            ))),
            FieldType::Slice => {
                for (name, child) in &self.children {
                    validate_name(name, path)?;
                    if child.field_type == FieldType::Slice {
                        return Err(SearchError::Schema(format!(
                            "{}: nested slices are not supported",
                            path
                        )));
                    }
                    child.validate(&format!("{}.{}", path, name))?;
                }
                Ok(())
            }
            FieldType::Map => {
                for (name, child) in &self.children {
                    validate_name(name, path)?;
                    child.validate(&format!("{}.{}", path, name))?;
                }
                Ok(())
            }
            _ if !self.children.is_empty() => Err(SearchError::Schema(format!(
                "{}: only slice and map fields may declare children",
                path
            ))),
            _ => Ok(()),
        }
    }
}

fn validate_name(name: &str, parent: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SearchError::Schema(format!(
            "{}: field names must not be empty",
            parent
        )));
    }
    if name.contains('.') {
        return Err(SearchError::Schema(format!(
            "{}: field name '{}' must not contain '.'",
            parent, name
        )));
    }
    if name == ALL_FIELD {
        return Err(SearchError::Schema(format!(
            "{}: field name '{}' is reserved",
            parent, ALL_FIELD
        )));
    }
    Ok(())
}

/// A scalar field produced by flattening the mapping
#[derive(Clone, Debug, PartialEq)]
pub struct LeafField {
    /// Flattened name (`parent.child` for map children)
    pub name: String,
    pub field_type: FieldType,
    pub analyzers: Vec<String>,
}

/// Index mapping (schema) definition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexMapping {
    /// Top-level field declarations
    pub fields: BTreeMap<String, FieldMapping>,
}

impl IndexMapping {
    /// Create a new empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level field
    pub fn with_field(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.fields.insert(name.into(), mapping);
        self
    }

    /// Parse a mapping from its JSON form
    pub fn from_json(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| SearchError::Schema(format!("invalid mapping: {}", e)))
    }

    /// Check the structural invariants of every declaration
    pub fn validate(&self) -> Result<()> {
        for (name, mapping) in &self.fields {
            validate_name(name, "mapping")?;
            mapping.validate(name)?;
        }
        Ok(())
    }

    /// Flatten composite declarations into scalar fields
    pub fn leaf_fields(&self) -> Vec<LeafField> {
        let mut leaves = Vec::new();
        for (name, mapping) in &self.fields {
            collect_leaves(name, mapping, &mut leaves);
        }
        leaves
    }

    /// Check that every required field is present and not null
    pub fn check_required(&self, source: &Map<String, Value>) -> Result<()> {
        check_required_in(&self.fields, source, "")
    }
}

fn collect_leaves(name: &str, mapping: &FieldMapping, out: &mut Vec<LeafField>) {
    match mapping.field_type {
        FieldType::Slice => {
            // The element declaration keeps the parent's name
            if let Some(element) = mapping.children.values().next() {
                collect_leaves(name, element, out);
            }
        }
        FieldType::Map => {
            for (child_name, child) in &mapping.children {
                collect_leaves(&format!("{}.{}", name, child_name), child, out);
            }
        }
        field_type => out.push(LeafField {
            name: name.to_string(),
            field_type,
            analyzers: mapping.analyzers.clone(),
        }),
    }
}

fn check_required_in(
    fields: &BTreeMap<String, FieldMapping>,
    source: &Map<String, Value>,
    prefix: &str,
) -> Result<()> {
    for (name, mapping) in fields {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        match source.get(name) {
            None | Some(Value::Null) => {
                if mapping.required {
                    return Err(SearchError::MissingField(path));
                }
            }
            Some(Value::Object(child_source)) if mapping.field_type == FieldType::Map => {
                check_required_in(&mapping.children, child_source, &path)?;
            }
            Some(_) => {}
        }
    }
    Ok(())
}
