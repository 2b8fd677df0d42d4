//! Query execution context
//!
//! The `QueryContext` gives the executors read access to an index's fields.
//! It borrows the field set; every store lock is taken per lookup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineSettings;
use crate::store::Field;

/// Field set and settings seen by query and aggregation evaluation
#[derive(Clone, Copy)]
pub struct QueryContext<'a> {
    fields: &'a HashMap<String, Arc<Field>>,
    all: &'a Arc<Field>,
    settings: &'a EngineSettings,
}

impl<'a> QueryContext<'a> {
    /// Create a new query context
    pub fn new(
        fields: &'a HashMap<String, Arc<Field>>,
        all: &'a Arc<Field>,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            fields,
            all,
            settings,
        }
    }

    /// Look up a declared field by flattened name
    pub fn field(&self, name: &str) -> Option<&'a Arc<Field>> {
        self.fields.get(name)
    }

    /// The synthetic match-all field
    pub fn all_field(&self) -> &'a Arc<Field> {
        self.all
    }

    pub fn settings(&self) -> &'a EngineSettings {
        self.settings
    }
}
