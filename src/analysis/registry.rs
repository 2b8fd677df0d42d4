use super::analyzer::{self, Analyzer, TokenFilter};
use crate::error::{Result, SearchError};
use std::collections::HashMap;
use std::fmt;

/// Named token filters available to schemas
///
/// The default registry carries the built-in filters; callers may register
/// their own before building an index.
#[derive(Clone)]
pub struct AnalyzerRegistry {
    filters: HashMap<String, TokenFilter>,
}

impl AnalyzerRegistry {
    /// Create a registry with no filters
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Register (or replace) a filter under `name`
    pub fn register(&mut self, name: impl Into<String>, filter: TokenFilter) {
        self.filters.insert(name.into(), filter);
    }

    /// Register a filter, builder style
    pub fn with_filter(mut self, name: impl Into<String>, filter: TokenFilter) -> Self {
        self.register(name, filter);
        self
    }

    /// Check whether a filter is registered
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Build an analyzer chain from filter names
    pub fn build<S: AsRef<str>>(&self, names: &[S]) -> Result<Analyzer> {
        names.iter().try_fold(Analyzer::new(), |chain, name| {
            let name = name.as_ref();
            let filter = self
                .filters
                .get(name)
                .ok_or_else(|| SearchError::Schema(format!("unknown analyzer '{}'", name)))?;
            Ok(chain.with_filter(name, filter.clone()))
        })
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::empty()
            .with_filter("whitespace", analyzer::whitespace())
            .with_filter("unicode", analyzer::unicode())
            .with_filter("lowercase", analyzer::lowercase())
            .with_filter("dedup", analyzer::dedup())
            .with_filter("trim_punctuation", analyzer::trim_punctuation())
    }
}

impl fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("AnalyzerRegistry")
            .field("filters", &names)
            .finish()
    }
}
