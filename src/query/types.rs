//! Query types and data structures

use roaring::RoaringBitmap;
use std::fmt;

use super::scorer::Scorer;

/// Location of a node inside a request body, e.g. `query.bool.must[1].term`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JsonPath(String);

impl JsonPath {
    /// Start a path at a top-level key
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Descend into an object key
    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}.{}", self.0, key))
    }

    /// Descend into an array element
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<JsonPath> for String {
    fn from(path: JsonPath) -> Self {
        path.0
    }
}

impl From<&JsonPath> for String {
    fn from(path: &JsonPath) -> Self {
        path.0.clone()
    }
}

/// Outcome of evaluating a query tree
#[derive(Clone, Debug)]
pub struct QueryResult {
    /// Documents matched by the query
    pub matched: RoaringBitmap,
    /// Scores matched documents
    pub scorer: Scorer,
}

impl QueryResult {
    pub fn new(matched: RoaringBitmap, scorer: Scorer) -> Self {
        Self { matched, scorer }
    }

    /// A result matching nothing
    pub fn empty(boost: f32) -> Self {
        Self::new(RoaringBitmap::new(), Scorer::Constant(boost))
    }

    pub fn total(&self) -> u64 {
        self.matched.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_path() {
        let path = JsonPath::root("query")
            .key("bool")
            .key("must")
            .index(1)
            .key("term");
        assert_eq!(path.as_str(), "query.bool.must[1].term");
        assert_eq!(path.to_string(), "query.bool.must[1].term");

        let owned: String = path.into();
        assert_eq!(owned, "query.bool.must[1].term");
    }

    #[test]
    fn test_empty_result() {
        let result = QueryResult::empty(2.0);
        assert_eq!(result.total(), 0);
        assert!(matches!(result.scorer, Scorer::Constant(b) if b == 2.0));
    }
}
