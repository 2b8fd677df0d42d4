//! Query DSL parser
//!
//! Parses JSON query DSL into a [`Query`] tree. Every syntax error carries the
//! JSON path of the offending node.

use serde_json::{Map, Value};

use super::ast::{
    BoolQuery, MatchQuery, Query, RangeQuery, TermQuery, TermsQuery, DEFAULT_BOOST,
};
use super::types::JsonPath;
use crate::error::{Result, SearchError};

const QUERY_TYPES: &str = "bool, match, range, term, terms";
const RANGE_KEYS: &str = "from, to, includeFrom, includeTo, boost";
const MATCH_KEYS: &str = "query, boost";
const BOOL_KEYS: &str = "should, must, filter, boost";

/// Query parser for JSON DSL
pub struct QueryParser;

impl QueryParser {
    /// Parse a JSON query into a query tree
    ///
    /// A `{"query": ...}` wrapper is accepted at the root.
    ///
    /// # Example
    ///
    /// ```json
    /// {
    ///   "bool": {
    ///     "must": [
    ///       { "match": { "title": { "query": "rust search" } } }
    ///     ],
    ///     "filter": [
    ///       { "range": { "year": { "from": 2020, "includeFrom": true } } }
    ///     ]
    ///   }
    /// }
    /// ```
    pub fn parse(json: &Value) -> Result<Query> {
        Self::parse_at(json, &JsonPath::root("query"))
    }

    /// Parse a query rooted at `path` (used for nested filter queries)
    pub fn parse_at(json: &Value, path: &JsonPath) -> Result<Query> {
        if let Some(map) = json.as_object() {
            if map.len() == 1 {
                if let Some(inner) = map.get("query") {
                    return Self::parse_node(inner, path);
                }
            }
        }
        Self::parse_node(json, path)
    }

    /// Parse a JSON string into a query tree
    pub fn parse_str(json_str: &str) -> Result<Query> {
        let value: Value = serde_json::from_str(json_str)
            .map_err(|e| SearchError::syntax("query", format!("invalid JSON: {}", e)))?;
        Self::parse(&value)
    }

    fn parse_node(value: &Value, path: &JsonPath) -> Result<Query> {
        let map = expect_object(value, path, "query")?;
        let (kind, body) = single_entry(map, path, "query node")?;

        let body_path = path.key(kind);
        match kind.as_str() {
            "term" => Self::parse_term(body, &body_path),
            "terms" => Self::parse_terms(body, &body_path),
            "match" => Self::parse_match(body, &body_path),
            "range" => Self::parse_range(body, &body_path),
            "bool" => Self::parse_bool(body, &body_path),
            other => Err(SearchError::syntax(
                path,
                format!("unknown query type '{}', expected one of: {}", other, QUERY_TYPES),
            )),
        }
    }

    /// Parse `{ <field>: <scalar> }`
    fn parse_term(value: &Value, path: &JsonPath) -> Result<Query> {
        let map = expect_object(value, path, "term query")?;
        let (field, raw) = single_entry(map, path, "term query")?;
        let value_path = path.key(field);
        expect_scalar(raw, &value_path, "term value")?;

        Ok(Query::Term(TermQuery {
            field: field.clone(),
            value: raw.clone(),
        }))
    }

    /// Parse `{ <field>: [<scalar>, ...] }`
    fn parse_terms(value: &Value, path: &JsonPath) -> Result<Query> {
        let map = expect_object(value, path, "terms query")?;
        let (field, raw) = single_entry(map, path, "terms query")?;
        let values_path = path.key(field);
        let items = raw.as_array().ok_or_else(|| {
            SearchError::syntax(&values_path, "terms value must be an array")
        })?;

        for (i, item) in items.iter().enumerate() {
            expect_scalar(item, &values_path.index(i), "terms value")?;
        }

        Ok(Query::Terms(TermsQuery {
            field: field.clone(),
            values: items.clone(),
        }))
    }

    /// Parse `{ <field>: <scalar> }` or `{ <field>: { "query": <scalar>, "boost"? } }`
    fn parse_match(value: &Value, path: &JsonPath) -> Result<Query> {
        let map = expect_object(value, path, "match query")?;
        let (field, spec) = single_entry(map, path, "match query")?;
        let spec_path = path.key(field);

        let (query, boost) = match spec {
            Value::Object(spec) => {
                reject_unknown_keys(spec, &["query", "boost"], &spec_path, MATCH_KEYS)?;
                let query = spec.get("query").ok_or_else(|| {
                    SearchError::syntax(&spec_path, "match query must have a 'query' value")
                })?;
                expect_scalar(query, &spec_path.key("query"), "match query")?;
                (query.clone(), parse_boost(spec, &spec_path)?)
            }
            scalar => {
                expect_scalar(scalar, &spec_path, "match query")?;
                (scalar.clone(), DEFAULT_BOOST)
            }
        };

        Ok(Query::Match(MatchQuery {
            field: field.clone(),
            query,
            boost,
        }))
    }

    /// Parse `{ <field>: { "from"?, "to"?, "includeFrom"?, "includeTo"?, "boost"? } }`
    fn parse_range(value: &Value, path: &JsonPath) -> Result<Query> {
        let map = expect_object(value, path, "range query")?;
        let (field, spec) = single_entry(map, path, "range query")?;
        let spec_path = path.key(field);
        let spec = spec
            .as_object()
            .ok_or_else(|| SearchError::syntax(&spec_path, "range spec must be an object"))?;

        reject_unknown_keys(
            spec,
            &["from", "to", "includeFrom", "includeTo", "boost"],
            &spec_path,
            RANGE_KEYS,
        )?;

        let from = parse_bound(spec, "from", &spec_path)?;
        let to = parse_bound(spec, "to", &spec_path)?;
        let include_from = parse_flag(spec, "includeFrom", &spec_path)?;
        let include_to = parse_flag(spec, "includeTo", &spec_path)?;

        Ok(Query::Range(RangeQuery {
            field: field.clone(),
            from,
            to,
            include_from,
            include_to,
            boost: parse_boost(spec, &spec_path)?,
        }))
    }

    /// Parse `{ "should"?, "must"?, "filter"?, "boost"? }`
    fn parse_bool(value: &Value, path: &JsonPath) -> Result<Query> {
        let map = expect_object(value, path, "bool query")?;
        reject_unknown_keys(map, &["should", "must", "filter", "boost"], path, BOOL_KEYS)?;

        let mut query = BoolQuery::new();
        if let Some(should) = map.get("should") {
            query.should = Self::parse_clause_array(should, &path.key("should"))?;
        }
        if let Some(must) = map.get("must") {
            query.must = Self::parse_clause_array(must, &path.key("must"))?;
        }
        if let Some(filter) = map.get("filter") {
            query.filter = Self::parse_clause_array(filter, &path.key("filter"))?;
        }
        query.boost = parse_boost(map, path)?;

        Ok(Query::Bool(query))
    }

    /// Parse an array of query clauses
    fn parse_clause_array(value: &Value, path: &JsonPath) -> Result<Vec<Query>> {
        let items = value
            .as_array()
            .ok_or_else(|| SearchError::syntax(path, "clauses must be an array"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| Self::parse_node(item, &path.index(i)))
            .collect()
    }
}

fn expect_object<'v>(value: &'v Value, path: &JsonPath, what: &str) -> Result<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| SearchError::syntax(path, format!("{} must be an object", what)))
}

/// The only entry of a single-key object
fn single_entry<'v>(
    map: &'v Map<String, Value>,
    path: &JsonPath,
    what: &str,
) -> Result<(&'v String, &'v Value)> {
    let mut iter = map.iter();
    match (iter.next(), iter.next()) {
        (Some(entry), None) => Ok(entry),
        (None, _) => Err(SearchError::syntax(path, format!("{} must not be empty", what))),
        (Some(_), Some(_)) => Err(SearchError::syntax(
            path,
            format!(
                "{} must have exactly one key, got: {}",
                what,
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        )),
    }
}

fn expect_scalar(value: &Value, path: &JsonPath, what: &str) -> Result<()> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(()),
        _ => Err(SearchError::syntax(
            path,
            format!("{} must be a string, number or boolean", what),
        )),
    }
}

fn reject_unknown_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    path: &JsonPath,
    expected: &str,
) -> Result<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(SearchError::syntax(
            path,
            format!("unknown key '{}', expected one of: {}", key, expected),
        )),
        None => Ok(()),
    }
}

fn parse_bound(spec: &Map<String, Value>, key: &str, path: &JsonPath) -> Result<Option<Value>> {
    match spec.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => {
            expect_scalar(raw, &path.key(key), "range bound")?;
            Ok(Some(raw.clone()))
        }
    }
}

fn parse_flag(spec: &Map<String, Value>, key: &str, path: &JsonPath) -> Result<bool> {
    match spec.get(key) {
        None => Ok(true),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(SearchError::syntax(
            path.key(key),
            format!("{} must be a boolean", key),
        )),
    }
}

pub(crate) fn parse_boost(spec: &Map<String, Value>, path: &JsonPath) -> Result<f32> {
    match spec.get("boost") {
        None => Ok(DEFAULT_BOOST),
        Some(raw) => raw
            .as_f64()
            .map(|b| b as f32)
            .ok_or_else(|| SearchError::syntax(path.key("boost"), "boost must be a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn syntax_path(value: Value) -> String {
        match QueryParser::parse(&value) {
            Err(SearchError::Syntax { path, .. }) => path,
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_term() {
        let query = QueryParser::parse(&json!({ "term": { "status": "active" } })).unwrap();
        assert_eq!(query, Query::term("status", "active"));
    }

    #[test]
    fn test_parse_wrapped_query() {
        let query = QueryParser::parse(&json!({ "query": { "term": { "n": 5 } } })).unwrap();
        assert_eq!(query, Query::term("n", 5));
    }

    #[test]
    fn test_parse_terms() {
        let query = QueryParser::parse(&json!({ "terms": { "flag": [true, false] } })).unwrap();
        assert_eq!(query, Query::terms("flag", [true, false]));
    }

    #[test]
    fn test_parse_match_forms() {
        let short = QueryParser::parse(&json!({ "match": { "title": "rust" } })).unwrap();
        assert_eq!(short, Query::matching("title", "rust"));

        let long = QueryParser::parse(&json!({
            "match": { "title": { "query": "rust", "boost": 2.0 } }
        }))
        .unwrap();
        match long {
            Query::Match(m) => {
                assert_eq!(m.query, json!("rust"));
                assert_eq!(m.boost, 2.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_range() {
        let query = QueryParser::parse(&json!({
            "range": { "age": { "from": 1, "to": 4, "includeFrom": false } }
        }))
        .unwrap();
        match query {
            Query::Range(r) => {
                assert_eq!(r.field, "age");
                assert_eq!(r.from, Some(json!(1)));
                assert_eq!(r.to, Some(json!(4)));
                assert!(!r.include_from);
                assert!(r.include_to);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_bool() {
        let query = QueryParser::parse(&json!({
            "bool": {
                "must": [{ "term": { "a": 1 } }, { "term": { "b": 2 } }],
                "should": [{ "match": { "t": "x" } }],
                "filter": [{ "range": { "n": { "to": 3 } } }],
                "boost": 1.5
            }
        }))
        .unwrap();
        match query {
            Query::Bool(b) => {
                assert_eq!(b.must.len(), 2);
                assert_eq!(b.should.len(), 1);
                assert_eq!(b.filter.len(), 1);
                assert_eq!(b.boost, 1.5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_bool_is_match_all() {
        let query = QueryParser::parse(&json!({ "bool": {} })).unwrap();
        assert_eq!(query, Query::match_all());
    }

    #[test]
    fn test_syntax_error_paths() {
        assert_eq!(syntax_path(json!({})), "query");
        assert_eq!(syntax_path(json!("rust")), "query");
        assert_eq!(syntax_path(json!({ "fuzzy": { "t": "x" } })), "query");
        assert_eq!(
            syntax_path(json!({ "term": { "a": 1, "b": 2 } })),
            "query.term"
        );
        assert_eq!(syntax_path(json!({ "term": { "a": [1] } })), "query.term.a");
        assert_eq!(syntax_path(json!({ "terms": { "a": 1 } })), "query.terms.a");
        assert_eq!(
            syntax_path(json!({ "terms": { "a": [1, {}] } })),
            "query.terms.a[1]"
        );
        assert_eq!(
            syntax_path(json!({ "bool": { "must": [{ "term": { "a": 1 } }, {}] } })),
            "query.bool.must[1]"
        );
        assert_eq!(
            syntax_path(json!({ "bool": { "must": { "term": { "a": 1 } } } })),
            "query.bool.must"
        );
        assert_eq!(
            syntax_path(json!({ "bool": { "must_not": [] } })),
            "query.bool"
        );
        assert_eq!(
            syntax_path(json!({ "range": { "n": { "gte": 1 } } })),
            "query.range.n"
        );
        assert_eq!(
            syntax_path(json!({ "range": { "n": { "includeTo": "yes" } } })),
            "query.range.n.includeTo"
        );
        assert_eq!(
            syntax_path(json!({ "match": { "t": { "boost": 1 } } })),
            "query.match.t"
        );
        assert_eq!(
            syntax_path(json!({ "match": { "t": { "query": "x", "boost": "high" } } })),
            "query.match.t.boost"
        );
    }

    #[test]
    fn test_error_names_allowed_keys() {
        let err = QueryParser::parse(&json!({ "wildcard": { "t": "x*" } })).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("wildcard"));
        assert!(message.contains("bool, match, range, term, terms"));
    }

    #[test]
    fn test_parse_str() {
        let query = QueryParser::parse_str(r#"{"term": {"a": "b"}}"#).unwrap();
        assert_eq!(query, Query::term("a", "b"));
        assert!(QueryParser::parse_str("{not json").is_err());
    }
}
