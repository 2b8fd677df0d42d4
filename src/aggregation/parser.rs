//! Aggregation DSL parser
//!
//! Parses a JSON map of `name -> { "type": ..., ... }` into [`Aggregations`].
//! Paths in syntax errors start at `aggs`, e.g. `aggs.by_tag.aggs.cheapest.field`.

use serde_json::{Map, Value};

use super::ast::{
    Aggregation, Aggregations, FilterAggregation, MetricAggregation, RangeAggregation, RangeSpec,
    TermsAggregation,
};
use crate::config::EngineSettings;
use crate::error::{Result, SearchError};
use crate::query::{JsonPath, QueryParser};

const AGG_TYPES: &str = "terms, range, filter, min, max";

/// Aggregation parser for JSON DSL
#[derive(Clone, Debug)]
pub struct AggregationParser {
    default_terms_size: usize,
    max_depth: usize,
}

impl Default for AggregationParser {
    fn default() -> Self {
        Self::new(&EngineSettings::default())
    }
}

impl AggregationParser {
    /// Create a parser using the engine's terms size and depth limit
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            default_terms_size: settings.default_terms_size,
            max_depth: settings.max_aggregation_depth,
        }
    }

    /// Parse a JSON aggregation map
    ///
    /// # Example
    ///
    /// ```json
    /// {
    ///   "by_tag": {
    ///     "type": "terms",
    ///     "field": "tags",
    ///     "size": 5,
    ///     "aggs": {
    ///       "cheapest": { "type": "min", "field": "price" }
    ///     }
    ///   }
    /// }
    /// ```
    pub fn parse(&self, json: &Value) -> Result<Aggregations> {
        self.parse_level(json, &JsonPath::root("aggs"), 1)
    }

    fn parse_level(&self, json: &Value, path: &JsonPath, depth: usize) -> Result<Aggregations> {
        if depth > self.max_depth {
            return Err(SearchError::syntax(
                path,
                format!("aggregations nest deeper than {} levels", self.max_depth),
            ));
        }

        let map = json
            .as_object()
            .ok_or_else(|| SearchError::syntax(path, "aggregations must be an object"))?;

        let mut aggs = Aggregations::new();
        for (name, body) in map {
            let agg_path = path.key(name);
            aggs.insert(name.clone(), self.parse_aggregation(body, &agg_path, depth)?);
        }
        Ok(aggs)
    }

    fn parse_aggregation(&self, json: &Value, path: &JsonPath, depth: usize) -> Result<Aggregation> {
        let map = json
            .as_object()
            .ok_or_else(|| SearchError::syntax(path, "aggregation must be an object"))?;
        if map.is_empty() {
            return Err(SearchError::syntax(path, "aggregation must not be empty"));
        }

        let agg_type = match map.get("type") {
            Some(Value::String(t)) => t.as_str(),
            Some(_) => return Err(SearchError::syntax(path.key("type"), "type must be a string")),
            None => return Err(SearchError::syntax(path, "aggregation must have a 'type'")),
        };

        let aggs = match map.get("aggs") {
            Some(nested) => self.parse_level(nested, &path.key("aggs"), depth + 1)?,
            None => Aggregations::new(),
        };

        match agg_type {
            "terms" => {
                allow_keys(map, &["type", "field", "size", "aggs"], path)?;
                let size = match map.get("size") {
                    None => self.default_terms_size,
                    Some(raw) => match raw.as_u64() {
                        Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
                        _ => {
                            return Err(SearchError::syntax(
                                path.key("size"),
                                "size must be a positive integer",
                            ))
                        }
                    },
                };
                Ok(Aggregation::Terms(TermsAggregation {
                    field: required_field(map, path)?,
                    size,
                    aggs,
                }))
            }
            "range" => {
                allow_keys(map, &["type", "field", "ranges", "aggs"], path)?;
                Ok(Aggregation::Range(RangeAggregation {
                    field: required_field(map, path)?,
                    ranges: parse_ranges(map.get("ranges"), &path.key("ranges"))?,
                    aggs,
                }))
            }
            "filter" => {
                allow_keys(map, &["type", "filter", "aggs"], path)?;
                let filter_path = path.key("filter");
                let filter = map
                    .get("filter")
                    .ok_or_else(|| SearchError::syntax(path, "filter aggregation must have a 'filter'"))?;
                Ok(Aggregation::Filter(FilterAggregation {
                    filter: QueryParser::parse_at(filter, &filter_path)?,
                    aggs,
                }))
            }
            "min" | "max" => {
                allow_keys(map, &["type", "field", "aggs"], path)?;
                let metric = MetricAggregation {
                    field: required_field(map, path)?,
                    aggs,
                };
                Ok(if agg_type == "min" {
                    Aggregation::Min(metric)
                } else {
                    Aggregation::Max(metric)
                })
            }
            other => Err(SearchError::syntax(
                path.key("type"),
                format!("unknown aggregation type '{}', expected one of: {}", other, AGG_TYPES),
            )),
        }
    }
}

fn allow_keys(map: &Map<String, Value>, allowed: &[&str], path: &JsonPath) -> Result<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(SearchError::syntax(
            path,
            format!("unknown key '{}', expected one of: {}", key, allowed.join(", ")),
        )),
        None => Ok(()),
    }
}

fn required_field(map: &Map<String, Value>, path: &JsonPath) -> Result<String> {
    match map.get("field") {
        Some(Value::String(field)) if !field.is_empty() => Ok(field.clone()),
        Some(_) => Err(SearchError::syntax(
            path.key("field"),
            "field must be a non-empty string",
        )),
        None => Err(SearchError::syntax(path, "aggregation must have a 'field'")),
    }
}

fn parse_ranges(raw: Option<&Value>, path: &JsonPath) -> Result<Vec<RangeSpec>> {
    let items = match raw {
        Some(Value::Array(items)) if !items.is_empty() => items,
        Some(_) => return Err(SearchError::syntax(path, "ranges must be a non-empty array")),
        None => return Err(SearchError::syntax(path, "range aggregation must have 'ranges'")),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = path.index(i);
            let spec = item
                .as_object()
                .ok_or_else(|| SearchError::syntax(&item_path, "range must be an object"))?;
            allow_keys(spec, &["key", "from", "to"], &item_path)?;

            let key = match spec.get("key") {
                Some(Value::String(key)) => key.clone(),
                Some(_) => return Err(SearchError::syntax(item_path.key("key"), "key must be a string")),
                None => return Err(SearchError::syntax(&item_path, "range must have a 'key'")),
            };
            Ok(RangeSpec {
                key,
                from: parse_bound(spec, "from", &item_path)?,
                to: parse_bound(spec, "to", &item_path)?,
            })
        })
        .collect()
}

fn parse_bound(spec: &Map<String, Value>, key: &str, path: &JsonPath) -> Result<Option<Value>> {
    match spec.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(raw @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => Ok(Some(raw.clone())),
        Some(_) => Err(SearchError::syntax(
            path.key(key),
            "range bound must be a string, number or boolean",
        )),
    }
}
