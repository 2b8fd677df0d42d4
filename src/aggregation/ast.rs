//! Aggregation tree
//!
//! Parsed once per request. Every node may carry nested `aggs`, evaluated
//! over the documents the node itself produced.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::query::Query;

/// Named aggregations at one level of the tree
pub type Aggregations = BTreeMap<String, Aggregation>;

/// A parsed aggregation node
#[derive(Clone, Debug, PartialEq)]
pub enum Aggregation {
    /// Top values of a field by document count
    Terms(TermsAggregation),
    /// Document counts for explicit value ranges
    Range(RangeAggregation),
    /// Document count of a nested query
    Filter(FilterAggregation),
    /// Smallest value present in the incoming documents
    Min(MetricAggregation),
    /// Largest value present in the incoming documents
    Max(MetricAggregation),
}

impl Aggregation {
    /// Get the aggregation type name for debugging and logging
    pub fn agg_type(&self) -> &'static str {
        match self {
            Aggregation::Terms(_) => "terms",
            Aggregation::Range(_) => "range",
            Aggregation::Filter(_) => "filter",
            Aggregation::Min(_) => "min",
            Aggregation::Max(_) => "max",
        }
    }

    /// Nested aggregations
    pub fn aggs(&self) -> &Aggregations {
        match self {
            Aggregation::Terms(a) => &a.aggs,
            Aggregation::Range(a) => &a.aggs,
            Aggregation::Filter(a) => &a.aggs,
            Aggregation::Min(a) | Aggregation::Max(a) => &a.aggs,
        }
    }

    /// Depth of the tree rooted at this node (1 for a leaf)
    pub fn depth(&self) -> usize {
        1 + self.aggs().values().map(Aggregation::depth).max().unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TermsAggregation {
    pub field: String,
    /// Maximum number of buckets
    pub size: usize,
    pub aggs: Aggregations,
}

/// One requested range bucket; both bounds are inclusive
#[derive(Clone, Debug, PartialEq)]
pub struct RangeSpec {
    pub key: String,
    pub from: Option<Value>,
    pub to: Option<Value>,
}

impl RangeSpec {
    pub fn new(key: impl Into<String>, from: Option<Value>, to: Option<Value>) -> Self {
        Self {
            key: key.into(),
            from,
            to,
        }
    }

    /// True when neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RangeAggregation {
    pub field: String,
    /// Buckets in request order
    pub ranges: Vec<RangeSpec>,
    pub aggs: Aggregations,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterAggregation {
    pub filter: Query,
    pub aggs: Aggregations,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricAggregation {
    pub field: String,
    pub aggs: Aggregations,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth() {
        let leaf = Aggregation::Min(MetricAggregation {
            field: "price".to_string(),
            aggs: Aggregations::new(),
        });
        assert_eq!(leaf.depth(), 1);

        let mut aggs = Aggregations::new();
        aggs.insert("cheapest".to_string(), leaf);
        let parent = Aggregation::Filter(FilterAggregation {
            filter: Query::match_all(),
            aggs,
        });
        assert_eq!(parent.depth(), 2);
        assert_eq!(parent.agg_type(), "filter");
    }

    #[test]
    fn test_range_spec() {
        assert!(RangeSpec::new("all", None, None).is_unbounded());
        assert!(!RangeSpec::new("low", None, Some(Value::from(10))).is_unbounded());
    }
}
