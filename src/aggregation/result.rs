use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Results keyed by aggregation name
pub type AggregationResults = BTreeMap<String, AggregationResult>;

/// Result of one aggregation node
///
/// Serializes to the bare JSON shape of each kind, e.g.
/// `{"buckets": [...]}` or `{"docCount": 3}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregationResult {
    Terms {
        buckets: Vec<TermsBucket>,
    },
    Range {
        buckets: Vec<RangeBucket>,
    },
    Filter {
        #[serde(rename = "docCount")]
        doc_count: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        aggs: Option<AggregationResults>,
    },
    /// Min or max; `value` is null when no incoming document has a value
    Metric {
        value: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        aggs: Option<AggregationResults>,
    },
}

impl AggregationResult {
    /// Document count of a filter result
    pub fn doc_count(&self) -> Option<u64> {
        match self {
            AggregationResult::Filter { doc_count, .. } => Some(*doc_count),
            _ => None,
        }
    }

    /// Value of a min/max result
    pub fn value(&self) -> Option<&Value> {
        match self {
            AggregationResult::Metric { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Nested results of a filter or metric result
    pub fn aggs(&self) -> Option<&AggregationResults> {
        match self {
            AggregationResult::Filter { aggs, .. } | AggregationResult::Metric { aggs, .. } => {
                aggs.as_ref()
            }
            _ => None,
        }
    }

    pub fn terms_buckets(&self) -> Option<&[TermsBucket]> {
        match self {
            AggregationResult::Terms { buckets } => Some(buckets),
            _ => None,
        }
    }

    pub fn range_buckets(&self) -> Option<&[RangeBucket]> {
        match self {
            AggregationResult::Range { buckets } => Some(buckets),
            _ => None,
        }
    }
}

/// One value of a terms aggregation
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsBucket {
    pub key: Value,
    pub doc_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<AggregationResults>,
}

/// One requested range of a range aggregation
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeBucket {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
    pub doc_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<AggregationResults>,
}
