//! Aggregations
//!
//! A JSON aggregation map is parsed into an [`Aggregations`] tree and
//! evaluated over the documents matched by the query:
//! - `terms`: top values by document count
//! - `range`: counts for explicit inclusive value ranges
//! - `filter`: count of a nested query
//! - `min` / `max`: extreme value present in the incoming documents
//!
//! Every node may nest further aggregations under `aggs`.

pub mod ast;
pub mod executor;
pub mod parser;
pub mod result;

pub use ast::{
    Aggregation, Aggregations, FilterAggregation, MetricAggregation, RangeAggregation, RangeSpec,
    TermsAggregation,
};
pub use executor::AggregationExecutor;
pub use parser::AggregationParser;
pub use result::{AggregationResult, AggregationResults, RangeBucket, TermsBucket};
