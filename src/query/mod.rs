//! Query DSL and execution engine
//!
//! This module provides the JSON query language for quarry, supporting:
//! - Term and terms queries (exact values)
//! - Match queries (analyzed, BM25-scored text search)
//! - Range queries (ordered values, either bound optional)
//! - Bool queries (should/must/filter composition)
//!
//! # Example
//!
//! ```json
//! {
//!   "query": {
//!     "bool": {
//!       "must": [
//!         { "match": { "title": "rust programming" } }
//!       ],
//!       "filter": [
//!         { "range": { "year": { "from": 2020 } } }
//!       ]
//!     }
//!   }
//! }
//! ```

pub mod ast;
pub mod context;
pub mod executor;
pub mod parser;
pub mod scorer;
pub mod types;

pub use ast::{BoolQuery, MatchQuery, Query, RangeQuery, TermQuery, TermsQuery, DEFAULT_BOOST};
pub use context::QueryContext;
pub use executor::QueryExecutor;
pub use parser::QueryParser;
pub use scorer::Scorer;
pub use types::{JsonPath, QueryResult};
