pub mod aggregation;
pub mod analysis;
pub mod config;
pub mod error;
pub mod index;
pub mod metrics;
pub mod models;
pub mod query;
pub mod schema;
pub mod scoring;
pub mod snapshot;
pub mod store;

pub use aggregation::{AggregationResult, AggregationResults};
pub use analysis::{Analyzer, AnalyzerRegistry};
pub use config::{Bm25Params, EngineSettings};
pub use error::{Result, SearchError};
pub use index::Index;
pub use metrics::SearchMetrics;
pub use models::*;
pub use query::{Query, QueryParser};
pub use schema::{FieldMapping, FieldType, IndexMapping};
pub use store::{DocumentId, Field};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
