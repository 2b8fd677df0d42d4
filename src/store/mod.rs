//! Per-field storage
//!
//! - `types`: document ids and the value types fields can hold
//! - `postings`: the generic inverted index with ordered value access
//! - `relevance`: BM25 term statistics for text fields
//! - `field`: typed, independently locked fields over the two stores

mod field;
mod postings;
mod relevance;
mod types;

pub(crate) use field::with_store;
pub use field::{Field, TypedStore};
pub use postings::PostingStore;
pub use relevance::RelevanceStore;
pub use types::{DocumentId, FieldValue};
