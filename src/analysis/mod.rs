//! Text analysis
//!
//! Text fields run their values through an analyzer: an ordered chain of
//! token filters resolved by name from an [`AnalyzerRegistry`]. Query text for
//! `match` goes through the same chain as indexed text.

mod analyzer;
mod registry;

pub use analyzer::{dedup, lowercase, trim_punctuation, unicode, whitespace, Analyzer, TokenFilter};
pub use registry::AnalyzerRegistry;
