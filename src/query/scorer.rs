//! Relevance scoring for evaluated queries
//!
//! Evaluation yields a [`Scorer`] tree alongside the match set. Only `match`
//! nodes on text fields carry tokens; everything else scores its boost.

use std::sync::Arc;

use crate::config::Bm25Params;
use crate::store::{DocumentId, Field};

/// Scoring function produced by query evaluation
#[derive(Clone, Debug)]
pub enum Scorer {
    /// Every matched document scores the boost
    Constant(f32),
    /// Sum of BM25 over the analyzed query tokens, scaled by the boost
    Bm25 {
        field: Arc<Field>,
        tokens: Vec<String>,
        boost: f32,
    },
    /// Scoring children of a bool node (must and should clauses)
    Compound { children: Vec<Scorer>, boost: f32 },
}

impl Scorer {
    /// Check whether any tokenized field contributes to this scorer
    pub fn has_tokens(&self) -> bool {
        match self {
            Scorer::Constant(_) => false,
            Scorer::Bm25 { tokens, .. } => !tokens.is_empty(),
            Scorer::Compound { children, .. } => children.iter().any(Scorer::has_tokens),
        }
    }

    pub fn boost(&self) -> f32 {
        match self {
            Scorer::Constant(boost)
            | Scorer::Bm25 { boost, .. }
            | Scorer::Compound { boost, .. } => *boost,
        }
    }

    /// Score one matched document
    ///
    /// A compound node sums its token-bearing children; with none it falls
    /// back to its boost.
    pub fn score(&self, id: DocumentId, params: &Bm25Params) -> f32 {
        match self {
            Scorer::Constant(boost) => *boost,
            Scorer::Bm25 { tokens, boost, .. } if tokens.is_empty() => *boost,
            Scorer::Bm25 {
                field,
                tokens,
                boost,
            } => boost * field.score(id, tokens, params),
            Scorer::Compound { children, boost } => {
                let mut scoring = children.iter().filter(|c| c.has_tokens()).peekable();
                if scoring.peek().is_none() {
                    return *boost;
                }
                boost * scoring.map(|c| c.score(id, params)).sum::<f32>()
            }
        }
    }
}
