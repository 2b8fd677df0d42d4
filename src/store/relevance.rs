//! Relevance statistics for BM25
//!
//! One store per text field. Counters are maintained incrementally; the
//! average document length is derived from the aggregate counters rather than
//! re-scanned.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::DocumentId;
use crate::config::Bm25Params;
use crate::scoring;

/// Per-field term statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevanceStore {
    /// term -> number of documents containing it
    word_count: HashMap<String, u32>,
    /// document -> (term -> occurrences)
    doc_term_count: HashMap<DocumentId, HashMap<String, u32>>,
    /// document -> token count
    doc_length: HashMap<DocumentId, u32>,
    total_term_count: u64,
    avg_doc_length: f32,
}

impl RelevanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the analyzed tokens of a document
    ///
    /// Any previous contribution of `id` is retracted first, so adding the
    /// same tokens twice leaves the counters unchanged.
    pub fn add(&mut self, id: DocumentId, tokens: &[String]) {
        self.delete(id);
        if tokens.is_empty() {
            return;
        }

        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokens {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }
        for term in counts.keys() {
            *self.word_count.entry(term.clone()).or_insert(0) += 1;
        }

        let length = tokens.len() as u32;
        self.doc_term_count.insert(id, counts);
        self.doc_length.insert(id, length);
        self.total_term_count += length as u64;
        self.update_avg_doc_length();
    }

    /// Retract every counter contributed by `id`
    pub fn delete(&mut self, id: DocumentId) -> bool {
        let Some(counts) = self.doc_term_count.remove(&id) else {
            return false;
        };

        for term in counts.keys() {
            if let Some(count) = self.word_count.get_mut(term) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.word_count.remove(term);
                }
            }
        }
        if let Some(length) = self.doc_length.remove(&id) {
            self.total_term_count = self.total_term_count.saturating_sub(length as u64);
        }
        self.update_avg_doc_length();
        true
    }

    fn update_avg_doc_length(&mut self) {
        self.avg_doc_length = if self.doc_length.is_empty() {
            0.0
        } else {
            self.total_term_count as f32 / self.doc_length.len() as f32
        };
    }

    /// Occurrences of `term` in document `id`
    pub fn term_count(&self, id: DocumentId, term: &str) -> u32 {
        self.doc_term_count
            .get(&id)
            .and_then(|counts| counts.get(term))
            .copied()
            .unwrap_or(0)
    }

    /// Number of documents containing `term`
    pub fn doc_frequency(&self, term: &str) -> u32 {
        self.word_count.get(term).copied().unwrap_or(0)
    }

    /// Token count of document `id`
    pub fn doc_length(&self, id: DocumentId) -> u32 {
        self.doc_length.get(&id).copied().unwrap_or(0)
    }

    /// Number of documents with a recorded length
    pub fn total_docs(&self) -> usize {
        self.doc_length.len()
    }

    pub fn total_term_count(&self) -> u64 {
        self.total_term_count
    }

    pub fn avg_doc_length(&self) -> f32 {
        self.avg_doc_length
    }

    pub fn is_empty(&self) -> bool {
        self.doc_length.is_empty()
    }

    pub fn tf(&self, id: DocumentId, term: &str) -> f32 {
        scoring::term_frequency(self.term_count(id, term), self.doc_length(id))
    }

    pub fn idf(&self, term: &str) -> f32 {
        scoring::inverse_document_frequency(self.total_docs(), self.doc_frequency(term))
    }

    /// BM25 score of a single term in document `id`
    pub fn bm25(&self, id: DocumentId, term: &str, params: &Bm25Params) -> f32 {
        let tf = self.tf(id, term);
        if tf == 0.0 {
            return 0.0;
        }
        scoring::bm25_score(
            tf,
            self.idf(term),
            self.doc_length(id),
            self.avg_doc_length,
            params,
        )
    }

    /// Sum of BM25 over `tokens` for document `id`
    pub fn score(&self, id: DocumentId, tokens: &[String], params: &Bm25Params) -> f32 {
        tokens.iter().map(|t| self.bm25(id, t, params)).sum()
    }
}
