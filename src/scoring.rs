//! BM25 scoring functions
//!
//! Every factor returns 0.0 when its denominator would be zero, so scoring an
//! empty index or an unknown document is well defined.

use crate::config::Bm25Params;

/// Normalized term frequency: occurrences of a term over document length
///
/// # Arguments
/// * `term_count` - Occurrences of the term in the document
/// * `doc_len` - Length of the document (in tokens)
pub fn term_frequency(term_count: u32, doc_len: u32) -> f32 {
    if term_count == 0 || doc_len == 0 {
        return 0.0;
    }
    term_count as f32 / doc_len as f32
}

/// Inverse document frequency: `ln(total_docs / doc_freq) + 1`
///
/// # Arguments
/// * `total_docs` - Documents with a recorded length
/// * `doc_freq` - Documents containing the term
pub fn inverse_document_frequency(total_docs: usize, doc_freq: u32) -> f32 {
    if total_docs == 0 || doc_freq == 0 {
        return 0.0;
    }
    (total_docs as f32 / doc_freq as f32).ln() + 1.0
}

/// Compute the BM25 score of one term in one document
///
/// # Arguments
/// * `tf` - Normalized term frequency (see [`term_frequency`])
/// * `idf` - Inverse document frequency (see [`inverse_document_frequency`])
/// * `doc_len` - Length of the document (in tokens)
/// * `avg_doc_len` - Average document length across the field
/// * `params` - Saturation (`k1`) and length normalization (`b`)
///
/// # Returns
/// BM25 relevance score
pub fn bm25_score(tf: f32, idf: f32, doc_len: u32, avg_doc_len: f32, params: &Bm25Params) -> f32 {
    if tf == 0.0 || idf == 0.0 || avg_doc_len == 0.0 {
        return 0.0;
    }

    // Length normalization
    let norm = 1.0 - params.b + params.b * (doc_len as f32 / avg_doc_len);

    let denominator = tf + params.k1 * norm;
    if denominator == 0.0 {
        return 0.0;
    }
    idf * (tf * (params.k1 + 1.0)) / denominator
}
