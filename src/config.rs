use serde::{Deserialize, Serialize};

/// BM25 parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation parameter
    pub k1: f32,
    /// Length normalization parameter
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        // Same defaults as Elasticsearch
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Engine-wide settings shared by every index
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub bm25: Bm25Params,
    /// Hits returned when a search does not specify a limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Upper bound for `offset + limit`
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,
    /// Bucket count for terms aggregations without an explicit size
    #[serde(default = "default_terms_size")]
    pub default_terms_size: usize,
    /// Maximum nesting of sub-aggregations
    #[serde(default = "default_max_aggregation_depth")]
    pub max_aggregation_depth: usize,
}

fn default_limit() -> usize {
    10
}

fn default_max_result_window() -> usize {
    10_000
}

fn default_terms_size() -> usize {
    10
}

fn default_max_aggregation_depth() -> usize {
    8
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bm25: Bm25Params::default(),
            default_limit: default_limit(),
            max_result_window: default_max_result_window(),
            default_terms_size: default_terms_size(),
            max_aggregation_depth: default_max_aggregation_depth(),
        }
    }
}

impl EngineSettings {
    /// Set the BM25 parameters
    pub fn with_bm25(mut self, k1: f32, b: f32) -> Self {
        self.bm25 = Bm25Params { k1, b };
        self
    }

    /// Set the default number of hits per search
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the maximum result window
    pub fn with_max_result_window(mut self, window: usize) -> Self {
        self.max_result_window = window;
        self
    }

    /// Set the default terms aggregation size
    pub fn with_default_terms_size(mut self, size: usize) -> Self {
        self.default_terms_size = size;
        self
    }

    /// Set the maximum aggregation depth
    pub fn with_max_aggregation_depth(mut self, depth: usize) -> Self {
        self.max_aggregation_depth = depth;
        self
    }
}
