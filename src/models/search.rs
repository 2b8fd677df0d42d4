use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregation::AggregationResults;
use crate::store::DocumentId;

/// Search hit with relevance score
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: DocumentId,
    pub score: f32,
}

/// Search request body
///
/// Every part is optional: no query matches all documents, no limit uses the
/// engine default.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub aggs: Option<Value>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_aggs(mut self, aggs: Value) -> Self {
        self.aggs = Some(aggs);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Search response
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Number of matched documents, regardless of paging
    pub total: u64,
    pub hits: Vec<Hit>,
    /// Highest score over all matched documents
    pub max_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<AggregationResults>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self {
            total: 0,
            hits: Vec::new(),
            max_score: None,
            aggs: None,
        }
    }

    /// Ids of the returned hits, in rank order
    pub fn ids(&self) -> Vec<DocumentId> {
        self.hits.iter().map(|h| h.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_serialization() {
        let response = SearchResponse {
            total: 2,
            hits: vec![Hit { id: 7, score: 1.5 }, Hit { id: 3, score: 1.0 }],
            max_score: Some(1.5),
            aggs: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "total": 2,
                "hits": [{ "id": 7, "score": 1.5 }, { "id": 3, "score": 1.0 }],
                "maxScore": 1.5
            })
        );
        assert_eq!(response.ids(), vec![7, 3]);
    }

    #[test]
    fn test_empty_response() {
        let value = serde_json::to_value(SearchResponse::empty()).unwrap();
        assert_eq!(value, json!({ "total": 0, "hits": [], "maxScore": null }));
    }

    #[test]
    fn test_request_defaults() {
        let request: SearchRequest = serde_json::from_value(json!({
            "query": { "term": { "a": 1 } }
        }))
        .unwrap();
        assert!(request.query.is_some());
        assert!(request.aggs.is_none());
        assert_eq!(request.limit, None);
        assert_eq!(request.offset, 0);

        let request = SearchRequest::new().with_limit(5).with_offset(10);
        assert_eq!(request.limit, Some(5));
        assert_eq!(request.offset, 10);
    }
}
