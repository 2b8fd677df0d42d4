use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SearchError};
use crate::store::DocumentId;

/// Document as handed to an index: a caller-assigned id plus its source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub source: Map<String, Value>,
}

impl Document {
    pub fn new(id: DocumentId, source: Map<String, Value>) -> Self {
        Self { id, source }
    }

    /// Build a document from a JSON object source
    pub fn from_value(id: DocumentId, source: Value) -> Result<Self> {
        match source {
            Value::Object(map) => Ok(Self::new(id, map)),
            _ => Err(SearchError::validation(
                "source",
                "document source must be an object",
            )),
        }
    }

    /// Parse one line of newline-delimited JSON: `{"id": 1, "source": {...}}`
    pub fn from_json_line(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| SearchError::syntax("document", format!("invalid document: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let doc = Document::from_value(3, json!({ "title": "hello" })).unwrap();
        assert_eq!(doc.id, 3);
        assert_eq!(doc.source["title"], json!("hello"));

        assert!(Document::from_value(3, json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_from_json_line() {
        let doc = Document::from_json_line(r#"{"id": 9, "source": {"n": 1}}"#).unwrap();
        assert_eq!(doc.id, 9);
        assert_eq!(doc.source["n"], json!(1));

        assert!(Document::from_json_line(r#"{"id": -1, "source": {}}"#).is_err());
        assert!(Document::from_json_line("garbage").is_err());
    }
}
