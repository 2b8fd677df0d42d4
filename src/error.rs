use thiserror::Error;

/// Main error type for quarry operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Syntax error at {path}: {message}")]
    Syntax { path: String, message: String },

    #[error("Invalid value at {path}: {message}")]
    Validation { path: String, message: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Snapshot error: incompatible version {actual}, expected <= {expected}")]
    IncompatibleSnapshot { expected: u32, actual: u32 },

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for quarry operations
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// Build a syntax error for the node at `path`
    pub fn syntax(path: impl Into<String>, message: impl Into<String>) -> Self {
        SearchError::Syntax {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a validation error for the node at `path`
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        SearchError::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error was caused by the request rather than the engine
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::Syntax { .. } | SearchError::Validation { .. } | SearchError::MissingField(_)
        )
    }

    /// JSON path of the offending node, if the error carries one
    pub fn path(&self) -> Option<&str> {
        match self {
            SearchError::Syntax { path, .. } | SearchError::Validation { path, .. } => Some(path),
            _ => None,
        }
    }
}
