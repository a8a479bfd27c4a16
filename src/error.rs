//! Error types for resource identification

use thiserror::Error;

/// Failures reported by a [`Store`](crate::store::Store) backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unexpected query result: expected {expected}, found {found}")]
    UnexpectedResult {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Store backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum IdentifyError {
    #[error("Cannot build a resource from an empty statement list")]
    EmptyStatementList,

    #[error("Statement subject '{found}' does not match resource '{expected}'")]
    SubjectMismatch { expected: String, found: String },

    #[error("Store invariant violated for '{uri}': {reason}")]
    StoreInvariantViolation { uri: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to load statements from {path}: {reason}")]
    LoadError { path: String, reason: String },

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
