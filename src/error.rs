//! Error taxonomy for template store operations.

use thiserror::Error;

/// Result type for template store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by the validator, the template store and the JSON import path.
///
/// Every variant is recoverable: a failed call leaves both the in-memory
/// template set and the persisted value as they were.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Template data has an invalid structure: {0}")]
    Validation(String),

    #[error("Could not parse template JSON: {0}")]
    Parse(String),

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Message index {index} is out of bounds for category {category} ({len} messages)")]
    Index {
        category: String,
        index: usize,
        len: usize,
    },

    #[error("{0} must not be empty")]
    EmptyText(&'static str),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Short machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "validation",
            StoreError::Parse(_) => "parse",
            StoreError::DuplicateCategory(_) => "duplicate_category",
            StoreError::NotFound(_) => "not_found",
            StoreError::Index { .. } => "index",
            StoreError::EmptyText(_) => "empty_text",
            StoreError::Storage(_) => "storage",
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_error_message_names_bounds() {
        let err = StoreError::Index {
            category: "greeting".into(),
            index: 5,
            len: 2,
        };
        assert_eq!(
            err.to_string(),
            "Message index 5 is out of bounds for category greeting (2 messages)"
        );
        assert_eq!(err.kind(), "index");
    }

    #[test]
    fn io_errors_become_storage_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Storage(ref reason) if reason.contains("denied")));
    }

    #[test]
    fn empty_text_names_the_field() {
        assert_eq!(
            StoreError::EmptyText("Category name").to_string(),
            "Category name must not be empty"
        );
    }
}
