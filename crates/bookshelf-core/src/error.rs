//! Error types for all catalog operations.

use std::fmt;

use thiserror::Error;

use crate::store::RecordKey;

/// Top-level error type for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid book: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("book with isbn {isbn} already exists")]
    Conflict { isbn: String },

    #[error("book with isbn {isbn} not found")]
    NotFound { isbn: String },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    /// The error as a list of human-readable messages.
    ///
    /// Validation failures yield one message per violated rule; every other
    /// variant yields a single message.
    pub fn messages(&self) -> Vec<String> {
        match self {
            CatalogError::Validation(errors) => errors.messages().to_vec(),
            CatalogError::NotFound { isbn } => vec![format!("Book with isbn {isbn} not found")],
            CatalogError::Conflict { isbn } => {
                vec![format!("Book with isbn {isbn} already exists")]
            }
            other => vec![other.to_string()],
        }
    }

    /// True if the error reports an existing isbn on create.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CatalogError::Conflict { .. })
    }

    /// True if the error reports a missing isbn.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

/// Ordered list of rule violations found while validating a book.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, message: &str) -> bool {
        self.0.iter().any(|m| m == message)
    }

    /// `Ok(())` when no violation was recorded.
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationErrors> for Vec<String> {
    fn from(errors: ValidationErrors) -> Self {
        errors.0
    }
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("missing attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("unrecognized entity id: {0}")]
    UnknownEntity(String),

    #[error("unexpected sort key '{sort_key}' for entity '{entity_id}'")]
    UnexpectedSortKey { entity_id: String, sort_key: String },

    #[error("malformed record payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conditional check failed for {key}")]
    ConditionFailed { key: RecordKey },

    #[error("transaction exceeds maximum of {max} items (got {actual})")]
    TooManyItems { max: usize, actual: usize },

    #[error("transaction touches {key} more than once")]
    DuplicateKey { key: RecordKey },

    #[error("malformed item: {0}")]
    MalformedItem(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
