use serde::{Deserialize, Serialize};

/// One rejected field and the reason it was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Failure raised by a handler's execution surface
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Business-rule validation rejected one or more fields
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("{resource} with id {id} not found")]
    NotFound { resource: String, id: String },

    #[error("action '{0}' is not supported")]
    Unsupported(String),

    /// Backing storage could not be reached
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure to read a handler's metadata
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("malformed metadata: {0}")]
    Malformed(String),

    #[error("metadata unavailable: {0}")]
    Unavailable(String),
}
