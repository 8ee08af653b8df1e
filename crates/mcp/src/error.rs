// Failure classification and mapping to JSON-RPC errors

use crate::protocol::JsonRpcError;
use crate::schema::InputSchema;
use toolbridge_core::{ExecutionError, FieldError};

/// A single way the arguments of a call break the tool's input schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Missing(String),
    Unknown(String),
    WrongType { field: String, expected: &'static str },
    NotAllowed { field: String, allowed: Vec<String> },
    TooLong { field: String, max: usize },
}

impl Violation {
    pub fn field(&self) -> &str {
        match self {
            Violation::Missing(field) | Violation::Unknown(field) => field,
            Violation::WrongType { field, .. }
            | Violation::NotAllowed { field, .. }
            | Violation::TooLong { field, .. } => field,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::Missing(field) => write!(f, "missing required argument '{}'", field),
            Violation::Unknown(field) => write!(f, "unexpected argument '{}'", field),
            Violation::WrongType { field, expected } => {
                write!(f, "argument '{}' must be {}", field, expected)
            }
            Violation::NotAllowed { field, allowed } => {
                write!(f, "argument '{}' must be one of: {}", field, allowed.join(", "))
            }
            Violation::TooLong { field, max } => {
                write!(f, "argument '{}' must be at most {} characters", field, max)
            }
        }
    }
}

/// Why a tool call failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolFailure {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// Arguments do not match the input schema; nothing was executed
    #[error("invalid arguments for {tool}: {} violation(s)", .violations.len())]
    InvalidArguments {
        tool: String,
        violations: Vec<Violation>,
    },

    /// The resource layer rejected field values
    #[error("{tool} rejected {} field(s)", .errors.len())]
    Rejected { tool: String, errors: Vec<FieldError> },

    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },

    #[error("{tool} failed: {detail}")]
    Internal { tool: String, detail: String },
}

impl ToolFailure {
    /// Classify a resource-layer failure for `tool`.
    ///
    /// Rejected fields are ordered by their position in `schema`; fields the
    /// schema does not know keep the handler's order after the known ones.
    pub fn from_execution(tool: &str, schema: &InputSchema, error: ExecutionError) -> Self {
        match error {
            ExecutionError::Validation(mut errors) => {
                errors.sort_by_key(|error| {
                    let top = error.field.split('.').next().unwrap_or(&error.field);
                    schema.position(top).unwrap_or(usize::MAX)
                });
                ToolFailure::Rejected {
                    tool: tool.to_string(),
                    errors,
                }
            }
            ExecutionError::NotFound { resource, id } => ToolFailure::NotFound { resource, id },
            other => {
                tracing::error!("Tool {} failed: {}", tool, other);
                ToolFailure::Internal {
                    tool: tool.to_string(),
                    detail: other.to_string(),
                }
            }
        }
    }

    /// Protocol error for this failure
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            ToolFailure::UnknownTool(name) => JsonRpcError::tool_not_found(name),
            ToolFailure::InvalidArguments { tool, violations } => {
                JsonRpcError::invalid_params(format!(
                    "Invalid arguments for {}: {}",
                    tool,
                    join(violations)
                ))
            }
            ToolFailure::Rejected { tool, errors } => JsonRpcError::invalid_params(format!(
                "Validation failed for {}: {}",
                tool,
                join(errors)
            )),
            ToolFailure::NotFound { resource, id } => {
                JsonRpcError::invalid_params(format!("No {} found with id '{}'", resource, id))
            }
            // detail stays in the logs
            ToolFailure::Internal { tool, .. } => {
                JsonRpcError::internal_error(format!("Internal error while executing {}", tool))
            }
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
