//! Error types for persistmap

use thiserror::Error;

/// Result type alias for persistmap operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query construction, compilation and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// A referenced member does not correspond to a mapped field of the entity
    #[error("Mapping error: '{field}' is not a mapped field of '{entity}'")]
    Mapping { entity: String, field: String },

    /// The dialect has no rendering rule for an operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// An expression contains a construct that cannot be lowered to SQL
    #[error("Translation error: {0}")]
    Translation(String),

    /// Error reported by the connection while executing a statement
    #[error("Execution error: {0}")]
    Execution(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Builder misuse detected while declaring a statement
    #[error("Validation error: {0}")]
    Validation(String),

    /// A statement was vetoed by an interceptor
    #[error("Aborted by interceptor: {0}")]
    Aborted(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a mapping error for a member of an entity
    pub fn mapping(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Mapping {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create a translation error
    pub fn translation(message: impl Into<String>) -> Self {
        Self::Translation(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a mapping error
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping { .. })
    }

    /// Check if this is an unsupported-operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Check if this is a translation error
    pub fn is_translation(&self) -> bool {
        matches!(self, Self::Translation(_))
    }

    /// Check if this error was raised by the connection
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
