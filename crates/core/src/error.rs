use uuid::Uuid;

use crate::notification::Status;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Missing template variables: {0:?}")]
    MissingVariables(Vec<String>),

    #[error("Batch size {size} exceeds maximum of {max}")]
    BatchSizeExceeded { size: usize, max: usize },

    #[error("Notification in status {status} cannot be cancelled")]
    CannotCancel { status: Status },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            message: message.into(),
        }
    }
}
