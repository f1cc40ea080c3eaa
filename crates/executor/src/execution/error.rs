use error::ErrorCode;
use itertools::Itertools;
use serde_json::Value;

use crate::{BoxError, FieldError, config::ErrorsConfig};

/// Failures detected by the executor itself while completing a field.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ExecutionError {
    #[error("Cannot return null for non-nullable field {type_name}.{field_name}")]
    InvalidNull { type_name: String, field_name: String },
    #[error("Cannot return null for non-nullable element of type '{element}' for {type_name}.{field_name}")]
    InvalidNullElement {
        type_name: String,
        field_name: String,
        element: String,
    },
    #[error("Failed to build a list for {type_name}.{field_name}, expected {ty} but got {value}")]
    ListResultFailed {
        type_name: String,
        field_name: String,
        ty: String,
        value: Value,
    },
    #[error(
        "Could not resolve {abstract_type} to one of {}, got {}",
        .possible_types.iter().join(", "),
        .resolved.as_deref().unwrap_or("nothing")
    )]
    UnresolvedType {
        abstract_type: String,
        possible_types: Vec<String>,
        resolved: Option<String>,
    },
    #[error("Expected a single value for {type_name}.{field_name}, got a list")]
    UnexpectedList { type_name: String, field_name: String },
    #[error("Unknown field {field_name} on type {type_name}")]
    UnknownField { type_name: String, field_name: String },
    #[error("{0}")]
    Unhandled(BoxError),
}

impl ExecutionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExecutionError::InvalidNull { .. } | ExecutionError::InvalidNullElement { .. } => ErrorCode::InvalidNull,
            ExecutionError::ListResultFailed { .. } => ErrorCode::ListResultFailed,
            ExecutionError::UnresolvedType { .. } => ErrorCode::UnresolvedType,
            ExecutionError::UnknownField { .. } => ErrorCode::BadRequest,
            ExecutionError::UnexpectedList { .. } | ExecutionError::Unhandled(_) => ErrorCode::InternalServerError,
        }
    }

    pub fn into_field_error(self, config: &ErrorsConfig) -> FieldError {
        let code = self.code();
        match self {
            ExecutionError::Unhandled(_) if config.mask_unhandled => {
                FieldError::new(config.unhandled_message.clone()).with_code(code)
            }
            err => FieldError::new(err.to_string()).with_code(code),
        }
    }
}
