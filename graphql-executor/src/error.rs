//! Errors raised while building a schema or executing an operation.

use displaydoc::Display;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;
use crate::graphql::ErrorExtension;
use crate::graphql::CAUSE_EXTENSION;
use crate::json_ext::Object;
pub use crate::spec::SpecError;

/// Error in the schema.
#[derive(Debug, Error, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// GraphQL validation error: {0}
    Validate(String),
    /// the schema does not define a query root operation type
    MissingQueryType,
}

/// Why the concrete object type of an abstract value could not be determined.
#[derive(Debug, Error, Display, Clone, PartialEq, Eq)]
pub enum AbstractResolutionFailure {
    /// runtime type '{0}' is not defined in the schema
    UnknownType(String),
    /// runtime type '{0}' is not an object type
    NotAnObjectType(String),
    /// runtime type '{0}' is not a possible type
    NotAPossibleType(String),
}

/// Field errors raised during execution.
///
/// Each is converted to a GraphQL error at the field boundary where it happens,
/// and the field value becomes `null`.
#[derive(Debug, Error, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExecutionError {
    /// Error trying to resolve field '{parent_field}'.
    FieldNotOnConcreteType {
        /// The field whose value holds the offending object, or the offending
        /// field itself at the operation root.
        parent_field: String,
        field: String,
        type_name: String,
    },
    /// Abstract type '{abstract_type}' must resolve to an object type at runtime: {reason}
    AbstractResolution {
        abstract_type: String,
        reason: AbstractResolutionFailure,
    },
    /// resolver error: {message}
    Resolver { message: String },
    /// {message}
    Completion { message: String },
    /// invalid value for argument '{argument}' of field '{field}': {reason}
    InvalidArgument {
        field: String,
        argument: String,
        reason: String,
    },
    /// maximum selection depth of {max_depth} exceeded
    MaxDepthExceeded { max_depth: usize },
}

impl ExecutionError {
    /// The underlying reason of the error, reported in `extensions.cause`.
    pub fn cause(&self) -> Option<String> {
        match self {
            ExecutionError::FieldNotOnConcreteType {
                field, type_name, ..
            } => Some(format!(
                "Schema is not configured correctly to fetch field '{field}' from type '{type_name}'."
            )),
            _ => None,
        }
    }
}

impl ErrorExtension for ExecutionError {
    fn extension_code(&self) -> String {
        match self {
            ExecutionError::FieldNotOnConcreteType { .. } => "FIELD_NOT_ON_CONCRETE_TYPE",
            ExecutionError::AbstractResolution { .. } => "ABSTRACT_RESOLUTION_FAILED",
            ExecutionError::Resolver { .. } => "RESOLVER_ERROR",
            ExecutionError::Completion { .. } => "INVALID_VALUE",
            ExecutionError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            ExecutionError::MaxDepthExceeded { .. } => "MAX_DEPTH_EXCEEDED",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        if let Some(cause) = self.cause() {
            obj.insert(CAUSE_EXTENSION, cause.into());
        }
        (!obj.is_empty()).then_some(obj)
    }
}
