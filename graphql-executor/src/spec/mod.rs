//! GraphQL documents: the type registry built from SDL and the selection sets lowered
//! from query text.

mod field_type;
mod fragments;
pub(crate) mod query;
mod schema;
mod selection;

use displaydoc::Display;
pub use field_type::FieldType;
pub(crate) use fragments::*;
pub use query::OperationKind;
pub use query::Query;
pub(crate) use query::TYPENAME;
pub use schema::ArgumentDefinition;
pub use schema::FieldDefinition;
pub use schema::Schema;
pub use schema::TypeDescriptor;
pub use schema::TypeKind;
pub(crate) use selection::*;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::graphql::ErrorExtension;

/// GraphQL parsing errors.
#[derive(Error, Debug, Display, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpecError {
    /// Must provide query string.
    MissingQuery,
    /// parsing error: {0}
    ParsingError(String),
    /// Must provide an operation.
    NoOperation,
    /// Must provide operation name if query contains multiple operations.
    MissingOperationName,
    /// Unknown operation named "{0}"
    UnknownOperation(String),
    /// subscription operation is not supported
    SubscriptionNotSupported,
    /// the schema does not support {0} operations
    UnsupportedRootOperation(String),
}

impl ErrorExtension for SpecError {
    fn extension_code(&self) -> String {
        match self {
            SpecError::MissingQuery => "MISSING_QUERY_STRING",
            SpecError::ParsingError(_) => "PARSING_ERROR",
            SpecError::NoOperation => "GRAPHQL_VALIDATION_FAILED",
            SpecError::MissingOperationName => "GRAPHQL_VALIDATION_FAILED",
            SpecError::UnknownOperation(_) => "GRAPHQL_UNKNOWN_OPERATION_NAME",
            SpecError::SubscriptionNotSupported => "SUBSCRIPTION_NOT_SUPPORTED",
            SpecError::UnsupportedRootOperation(_) => "GRAPHQL_VALIDATION_FAILED",
        }
        .to_string()
    }
}
