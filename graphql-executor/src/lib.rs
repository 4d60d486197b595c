//! GraphQL execution with per-element dispatch on interface and union types.
//!
//! Fields selected on an abstract type are resolved against the concrete object type
//! of each value. A value whose type does not define a selected field is nulled with a
//! `FIELD_NOT_ON_CONCRETE_TYPE` error, while its siblings in the same list complete normally.

#![cfg_attr(feature = "failfast", allow(unreachable_code))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

macro_rules! failfast_debug {
    ($($tokens:tt)+) => {{
        tracing::debug!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

pub mod json_ext;

mod configuration;
pub mod error;
#[macro_use]
mod execution;
mod executor;
pub mod graphql;
mod spec;

pub use configuration::generate_config_schema;
pub use configuration::Configuration;
pub use configuration::Execution;
pub use configuration::Parser;
pub use error::ConfigurationError;
pub use error::ExecutionError;
pub use error::SchemaError;
pub use error::SpecError;
pub use execution::resolver::ObjectValue;
pub use execution::resolver::ResolvedValue;
pub use execution::resolver::Resolver;
pub use execution::resolver::ResolverError;
pub use executor::Executor;
pub use spec::ArgumentDefinition;
pub use spec::FieldDefinition;
pub use spec::FieldType;
pub use spec::OperationKind;
pub use spec::Query;
pub use spec::Schema;
pub use spec::TypeDescriptor;
pub use spec::TypeKind;
