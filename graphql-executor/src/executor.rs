use std::sync::Arc;

use crate::configuration::Configuration;
use crate::execution::engine::execute_selection_set;
use crate::execution::engine::ExecutionContext;
use crate::execution::resolver::ObjectValue;
use crate::graphql::ErrorExtension;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::OperationKind;
use crate::spec::Query;
use crate::spec::Schema;
use crate::spec::SpecError;

/// Executes GraphQL requests against a schema and a root resolver.
///
/// Cheap to clone: the schema and configuration are shared.
#[derive(Clone, Debug)]
pub struct Executor {
    schema: Arc<Schema>,
    configuration: Arc<Configuration>,
}

#[buildstructor::buildstructor]
impl Executor {
    #[builder(visibility = "pub")]
    fn new(schema: Arc<Schema>, configuration: Option<Arc<Configuration>>) -> Self {
        Self {
            schema,
            configuration: configuration.unwrap_or_default(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Parses a query document with the configured parser limits.
    pub fn parse_query(&self, query: &str) -> Result<Query, SpecError> {
        Query::parse(query, &self.configuration)
    }

    /// Executes a request, starting from `root` as the value of the root operation type.
    ///
    /// Request errors (missing or invalid document, unknown operation) produce a response
    /// without `data`. Field errors are collected in the response next to partial data.
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn execute(&self, request: &Request, root: &ObjectValue<'_>) -> Response {
        let query = match request.query.as_deref() {
            Some(query) if !query.trim().is_empty() => self.parse_query(query),
            _ => Err(SpecError::MissingQuery),
        };
        match query {
            Ok(query) => self.execute_query(
                &query,
                request.operation_name.as_deref(),
                &request.variables,
                root,
            ),
            Err(error) => request_error(error),
        }
    }

    /// Executes one operation of an already parsed document.
    pub fn execute_query(
        &self,
        query: &Query,
        operation_name: Option<&str>,
        variables: &Object,
        root: &ObjectValue<'_>,
    ) -> Response {
        let operation = match query.operation(operation_name) {
            Ok(operation) => operation,
            Err(error) => return request_error(error),
        };
        if operation.kind == OperationKind::Subscription {
            return request_error(SpecError::SubscriptionNotSupported);
        }
        let Some(root_type) = self.schema.root_operation_type(operation.kind) else {
            return request_error(SpecError::UnsupportedRootOperation(
                operation.kind.to_string(),
            ));
        };

        let variables = operation.variables_with_defaults(variables);
        let ctx = ExecutionContext {
            schema: &self.schema,
            fragments: &query.fragments,
            variables: &variables,
            configuration: &self.configuration,
        };
        let mut errors = Vec::new();
        let data = execute_selection_set(
            &ctx,
            &mut errors,
            None,
            None,
            root_type,
            root,
            &operation.selection_set,
        )
        .map(Value::Object)
        // The root object is nullable: a propagated null becomes `"data": null`
        .unwrap_or(Value::Null);

        tracing::debug!(
            operation_name,
            kind = operation.kind.as_str(),
            errors = errors.len(),
            "executed operation"
        );
        Response::builder().data(data).errors(errors).build()
    }
}

fn request_error(error: SpecError) -> Response {
    tracing::debug!(%error, "request error");
    Response::builder()
        .error(error.to_graphql_error(None, None))
        .build()
}
