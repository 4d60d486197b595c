//! Query document lowering.
//!
//! Operations and fragments are read from the parser's concrete syntax tree without
//! validation against the schema, so documents selecting fields that only exist on some
//! possible types of an abstract type remain executable.

use apollo_parser::cst;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Configuration;
use crate::json_ext::Object;
use crate::spec::selection::name_text;
use crate::spec::selection::selection_set_from_cst;
use crate::spec::selection::Lowering;
use crate::spec::Fragments;
use crate::spec::InputValue;
use crate::spec::Selection;
use crate::spec::SpecError;

pub(crate) const TYPENAME: &str = "__typename";

/// The kind of a GraphQL operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub(crate) const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<cst::OperationType> for OperationKind {
    fn from(operation_type: cst::OperationType) -> Self {
        if operation_type.mutation_token().is_some() {
            OperationKind::Mutation
        } else if operation_type.subscription_token().is_some() {
            OperationKind::Subscription
        } else {
            OperationKind::Query
        }
    }
}

/// A parsed query document.
#[derive(Debug)]
pub struct Query {
    string: String,
    pub(crate) fragments: Fragments,
    pub(crate) operations: Vec<Operation>,
}

#[derive(Debug)]
pub(crate) struct Operation {
    pub(crate) name: Option<String>,
    pub(crate) kind: OperationKind,
    pub(crate) selection_set: Vec<Selection>,
    /// Default values of the variables declaring one.
    pub(crate) variable_defaults: Vec<(String, InputValue)>,
}

impl Query {
    pub fn parse(query: impl Into<String>, configuration: &Configuration) -> Result<Self, SpecError> {
        let string = query.into();

        let parser = apollo_parser::Parser::new(string.as_str())
            .recursion_limit(configuration.parser.recursion_limit)
            .token_limit(configuration.parser.token_limit);
        let tree = parser.parse();

        // Trace log recursion limit data
        let recursion_limit = tree.recursion_limit();
        tracing::trace!(?recursion_limit, "recursion limit data");

        let errors = tree
            .errors()
            .map(|err| err.message().to_string())
            .collect::<Vec<_>>();

        if !errors.is_empty() {
            let errors = errors.join(", ");
            tracing::debug!("parsing error(s): {}", errors);
            return Err(SpecError::ParsingError(errors));
        }

        let document = tree.document();
        let lowering = Lowering::new(&string, configuration.parser.max_selection_depth);
        let fragments = Fragments::from_cst(&document, &lowering)?;

        let mut operations = Vec::new();
        for definition in document.definitions() {
            match definition {
                cst::Definition::OperationDefinition(operation) => {
                    operations.push(Operation::from_cst(operation, &lowering)?)
                }
                cst::Definition::FragmentDefinition(_) => {}
                _ => {
                    failfast_debug!("ignoring a type system definition in an executable document");
                }
            }
        }

        Ok(Query {
            string,
            fragments,
            operations,
        })
    }

    /// The query text.
    pub fn as_str(&self) -> &str {
        &self.string
    }

    /// Selects the operation to execute.
    ///
    /// Without a name, the document must contain exactly one operation.
    pub(crate) fn operation(&self, operation_name: Option<&str>) -> Result<&Operation, SpecError> {
        match operation_name {
            Some(name) => self
                .operations
                .iter()
                .find(|op| op.name.as_deref() == Some(name))
                .ok_or_else(|| SpecError::UnknownOperation(name.to_string())),
            None => match self.operations.as_slice() {
                [] => Err(SpecError::NoOperation),
                [operation] => Ok(operation),
                _ => Err(SpecError::MissingOperationName),
            },
        }
    }

    /// The names of the operations in the document, `None` for an anonymous one.
    pub fn operation_names(&self) -> impl Iterator<Item = Option<&str>> {
        self.operations.iter().map(|op| op.name.as_deref())
    }

    /// Returns `true` if the operation named `operation_name` can be executed.
    pub fn contains_operation(&self, operation_name: Option<&str>) -> bool {
        self.operation(operation_name).is_ok()
    }
}

impl Operation {
    fn from_cst(
        operation: cst::OperationDefinition,
        lowering: &Lowering,
    ) -> Result<Self, SpecError> {
        let name = operation
            .name()
            .map(|name| name.text().to_string());
        let kind = operation
            .operation_type()
            .map(OperationKind::from)
            .unwrap_or_default();

        let selection_set = operation
            .selection_set()
            .map(|selection_set| selection_set_from_cst(selection_set, lowering, 1))
            .transpose()?
            .unwrap_or_default();

        let variable_defaults = operation
            .variable_definitions()
            .into_iter()
            .flat_map(|definitions| definitions.variable_definitions())
            .filter_map(|definition| {
                let value = definition.default_value()?.value()?;
                Some(
                    name_text(definition.variable().and_then(|variable| variable.name()))
                        .and_then(|name| Ok((name, InputValue::from_cst(value)?))),
                )
            })
            .collect::<Result<Vec<_>, SpecError>>()?;

        Ok(Operation {
            name,
            kind,
            selection_set,
            variable_defaults,
        })
    }

    /// Variables of the request with defaults applied for the ones it omits.
    pub(crate) fn variables_with_defaults(&self, variables: &Object) -> Object {
        let mut result = variables.clone();
        for (name, default) in &self.variable_defaults {
            if !result.contains_key(name.as_str()) {
                result.insert(name.as_str(), default.to_constant());
            }
        }
        result
    }
}
