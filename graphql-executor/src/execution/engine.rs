//! Abstract type resolution and field dispatch.
//!
//! Execution is a depth-first walk of the selection sets. Every field is dispatched
//! against the concrete object type of the value being completed: fields selected on
//! an interface or union without a narrowing fragment are only resolved when the
//! runtime type defines them, otherwise the object is nulled with a field error.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::input_coercion::coerce_argument_values;
use super::resolver::ObjectValue;
use super::result_coercion::complete_value;
use crate::configuration::Configuration;
use crate::error::AbstractResolutionFailure;
use crate::error::ExecutionError;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::Location;
use crate::graphql::CAUSE_EXTENSION;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::spec::Field;
use crate::spec::FieldDefinition;
use crate::spec::Fragments;
use crate::spec::Schema;
use crate::spec::Selection;
use crate::spec::TypeDescriptor;
use crate::spec::TypeKind;

/// Everything an execution reads. Owned by the caller for the duration of one execution.
pub(crate) struct ExecutionContext<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) fragments: &'a Fragments,
    pub(crate) variables: &'a Object,
    pub(crate) configuration: &'a Configuration,
}

/// Return in `Err` when a field error occurred at some non-nullable place
///
/// <https://spec.graphql.org/October2021/#sec-Handling-Field-Errors>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PropagateNull;

/// Linked-list version of `Path`, used to avoid allocating when it is not needed
pub(crate) type LinkedPath<'a> = Option<&'a LinkedPathElement<'a>>;

pub(crate) struct LinkedPathElement<'a> {
    pub(crate) element: PathElement,
    pub(crate) next: LinkedPath<'a>,
}

pub(crate) fn path_to_vec(mut link: LinkedPath<'_>) -> Path {
    let mut elements = Vec::new();
    while let Some(node) = link {
        elements.push(node.element.clone());
        link = node.next;
    }
    elements.reverse();
    Path(elements)
}

/// Number of fields (not list items) between the root and this path.
pub(crate) fn field_depth(mut link: LinkedPath<'_>) -> usize {
    let mut depth = 0;
    while let Some(node) = link {
        if matches!(node.element, PathElement::Key(_)) {
            depth += 1;
        }
        link = node.next;
    }
    depth
}

/// Determines the concrete object type of `object_value` for a field declared with type
/// `declared`.
///
/// An object type resolves to itself. For an interface or union, the runtime type name
/// reported by the resolver must be an object type among the possible types of `declared`.
pub(crate) fn resolve_concrete_type<'s>(
    schema: &'s Schema,
    declared: &'s TypeDescriptor,
    object_value: &ObjectValue<'_>,
) -> Result<&'s TypeDescriptor, ExecutionError> {
    if !declared.is_abstract() {
        return Ok(declared);
    }
    let runtime_type = object_value.type_name();
    let reason = match schema.lookup_type(runtime_type) {
        None => AbstractResolutionFailure::UnknownType(runtime_type.to_string()),
        Some(ty) if ty.kind != TypeKind::Object => {
            AbstractResolutionFailure::NotAnObjectType(runtime_type.to_string())
        }
        Some(ty) if !schema.is_possible_type(declared, &ty.name) => {
            AbstractResolutionFailure::NotAPossibleType(runtime_type.to_string())
        }
        Some(ty) => {
            tracing::trace!(
                abstract_type = declared.name.as_str(),
                concrete_type = ty.name.as_str(),
                "resolved concrete type"
            );
            return Ok(ty);
        }
    };
    Err(ExecutionError::AbstractResolution {
        abstract_type: declared.name.clone(),
        reason,
    })
}

/// <https://spec.graphql.org/October2021/#DoesFragmentTypeApply()>
///
/// A fragment without type condition applies to any type.
pub(crate) fn does_fragment_type_apply(
    schema: &Schema,
    object_type: &TypeDescriptor,
    type_condition: Option<&str>,
) -> bool {
    let Some(type_condition) = type_condition else {
        return true;
    };
    if type_condition == object_type.name {
        return true;
    }
    match schema.lookup_type(type_condition) {
        Some(ty) if ty.kind == TypeKind::Interface => object_type.implements(type_condition),
        Some(ty) if ty.kind == TypeKind::Union => {
            ty.members.iter().any(|member| *member == object_type.name)
        }
        _ => false,
    }
}

/// <https://spec.graphql.org/October2021/#CollectFields()>
///
/// Groups the fields of `selections` applying to `object_type` by response key, in the
/// order their key is first encountered. Each named fragment is expanded at most once.
pub(crate) fn collect_fields<'q>(
    ctx: &ExecutionContext<'q>,
    object_type: &TypeDescriptor,
    selections: impl IntoIterator<Item = &'q Selection>,
    visited_fragments: &mut HashSet<&'q str>,
    grouped_fields: &mut IndexMap<&'q str, Vec<&'q Field>>,
) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                if field.include_skip.should_skip(ctx.variables) {
                    continue;
                }
                grouped_fields
                    .entry(field.response_key())
                    .or_default()
                    .push(field);
            }
            Selection::InlineFragment {
                type_condition,
                include_skip,
                selection_set,
            } => {
                if include_skip.should_skip(ctx.variables)
                    || !does_fragment_type_apply(ctx.schema, object_type, type_condition.as_deref())
                {
                    continue;
                }
                collect_fields(
                    ctx,
                    object_type,
                    selection_set,
                    visited_fragments,
                    grouped_fields,
                )
            }
            Selection::FragmentSpread { name, include_skip } => {
                if include_skip.should_skip(ctx.variables)
                    || !visited_fragments.insert(name.as_str())
                {
                    continue;
                }
                let Some(fragment) = ctx.fragments.get(name) else {
                    failfast_debug!("fragment {} is not defined in the document", name);
                    continue;
                };
                if fragment.include_skip.should_skip(ctx.variables)
                    || !does_fragment_type_apply(
                        ctx.schema,
                        object_type,
                        Some(&fragment.type_condition),
                    )
                {
                    continue;
                }
                collect_fields(
                    ctx,
                    object_type,
                    &fragment.selection_set,
                    visited_fragments,
                    grouped_fields,
                )
            }
        }
    }
}

/// <https://spec.graphql.org/October2021/#ExecuteSelectionSet()>
///
/// `parent_field` is the name of the field whose value is `object_value`, `None` at the
/// operation root.
///
/// A selected field that `object_type` does not define nulls the whole object with one
/// error, attached to the parent field. At the root, only that field is nulled.
///
/// `Err` means the object is `null` and the error was already recorded.
pub(crate) fn execute_selection_set<'q>(
    ctx: &ExecutionContext<'q>,
    errors: &mut Vec<Error>,
    path: LinkedPath<'_>,
    parent_field: Option<&str>,
    object_type: &TypeDescriptor,
    object_value: &ObjectValue<'_>,
    selections: impl IntoIterator<Item = &'q Selection>,
) -> Result<Object, PropagateNull> {
    let mut grouped_field_set = IndexMap::new();
    collect_fields(
        ctx,
        object_type,
        selections,
        &mut HashSet::new(),
        &mut grouped_field_set,
    );

    let mut response_map = Object::with_capacity(grouped_field_set.len());
    for (&response_key, fields) in &grouped_field_set {
        let Some(&field) = fields.first() else {
            continue;
        };
        let field_path = LinkedPathElement {
            element: PathElement::Key(response_key.to_string()),
            next: path,
        };

        if field.is_typename() {
            response_map.insert(response_key, Value::String(object_type.name.as_str().into()));
            continue;
        }

        let Some(field_definition) = object_type.field(&field.name) else {
            let error = ExecutionError::FieldNotOnConcreteType {
                parent_field: parent_field.unwrap_or(&field.name).to_string(),
                field: field.name.clone(),
                type_name: object_type.name.clone(),
            };
            tracing::debug!(
                field = field.name.as_str(),
                type_name = object_type.name.as_str(),
                "field is not defined on the concrete type"
            );
            match parent_field {
                Some(_) => {
                    errors.push(field_error(
                        ctx,
                        &error,
                        path_to_vec(path).field_path(),
                        field.location,
                    ));
                    return Err(PropagateNull);
                }
                None => {
                    errors.push(field_error(
                        ctx,
                        &error,
                        path_to_vec(Some(&field_path)),
                        field.location,
                    ));
                    response_map.insert(response_key, Value::Null);
                    continue;
                }
            }
        };

        let value = execute_field(
            ctx,
            errors,
            Some(&field_path),
            object_value,
            field_definition,
            fields,
        )?;
        response_map.insert(response_key, value);
    }
    Ok(response_map)
}

/// <https://spec.graphql.org/October2021/#ExecuteField()>
///
/// `fields` share the same response key; their sub-selections are merged on completion.
pub(crate) fn execute_field<'q>(
    ctx: &ExecutionContext<'q>,
    errors: &mut Vec<Error>,
    path: LinkedPath<'_>,
    object_value: &ObjectValue<'_>,
    field_definition: &FieldDefinition,
    fields: &[&'q Field],
) -> Result<Value, PropagateNull> {
    let field = fields[0];
    let ty = &field_definition.ty;

    let arguments =
        match coerce_argument_values(ctx.schema, ctx.variables, field_definition, field) {
            Ok(arguments) => arguments,
            Err(error) => {
                errors.push(field_error(ctx, &error, path_to_vec(path), field.location));
                return try_nullify(ty, Err(PropagateNull));
            }
        };

    let resolved = match object_value.resolve_field(&field.name, &arguments) {
        Ok(resolved) => resolved,
        Err(resolver_error) => {
            let error = ExecutionError::Resolver {
                message: resolver_error.message,
            };
            errors.push(field_error(ctx, &error, path_to_vec(path), field.location));
            return try_nullify(ty, Err(PropagateNull));
        }
    };

    let completed = complete_value(ctx, errors, path, ty, resolved, fields);
    try_nullify(ty, completed)
}

/// Try to insert a propagated null if possible, or keep propagating it.
///
/// <https://spec.graphql.org/October2021/#sec-Handling-Field-Errors>
pub(crate) fn try_nullify(
    ty: &crate::spec::FieldType,
    result: Result<Value, PropagateNull>,
) -> Result<Value, PropagateNull> {
    match result {
        Ok(json) => Ok(json),
        Err(PropagateNull) => {
            if ty.is_non_null() {
                Err(PropagateNull)
            } else {
                Ok(Value::Null)
            }
        }
    }
}

/// Converts an execution error to a GraphQL field error.
pub(crate) fn field_error(
    ctx: &ExecutionContext<'_>,
    error: &ExecutionError,
    path: Path,
    location: Location,
) -> Error {
    let mut graphql_error = error.to_graphql_error(Some(path), Some(location));
    if !ctx.configuration.execution.error_cause {
        graphql_error.extensions.remove(CAUSE_EXTENSION);
    }
    graphql_error
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::spec::Query;
    use crate::ResolvedValue;
    use crate::Resolver;
    use crate::ResolverError;

    const SCHEMA: &str = r#"
        schema { query: Person }
        interface Named { name: String }
        type Dog implements Named { name: String barks: Boolean }
        type Cat implements Named { name: String meows: Boolean }
        union Pet = Dog | Cat
        type Person implements Named { name: String pets: [Pet] friends: [Named] }
    "#;

    struct Typed(&'static str);

    impl Resolver for Typed {
        fn type_name(&self) -> &str {
            self.0
        }

        fn resolve_field<'a>(
            &'a self,
            _field_name: &'a str,
            _arguments: &'a Object,
        ) -> Result<ResolvedValue<'a>, ResolverError> {
            Ok(ResolvedValue::null())
        }
    }

    fn response_keys(schema: &Schema, type_name: &str, query: &str) -> Vec<String> {
        let query = Query::parse(query, &Configuration::default()).unwrap();
        let variables = json!({ "yes": true }).as_object().cloned().unwrap();
        let configuration = Configuration::default();
        let ctx = ExecutionContext {
            schema,
            fragments: &query.fragments,
            variables: &variables,
            configuration: &configuration,
        };
        let operation = query.operation(None).unwrap();
        let mut grouped = IndexMap::new();
        collect_fields(
            &ctx,
            schema.lookup_type(type_name).unwrap(),
            &operation.selection_set,
            &mut HashSet::new(),
            &mut grouped,
        );
        grouped
            .iter()
            .map(|(key, fields)| format!("{key}:{}", fields.len()))
            .collect()
    }

    #[test]
    fn resolve_concrete_type_checks_possible_types() {
        let schema = Schema::parse(SCHEMA).unwrap();
        let pet = schema.lookup_type("Pet").unwrap();
        let named = schema.lookup_type("Named").unwrap();
        let dog = schema.lookup_type("Dog").unwrap();

        let resolved = resolve_concrete_type(&schema, pet, &Typed("Cat")).unwrap();
        assert_eq!(resolved.name, "Cat");
        let resolved = resolve_concrete_type(&schema, named, &Typed("Person")).unwrap();
        assert_eq!(resolved.name, "Person");
        // object types resolve to themselves without asking the value
        let resolved = resolve_concrete_type(&schema, dog, &Typed("Anything")).unwrap();
        assert_eq!(resolved.name, "Dog");

        assert_eq!(
            resolve_concrete_type(&schema, pet, &Typed("Person")).unwrap_err(),
            ExecutionError::AbstractResolution {
                abstract_type: "Pet".to_string(),
                reason: AbstractResolutionFailure::NotAPossibleType("Person".to_string()),
            }
        );
        assert_eq!(
            resolve_concrete_type(&schema, pet, &Typed("Bird")).unwrap_err(),
            ExecutionError::AbstractResolution {
                abstract_type: "Pet".to_string(),
                reason: AbstractResolutionFailure::UnknownType("Bird".to_string()),
            }
        );
        assert_eq!(
            resolve_concrete_type(&schema, named, &Typed("Pet")).unwrap_err(),
            ExecutionError::AbstractResolution {
                abstract_type: "Named".to_string(),
                reason: AbstractResolutionFailure::NotAnObjectType("Pet".to_string()),
            }
        );
    }

    #[test]
    fn fragment_type_conditions() {
        let schema = Schema::parse(SCHEMA).unwrap();
        let dog = schema.lookup_type("Dog").unwrap();
        let person = schema.lookup_type("Person").unwrap();
        assert!(does_fragment_type_apply(&schema, dog, None));
        assert!(does_fragment_type_apply(&schema, dog, Some("Dog")));
        assert!(does_fragment_type_apply(&schema, dog, Some("Pet")));
        assert!(does_fragment_type_apply(&schema, dog, Some("Named")));
        assert!(!does_fragment_type_apply(&schema, dog, Some("Cat")));
        assert!(!does_fragment_type_apply(&schema, person, Some("Pet")));
        assert!(does_fragment_type_apply(&schema, person, Some("Named")));
        assert!(!does_fragment_type_apply(&schema, person, Some("Unknown")));
    }

    #[test]
    fn collect_fields_groups_by_response_key() {
        let schema = Schema::parse(SCHEMA).unwrap();
        let query = r#"
            {
              __typename
              name
              ... on Dog { name barks }
              ... on Cat { meows }
              ...DogFields
              ...DogFields
              alias: name @include(if: $yes)
              skipped: name @skip(if: $yes)
            }
            fragment DogFields on Pet { barks }
        "#;
        assert_eq!(
            response_keys(&schema, "Dog", query),
            ["__typename:1", "name:2", "barks:2", "alias:1"]
        );
        assert_eq!(
            response_keys(&schema, "Cat", query),
            ["__typename:1", "name:1", "meows:1", "barks:1", "alias:1"]
        );
    }

    #[test]
    fn collect_fields_terminates_on_fragment_cycles() {
        let schema = Schema::parse(SCHEMA).unwrap();
        let query = r#"
            { ...A }
            fragment A on Person { name ...B }
            fragment B on Person { pets { __typename } ...A }
        "#;
        assert_eq!(response_keys(&schema, "Person", query), ["name:1", "pets:1"]);
    }

    #[test]
    fn unknown_fragments_are_skipped() {
        let schema = Schema::parse(SCHEMA).unwrap();
        if cfg!(feature = "failfast") {
            return;
        }
        assert_eq!(
            response_keys(&schema, "Person", "{ name ...Missing }"),
            ["name:1"]
        );
    }

    #[test]
    fn linked_paths() {
        let root = LinkedPathElement {
            element: PathElement::Key("pets".to_string()),
            next: None,
        };
        let item = LinkedPathElement {
            element: PathElement::Index(1),
            next: Some(&root),
        };
        let leaf = LinkedPathElement {
            element: PathElement::Key("name".to_string()),
            next: Some(&item),
        };
        assert_eq!(path_to_vec(Some(&leaf)), Path::from("pets/1/name"));
        assert_eq!(path_to_vec(Some(&item)).field_path(), Path::from("pets"));
        assert_eq!(field_depth(Some(&leaf)), 2);
        assert_eq!(field_depth(None), 0);
    }

    #[test]
    fn nullify() {
        let nullable = crate::spec::FieldType::Named("Pet".to_string());
        let non_null = crate::spec::FieldType::NonNull(Box::new(nullable.clone()));
        assert_eq!(try_nullify(&nullable, Err(PropagateNull)), Ok(Value::Null));
        assert_eq!(try_nullify(&non_null, Err(PropagateNull)), Err(PropagateNull));
        assert_eq!(try_nullify(&non_null, Ok(json!(1))), Ok(json!(1)));
    }
}
