use super::engine::execute_selection_set;
use super::engine::field_depth;
use super::engine::field_error;
use super::engine::path_to_vec;
use super::engine::resolve_concrete_type;
use super::engine::try_nullify;
use super::engine::ExecutionContext;
use super::engine::LinkedPath;
use super::engine::LinkedPathElement;
use super::engine::PropagateNull;
use super::resolver::ResolvedValue;
use crate::error::ExecutionError;
use crate::graphql::Error;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::spec::Field;
use crate::spec::FieldType;

/// <https://spec.graphql.org/October2021/#CompleteValue()>
///
/// Returns `Err` for a field error being propagated upwards to find a nullable place
pub(crate) fn complete_value<'q>(
    ctx: &ExecutionContext<'q>,
    errors: &mut Vec<Error>,
    path: LinkedPath<'_>,
    ty: &FieldType,
    resolved: ResolvedValue<'_>,
    fields: &[&'q Field],
) -> Result<Value, PropagateNull> {
    let location = fields[0].location;
    macro_rules! field_error {
        (@error $error: expr) => {{
            errors.push(field_error(ctx, &$error, path_to_vec(path), location));
            return Err(PropagateNull);
        }};
        ($($arg: tt)+) => {
            field_error!(@error ExecutionError::Completion {
                message: format!($($arg)+),
            })
        };
    }

    if let ResolvedValue::Leaf(Value::Null) = resolved {
        if ty.is_non_null() {
            field_error!(
                "Cannot return null for non-nullable field {}",
                fields[0].name
            )
        } else {
            return Ok(Value::Null);
        }
    }

    let named_type = match ty.nullable() {
        FieldType::List(inner_ty) => {
            let ResolvedValue::List(iter) = resolved else {
                field_error!("Expected a list for type {ty}")
            };
            let mut completed_list = Vec::with_capacity(iter.size_hint().0);
            for (index, inner_result) in iter.enumerate() {
                let inner_path = LinkedPathElement {
                    element: PathElement::Index(index),
                    next: path,
                };
                let inner_result = match inner_result {
                    Ok(inner_resolved) => complete_value(
                        ctx,
                        errors,
                        Some(&inner_path),
                        inner_ty,
                        inner_resolved,
                        fields,
                    ),
                    Err(resolver_error) => {
                        let error = ExecutionError::Resolver {
                            message: resolver_error.message,
                        };
                        errors.push(field_error(
                            ctx,
                            &error,
                            path_to_vec(Some(&inner_path)),
                            location,
                        ));
                        Err(PropagateNull)
                    }
                };
                // On field error, try to nullify that item
                match try_nullify(inner_ty, inner_result) {
                    Ok(inner_value) => completed_list.push(inner_value),
                    // If the item is non-null, try to nullify the list
                    Err(PropagateNull) => return try_nullify(ty, Err(PropagateNull)),
                }
            }
            return Ok(Value::Array(completed_list));
        }
        FieldType::Named(name) => name.as_str(),
        FieldType::NonNull(_) => field_error!("Invalid nested non-null type {ty}"),
    };

    let schema = ctx.schema;
    let Some(declared_type) = schema.lookup_type(named_type) else {
        // Leaf types
        let ResolvedValue::Leaf(value) = resolved else {
            field_error!("Expected a leaf value for type {named_type}")
        };
        return match coerce_leaf_value(ctx, named_type, value) {
            Ok(value) => Ok(value),
            Err(message) => field_error!("{message}"),
        };
    };

    let object_value = match resolved {
        ResolvedValue::Object(object_value) => object_value,
        ResolvedValue::Leaf(value) => {
            field_error!("Expected an object for type {named_type}, found {value}")
        }
        ResolvedValue::List(_) => {
            field_error!("Expected an object for type {named_type}, found a list")
        }
    };

    let object_type = match resolve_concrete_type(schema, declared_type, &*object_value) {
        Ok(object_type) => object_type,
        Err(error) => field_error!(@error error),
    };

    let max_depth = ctx.configuration.execution.max_depth;
    if field_depth(path) >= max_depth {
        field_error!(@error ExecutionError::MaxDepthExceeded { max_depth })
    }

    execute_selection_set(
        ctx,
        errors,
        path,
        Some(fields[0].name.as_str()),
        object_type,
        &*object_value,
        fields
            .iter()
            .flat_map(|&field| field.selection_set.iter().flatten()),
    )
    .map(Value::Object)
}

/// Result coercion of scalar and enum values.
///
/// Custom scalars accept any JSON value, including arrays and objects.
fn coerce_leaf_value(
    ctx: &ExecutionContext<'_>,
    type_name: &str,
    value: Value,
) -> Result<Value, String> {
    let valid = match type_name {
        // https://spec.graphql.org/October2021/#sec-Int.Result-Coercion
        "Int" => match value.as_i64() {
            Some(int) if i32::try_from(int).is_err() => {
                return Err(format!("Resolver returned {value} which overflows Int"));
            }
            Some(_) => true,
            None => false,
        },
        // https://spec.graphql.org/October2021/#sec-Float.Result-Coercion
        "Float" => value.is_number(),
        "String" => value.is_string(),
        "Boolean" => value.is_boolean(),
        // https://spec.graphql.org/October2021/#sec-ID.Result-Coercion
        "ID" => {
            if let Some(int) = value.as_i64() {
                return Ok(Value::String(int.to_string().into()));
            }
            value.is_string()
        }
        _ => {
            if let Some(is_value) = ctx
                .schema
                .is_enum_value(type_name, value.as_str().unwrap_or_default())
            {
                // https://spec.graphql.org/October2021/#sec-Enums.Result-Coercion
                is_value
            } else if ctx.schema.is_custom_scalar(type_name) {
                true
            } else {
                return Err(format!("Type {type_name} is not an output type"));
            }
        }
    };
    if valid {
        Ok(value)
    } else {
        Err(format!("Resolver returned {value}, expected {type_name}"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::configuration::Configuration;
    use crate::spec::Fragments;
    use crate::spec::Schema;

    const SCHEMA: &str = r#"
        type Query { a: Int }
        enum Kind { DOG CAT }
        scalar JSON
        input Filter { kind: Kind }
    "#;

    fn coerce(type_name: &str, value: Value) -> Result<Value, String> {
        let schema = Schema::parse(SCHEMA).unwrap();
        let configuration = Configuration::default();
        let ctx = ExecutionContext {
            schema: &schema,
            fragments: &Fragments::default(),
            variables: &Default::default(),
            configuration: &configuration,
        };
        coerce_leaf_value(&ctx, type_name, value)
    }

    #[test]
    fn leaf_values() {
        assert_eq!(coerce("Int", json!(3)), Ok(json!(3)));
        assert_eq!(coerce("Float", json!(3)), Ok(json!(3)));
        assert_eq!(coerce("Float", json!(1.5)), Ok(json!(1.5)));
        assert_eq!(coerce("String", json!("a")), Ok(json!("a")));
        assert_eq!(coerce("Boolean", json!(false)), Ok(json!(false)));
        assert_eq!(coerce("ID", json!(12)), Ok(json!("12")));
        assert_eq!(coerce("ID", json!("x")), Ok(json!("x")));
        assert_eq!(coerce("Kind", json!("CAT")), Ok(json!("CAT")));
        assert_eq!(
            coerce("JSON", json!({ "any": [1] })),
            Ok(json!({ "any": [1] }))
        );
    }

    #[test]
    fn invalid_leaf_values() {
        assert_eq!(
            coerce("Int", json!(3_000_000_000i64)),
            Err("Resolver returned 3000000000 which overflows Int".to_string())
        );
        assert_eq!(
            coerce("Int", json!("3")),
            Err("Resolver returned \"3\", expected Int".to_string())
        );
        assert_eq!(
            coerce("Boolean", json!(0)),
            Err("Resolver returned 0, expected Boolean".to_string())
        );
        assert_eq!(
            coerce("Kind", json!("BIRD")),
            Err("Resolver returned \"BIRD\", expected Kind".to_string())
        );
        assert_eq!(
            coerce("Filter", json!({})),
            Err("Type Filter is not an output type".to_string())
        );
    }
}
