use serde_json_bytes::ByteString;

use crate::error::ExecutionError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::Field;
use crate::spec::FieldDefinition;
use crate::spec::FieldType;
use crate::spec::InputValue;
use crate::spec::Schema;

/// <https://spec.graphql.org/October2021/#CoerceArgumentValues()>
///
/// Arguments the field definition does not declare are ignored.
pub(crate) fn coerce_argument_values(
    schema: &Schema,
    variable_values: &Object,
    field_definition: &FieldDefinition,
    field: &Field,
) -> Result<Object, ExecutionError> {
    let mut coerced_values = Object::new();
    for argument_definition in &field_definition.arguments {
        let argument_name = argument_definition.name.as_str();
        let invalid = |reason: String| ExecutionError::InvalidArgument {
            field: field.name.clone(),
            argument: argument_name.to_string(),
            reason,
        };

        let value = match field
            .arguments
            .iter()
            .find(|(name, _)| name == argument_name)
            .map(|(_, value)| value)
        {
            // An undefined variable is the same as an omitted argument
            Some(InputValue::Variable(variable_name)) => {
                variable_values.get(variable_name.as_str()).cloned()
            }
            Some(value) => Some(substitute_variables(value, variable_values)),
            None => None,
        };

        let ty = &argument_definition.ty;
        match value {
            Some(value) => {
                let coerced = coerce_input_value(schema, ty, value).map_err(invalid)?;
                coerced_values.insert(argument_name, coerced);
            }
            None => {
                if let Some(default) = &argument_definition.default_value {
                    coerced_values.insert(argument_name, default.clone());
                } else if ty.is_non_null() {
                    return Err(invalid(format!("missing value of type {ty}")));
                }
            }
        }
    }
    Ok(coerced_values)
}

/// Replaces variables nested in list and object values. Undefined variables become `null`.
fn substitute_variables(value: &InputValue, variable_values: &Object) -> Value {
    match value {
        InputValue::Variable(name) => variable_values
            .get(name.as_str())
            .cloned()
            .unwrap_or(Value::Null),
        InputValue::Constant(value) => value.clone(),
        InputValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_variables(item, variable_values))
                .collect(),
        ),
        InputValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| {
                    (
                        ByteString::from(name.as_str()),
                        substitute_variables(value, variable_values),
                    )
                })
                .collect(),
        ),
    }
}

/// <https://spec.graphql.org/October2021/#sec-Input-Values>
fn coerce_input_value(schema: &Schema, ty: &FieldType, value: Value) -> Result<Value, String> {
    match ty {
        FieldType::NonNull(inner) => {
            if value.is_null() {
                Err(format!("null value for non-null type {ty}"))
            } else {
                coerce_input_value(schema, inner, value)
            }
        }
        _ if value.is_null() => Ok(Value::Null),
        FieldType::List(inner) => match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| coerce_input_value(schema, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // A single value is coerced to a list of one item
            item => Ok(Value::Array(vec![coerce_input_value(schema, inner, item)?])),
        },
        FieldType::Named(name) => {
            let valid = match name.as_str() {
                "Int" => value
                    .as_i64()
                    .is_some_and(|int| i32::try_from(int).is_ok()),
                "Float" => value.is_number(),
                "String" => value.is_string(),
                "Boolean" => value.is_boolean(),
                "ID" => {
                    if let Some(int) = value.as_i64() {
                        return Ok(Value::String(int.to_string().into()));
                    }
                    value.is_string()
                }
                _ => match schema.is_enum_value(name, value.as_str().unwrap_or_default()) {
                    Some(is_value) => is_value,
                    // Custom scalars and input objects are passed through
                    None => true,
                },
            };
            if valid {
                Ok(value)
            } else {
                Err(format!("expected {ty}, found {value}"))
            }
        }
    }
}
