//! GraphQL schema.

use std::collections::HashMap;
use std::collections::HashSet;

use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use indexmap::IndexMap;
use serde_json_bytes::ByteString;

use crate::error::SchemaError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::FieldType;
use crate::spec::OperationKind;

/// The kind of a composite type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    Interface,
    Union,
}

/// An argument of a field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub ty: FieldType,
    /// Value used when the argument is omitted.
    pub default_value: Option<Value>,
}

/// A field of an object or interface type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: FieldType,
    pub arguments: Vec<ArgumentDefinition>,
}

/// A composite (object, interface or union) type of the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    /// Always empty for unions.
    pub fields: IndexMap<String, FieldDefinition>,
    /// Interfaces implemented by an object or interface type.
    pub interfaces: Vec<String>,
    /// Members of a union type.
    pub members: Vec<String>,
}

impl TypeDescriptor {
    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Interface | TypeKind::Union)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|name| name == interface)
    }
}

/// A GraphQL schema.
///
/// Built from SDL and validated with `apollo-compiler`, then flattened into the
/// descriptors the execution engine dispatches on.
#[derive(Debug)]
pub struct Schema {
    definitions: Valid<apollo_compiler::Schema>,
    types: IndexMap<String, TypeDescriptor>,
    enums: HashMap<String, HashSet<String>>,
    custom_scalars: HashSet<String>,
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl Schema {
    pub fn parse(sdl: &str) -> Result<Self, SchemaError> {
        let definitions = apollo_compiler::Schema::parse_and_validate(sdl, "schema.graphql")
            .map_err(|invalid| SchemaError::Validate(invalid.errors.to_string()))?;

        let root_name = |kind: ast::OperationType| {
            definitions
                .root_operation(kind)
                .map(|name| name.as_str().to_string())
        };
        let query_type = root_name(ast::OperationType::Query).ok_or(SchemaError::MissingQueryType)?;
        let mutation_type = root_name(ast::OperationType::Mutation);
        let subscription_type = root_name(ast::OperationType::Subscription);

        let mut types = IndexMap::new();
        let mut enums = HashMap::new();
        let mut custom_scalars = HashSet::new();
        for (name, ty) in &definitions.types {
            if ty.is_built_in() {
                continue;
            }
            let name = name.as_str().to_string();
            let descriptor = match ty {
                ExtendedType::Object(object) => TypeDescriptor {
                    name: name.clone(),
                    kind: TypeKind::Object,
                    fields: field_definitions(object.fields.values().map(|field| &*field.node)),
                    interfaces: object
                        .implements_interfaces
                        .iter()
                        .map(|interface| interface.name.to_string())
                        .collect(),
                    members: Vec::new(),
                },
                ExtendedType::Interface(interface) => TypeDescriptor {
                    name: name.clone(),
                    kind: TypeKind::Interface,
                    fields: field_definitions(interface.fields.values().map(|field| &*field.node)),
                    interfaces: interface
                        .implements_interfaces
                        .iter()
                        .map(|interface| interface.name.to_string())
                        .collect(),
                    members: Vec::new(),
                },
                ExtendedType::Union(union) => TypeDescriptor {
                    name: name.clone(),
                    kind: TypeKind::Union,
                    fields: IndexMap::new(),
                    interfaces: Vec::new(),
                    members: union
                        .members
                        .iter()
                        .map(|member| member.name.to_string())
                        .collect(),
                },
                ExtendedType::Enum(enum_type) => {
                    enums.insert(
                        name,
                        enum_type
                            .values
                            .keys()
                            .map(|value| value.to_string())
                            .collect(),
                    );
                    continue;
                }
                ExtendedType::Scalar(_) => {
                    custom_scalars.insert(name);
                    continue;
                }
                ExtendedType::InputObject(_) => continue,
            };
            types.insert(name, descriptor);
        }

        tracing::debug!(types = types.len(), "schema parsed");

        Ok(Self {
            definitions,
            types,
            enums,
            custom_scalars,
            query_type,
            mutation_type,
            subscription_type,
        })
    }

    /// The validated `apollo-compiler` schema this registry was built from.
    pub fn definitions(&self) -> &Valid<apollo_compiler::Schema> {
        &self.definitions
    }

    /// Returns the composite type with the given name.
    pub fn lookup_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// Returns the object type with the given name.
    pub fn object_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.lookup_type(name)
            .filter(|ty| ty.kind == TypeKind::Object)
    }

    /// Object types that a value of `abstract_type` can be at runtime.
    ///
    /// Union members are listed in declaration order, interface implementers in
    /// type definition order. An object type is its only possible type.
    pub fn possible_types(&self, abstract_type: &str) -> Vec<&TypeDescriptor> {
        let Some(ty) = self.lookup_type(abstract_type) else {
            return Vec::new();
        };
        match ty.kind {
            TypeKind::Object => vec![ty],
            TypeKind::Union => ty
                .members
                .iter()
                .filter_map(|member| self.object_type(member))
                .collect(),
            TypeKind::Interface => self
                .types
                .values()
                .filter(|candidate| {
                    candidate.kind == TypeKind::Object && candidate.implements(abstract_type)
                })
                .collect(),
        }
    }

    /// Returns `true` if `maybe_subtype` is a member of the union `abstract_type`,
    /// or implements the interface `abstract_type`.
    pub fn is_subtype(&self, abstract_type: &str, maybe_subtype: &str) -> bool {
        let (Some(abstract_ty), Some(candidate)) = (
            self.lookup_type(abstract_type),
            self.lookup_type(maybe_subtype),
        ) else {
            return false;
        };
        match abstract_ty.kind {
            TypeKind::Object => false,
            TypeKind::Union => abstract_ty.members.iter().any(|member| member == maybe_subtype),
            TypeKind::Interface => candidate.implements(abstract_type),
        }
    }

    /// Returns `true` if a value of type `object_type` may appear where `declared` is expected.
    pub fn is_possible_type(&self, declared: &TypeDescriptor, object_type: &str) -> bool {
        match declared.kind {
            TypeKind::Object => declared.name == object_type,
            TypeKind::Interface | TypeKind::Union => {
                self.object_type(object_type).is_some() && self.is_subtype(&declared.name, object_type)
            }
        }
    }

    /// The object type at the root of operations of the given kind, if the schema defines one.
    pub fn root_operation_type(&self, kind: OperationKind) -> Option<&TypeDescriptor> {
        let name = match kind {
            OperationKind::Query => Some(&self.query_type),
            OperationKind::Mutation => self.mutation_type.as_ref(),
            OperationKind::Subscription => self.subscription_type.as_ref(),
        }?;
        self.object_type(name)
    }

    pub(crate) fn is_enum_value(&self, enum_name: &str, value: &str) -> Option<bool> {
        self.enums
            .get(enum_name)
            .map(|values| values.contains(value))
    }

    pub(crate) fn is_custom_scalar(&self, name: &str) -> bool {
        self.custom_scalars.contains(name)
    }
}

fn field_definitions<'a>(
    fields: impl Iterator<Item = &'a ast::FieldDefinition>,
) -> IndexMap<String, FieldDefinition> {
    fields
        .map(|field| {
            let definition = FieldDefinition {
                name: field.name.to_string(),
                ty: FieldType::from(&field.ty),
                arguments: field
                    .arguments
                    .iter()
                    .map(|argument| ArgumentDefinition {
                        name: argument.name.to_string(),
                        ty: FieldType::from(&*argument.ty),
                        default_value: argument
                            .default_value
                            .as_ref()
                            .map(|value| value_from_ast(value)),
                    })
                    .collect(),
            };
            (definition.name.clone(), definition)
        })
        .collect()
}

/// Converts a constant SDL value to JSON. Enum values become strings.
pub(crate) fn value_from_ast(value: &ast::Value) -> Value {
    match value {
        ast::Value::Null | ast::Value::Variable(_) => Value::Null,
        ast::Value::Enum(name) => Value::String(ByteString::from(name.as_str())),
        ast::Value::String(string) => Value::String(ByteString::from(string.as_str())),
        ast::Value::Boolean(boolean) => Value::Bool(*boolean),
        ast::Value::Int(int) => match int.try_to_i32() {
            Ok(int) => Value::from(int),
            Err(_) => Value::Null,
        },
        ast::Value::Float(float) => match float.try_to_f64() {
            Ok(float) => Value::from(float),
            Err(_) => Value::Null,
        },
        ast::Value::List(list) => Value::Array(list.iter().map(|item| value_from_ast(item)).collect()),
        ast::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| (ByteString::from(name.as_str()), value_from_ast(value)))
                .collect::<Object>(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETS: &str = r#"
        schema { query: Person }

        interface Named { name: String }

        type Dog implements Named { name: String barks: Boolean }
        type Cat implements Named { name: String meows: Boolean }
        union Pet = Dog | Cat

        type Person implements Named {
          name: String
          pets(first: Int = 10): [Pet]
          friends: [Named]
        }
    "#;

    fn names<'a>(types: impl IntoIterator<Item = &'a TypeDescriptor>) -> Vec<&'a str> {
        types.into_iter().map(|ty| ty.name.as_str()).collect()
    }

    #[test]
    fn possible_types_follow_definition_order() {
        let schema = Schema::parse(PETS).unwrap();
        assert_eq!(names(schema.possible_types("Named")), ["Dog", "Cat", "Person"]);
        assert_eq!(names(schema.possible_types("Pet")), ["Dog", "Cat"]);
        assert_eq!(names(schema.possible_types("Dog")), ["Dog"]);
        assert!(schema.possible_types("Unknown").is_empty());
    }

    #[test]
    fn descriptors() {
        let schema = Schema::parse(PETS).unwrap();

        let pet = schema.lookup_type("Pet").unwrap();
        assert_eq!(pet.kind, TypeKind::Union);
        assert!(pet.is_abstract());
        assert!(pet.fields.is_empty());
        assert_eq!(pet.members, ["Dog", "Cat"]);

        let named = schema.lookup_type("Named").unwrap();
        assert_eq!(named.kind, TypeKind::Interface);
        assert_eq!(named.fields.keys().collect::<Vec<_>>(), ["name"]);

        let person = schema.object_type("Person").unwrap();
        assert_eq!(person.interfaces, ["Named"]);
        let pets = person.field("pets").unwrap();
        assert_eq!(pets.ty.to_string(), "[Pet]");
        assert_eq!(pets.arguments[0].name, "first");
        assert_eq!(pets.arguments[0].default_value, Some(Value::from(10)));
        assert!(person.field("barks").is_none());

        assert!(schema.object_type("Named").is_none());
        assert_eq!(
            schema.root_operation_type(OperationKind::Query).map(|ty| ty.name.as_str()),
            Some("Person")
        );
        assert!(schema.root_operation_type(OperationKind::Mutation).is_none());
    }

    #[test]
    fn is_subtype() {
        let schema = Schema::parse(PETS).unwrap();
        assert!(schema.is_subtype("Pet", "Dog"));
        assert!(schema.is_subtype("Pet", "Cat"));
        assert!(!schema.is_subtype("Pet", "Person"));
        assert!(schema.is_subtype("Named", "Person"));
        assert!(schema.is_subtype("Named", "Dog"));
        assert!(!schema.is_subtype("Dog", "Dog"));
        assert!(!schema.is_subtype("Named", "Unknown"));

        let pet = schema.lookup_type("Pet").unwrap();
        assert!(schema.is_possible_type(pet, "Cat"));
        assert!(!schema.is_possible_type(pet, "Named"));
    }

    #[test]
    fn enums_and_custom_scalars() {
        let schema = Schema::parse(
            r#"
            type Query { size: Size when: Date }
            enum Size { SMALL LARGE }
            scalar Date
            "#,
        )
        .unwrap();
        assert_eq!(schema.is_enum_value("Size", "SMALL"), Some(true));
        assert_eq!(schema.is_enum_value("Size", "HUGE"), Some(false));
        assert_eq!(schema.is_enum_value("Date", "SMALL"), None);
        assert!(schema.is_custom_scalar("Date"));
        assert!(!schema.is_custom_scalar("String"));
    }

    #[test]
    fn invalid_schema() {
        let error = Schema::parse("type Query { pet: Pet }").unwrap_err();
        assert!(matches!(error, SchemaError::Validate(_)));
    }
}
