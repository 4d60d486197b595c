use std::sync::Arc;

use displaydoc::Display;
use serde_json_bytes::Value as JsonValue;
use thiserror::Error;

use crate::json_ext::Object;

/// A GraphQL object whose fields can be resolved during execution
pub type ObjectValue<'a> = dyn Resolver + 'a;

/// Abstraction for implementing field resolvers. Used through [`ObjectValue`].
///
/// Use the [`impl_resolver!`][crate::impl_resolver] macro to implement this trait
/// with reduced boilerplate
pub trait Resolver {
    /// Returns the name of the concrete object type this resolver represents
    ///
    /// That name expected to be that of an object type defined in the schema.
    /// This is called when the schema indicates an abstract (interface or union) type.
    fn type_name(&self) -> &str;

    /// Resolves a field of this object with the given arguments
    ///
    /// The resolved is expected to match the type of the corresponding field definition
    /// in the schema. Only called for fields the schema defines on [`Resolver::type_name`].
    fn resolve_field<'a>(
        &'a self,
        field_name: &'a str,
        arguments: &'a Object,
    ) -> Result<ResolvedValue<'a>, ResolverError>;
}

impl<T: Resolver + ?Sized> Resolver for &T {
    fn type_name(&self) -> &str {
        (**self).type_name()
    }

    fn resolve_field<'a>(
        &'a self,
        field_name: &'a str,
        arguments: &'a Object,
    ) -> Result<ResolvedValue<'a>, ResolverError> {
        (**self).resolve_field(field_name, arguments)
    }
}

impl<T: Resolver + ?Sized> Resolver for Box<T> {
    fn type_name(&self) -> &str {
        (**self).type_name()
    }

    fn resolve_field<'a>(
        &'a self,
        field_name: &'a str,
        arguments: &'a Object,
    ) -> Result<ResolvedValue<'a>, ResolverError> {
        (**self).resolve_field(field_name, arguments)
    }
}

impl<T: Resolver + ?Sized> Resolver for Arc<T> {
    fn type_name(&self) -> &str {
        (**self).type_name()
    }

    fn resolve_field<'a>(
        &'a self,
        field_name: &'a str,
        arguments: &'a Object,
    ) -> Result<ResolvedValue<'a>, ResolverError> {
        (**self).resolve_field(field_name, arguments)
    }
}

// An error returned by a resolver: the field resolves to `null` with a field error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Display)]
/// {message}
pub struct ResolverError {
    pub message: String,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Implements the [`Resolver`] trait with reduced boilerplate
///
/// Define:
///
/// * The implementing Rust type
/// * The __typename string
/// * One pseudo-method per field. Types are omitted in the signature for brevity.
///   - Takes two optional arguments: `&self` (which must be spelled something else because macros)
///     and `args: `[`&Object`][crate::json_ext::Object] for the field arguments.
///     Field arguments are coerced according to their definition in the schema.
///   - Returns `Result<ResolvedValue, ResolverError>`, `Err` it turned into a field error
#[macro_export]
macro_rules! impl_resolver {
    (
        for $ty: ty:
        __typename = $type_name: expr;
        $(
            fn $field_name: ident(
                $( &$self_: ident $(, $( $args: ident $(,)? )? )? )?
            ) $block: block
        )*

    ) => {
        impl $crate::Resolver for $ty {
            fn type_name(&self) -> &str {
                $type_name
            }

            fn resolve_field<'a>(
                &'a self,
                field_name: &'a str,
                arguments: &'a $crate::json_ext::Object,
            ) -> Result<$crate::ResolvedValue<'a>, $crate::ResolverError> {
                let _allow_unused = arguments;
                match field_name {
                    $(
                        stringify!($field_name) => {
                            $(
                                let $self_ = self;
                                $($(
                                    let $args = arguments;
                                )?)?
                            )?
                            return $block
                        },
                    )*
                    _ => Err($crate::ResolverError {
                        message: format!(
                            "unexpected field name: {field_name} in type {}",
                            $crate::Resolver::type_name(self)
                        )
                    }),
                }
            }
        }
    };
}

/// The value of a resolved field
pub enum ResolvedValue<'a> {
    /// * JSON null represents GraphQL null
    /// * A GraphQL enum value is represented as a JSON string
    /// * GraphQL built-in scalars are coerced according to their respective *Result Coercion* spec
    /// * For custom scalars, any JSON value is passed through as-is (including array or object)
    Leaf(JsonValue),

    /// Expected where the GraphQL type is an object, interface, or union type
    Object(Box<ObjectValue<'a>>),

    /// Expected for GraphQL list types.
    /// An `Err` item is a field error for that item.
    List(Box<dyn Iterator<Item = Result<ResolvedValue<'a>, ResolverError>> + 'a>),
}

impl<'a> ResolvedValue<'a> {
    /// Construct a null leaf resolved value
    pub fn null() -> Self {
        Self::Leaf(JsonValue::Null)
    }

    /// Construct a leaf resolved value from something that is convertible to JSON
    pub fn leaf(json: impl Into<JsonValue>) -> Self {
        Self::Leaf(json.into())
    }

    /// Construct an object resolved value from the resolver for that object
    pub fn object(resolver: impl Resolver + 'a) -> Self {
        Self::Object(Box::new(resolver))
    }

    /// Construct an object resolved value or null, from an optional resolver
    pub fn opt_object(opt_resolver: Option<impl Resolver + 'a>) -> Self {
        match opt_resolver {
            Some(resolver) => Self::Object(Box::new(resolver)),
            None => Self::null(),
        }
    }

    /// Construct a list resolved value from an iterator
    pub fn list<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Self>,
        I::IntoIter: 'a,
    {
        Self::List(Box::new(iter.into_iter().map(Ok)))
    }

    /// Construct a list resolved value from an iterator of results
    pub fn try_list<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Result<Self, ResolverError>>,
        I::IntoIter: 'a,
    {
        Self::List(Box::new(iter.into_iter()))
    }
}

impl std::fmt::Debug for ResolvedValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedValue::Leaf(value) => f.debug_tuple("Leaf").field(value).finish(),
            ResolvedValue::Object(object) => {
                f.debug_tuple("Object").field(&object.type_name()).finish()
            }
            ResolvedValue::List(_) => f.write_str("List(..)"),
        }
    }
}
