use apollo_compiler::ast;
use serde::Deserialize;
use serde::Serialize;

/// The type of a field or argument, as written in SDL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Named type {0}
    Named(String),
    /// List type {0}
    List(Box<FieldType>),
    /// Non null type {0}
    NonNull(Box<FieldType>),
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Named(ty) => write!(f, "{ty}"),
            FieldType::List(ty) => write!(f, "[{ty}]"),
            FieldType::NonNull(ty) => write!(f, "{ty}!"),
        }
    }
}

impl FieldType {
    pub fn is_non_null(&self) -> bool {
        matches!(self, FieldType::NonNull(_))
    }

    /// The type without its outermost non-null wrapper.
    pub fn nullable(&self) -> &FieldType {
        match self {
            FieldType::NonNull(inner) => inner,
            ty => ty,
        }
    }

    /// The name of the named type at the core of list and non-null wrappers.
    pub fn inner_type_name(&self) -> &str {
        match self {
            FieldType::Named(name) => name,
            FieldType::List(inner) | FieldType::NonNull(inner) => inner.inner_type_name(),
        }
    }
}

impl From<&ast::Type> for FieldType {
    fn from(ty: &ast::Type) -> Self {
        match ty {
            ast::Type::Named(name) => FieldType::Named(name.to_string()),
            ast::Type::NonNullNamed(name) => {
                FieldType::NonNull(Box::new(FieldType::Named(name.to_string())))
            }
            ast::Type::List(inner) => FieldType::List(Box::new(inner.as_ref().into())),
            ast::Type::NonNullList(inner) => FieldType::NonNull(Box::new(FieldType::List(
                Box::new(inner.as_ref().into()),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ast_type() {
        let ty = ast::Type::Named(apollo_compiler::name!("Pet"))
            .list()
            .non_null();
        let field_type = FieldType::from(&ty);
        assert_eq!(
            field_type,
            FieldType::NonNull(Box::new(FieldType::List(Box::new(FieldType::Named(
                "Pet".to_string()
            )))))
        );
        assert_eq!(field_type.to_string(), "[Pet]!");
        assert!(field_type.is_non_null());
        assert_eq!(field_type.inner_type_name(), "Pet");
        assert_eq!(field_type.nullable().to_string(), "[Pet]");

        let ty = ast::Type::Named(apollo_compiler::name!("String")).non_null();
        assert_eq!(FieldType::from(&ty).to_string(), "String!");
    }
}
