use std::collections::HashMap;

use apollo_parser::cst;

use crate::spec::selection::name_text;
use crate::spec::selection::selection_set_from_cst;
use crate::spec::selection::Lowering;
use crate::spec::selection::type_condition_name;
use crate::spec::IncludeSkip;
use crate::spec::Selection;
use crate::spec::SpecError;

#[derive(Debug, Default)]
pub(crate) struct Fragments {
    map: HashMap<String, Fragment>,
}

impl Fragments {
    pub(crate) fn from_cst(
        document: &cst::Document,
        lowering: &Lowering,
    ) -> Result<Self, SpecError> {
        let map = document
            .definitions()
            .filter_map(|definition| match definition {
                // Spec: https://spec.graphql.org/draft/#FragmentDefinition
                cst::Definition::FragmentDefinition(fragment_definition) => {
                    Some(fragment_definition)
                }
                _ => None,
            })
            .map(|fragment_definition| {
                let name = fragment_definition
                    .fragment_name()
                    .ok_or_else(|| SpecError::ParsingError("missing fragment name".to_string()))
                    .and_then(|name| name_text(name.name()))?;

                let type_condition = fragment_definition
                    .type_condition()
                    .ok_or_else(|| {
                        SpecError::ParsingError(format!(
                            "fragment {name} must specify the type it applies to"
                        ))
                    })
                    .and_then(type_condition_name)?;

                let selection_set = fragment_definition
                    .selection_set()
                    .map(|selection_set| selection_set_from_cst(selection_set, lowering, 1))
                    .transpose()?
                    .unwrap_or_default();

                let include_skip = IncludeSkip::parse(fragment_definition.directives());

                Ok((
                    name,
                    Fragment {
                        type_condition,
                        selection_set,
                        include_skip,
                    },
                ))
            })
            .collect::<Result<HashMap<_, _>, SpecError>>()?;
        Ok(Fragments { map })
    }

    pub(crate) fn get(&self, key: impl AsRef<str>) -> Option<&Fragment> {
        self.map.get(key.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub(crate) type_condition: String,
    pub(crate) selection_set: Vec<Selection>,
    pub(crate) include_skip: IncludeSkip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_definitions() {
        let query = r#"
            { pets { ...PetFields } }
            fragment PetFields on Pet { __typename ... on Dog { barks } }
            fragment Hidden on Named @skip(if: true) { name }
        "#;
        let tree = apollo_parser::Parser::new(query).parse();
        let fragments = Fragments::from_cst(&tree.document(), &Lowering::new(query, 8)).unwrap();

        let pet_fields = fragments.get("PetFields").unwrap();
        assert_eq!(pet_fields.type_condition, "Pet");
        assert_eq!(pet_fields.selection_set.len(), 2);
        assert!(!pet_fields.include_skip.statically_skipped());

        let hidden = fragments.get("Hidden").unwrap();
        assert_eq!(hidden.type_condition, "Named");
        assert!(hidden.include_skip.statically_skipped());

        assert!(fragments.get("Missing").is_none());
    }
}
