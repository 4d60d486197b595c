use apollo_parser::cst;
use apollo_parser::cst::CstNode;
use serde_json_bytes::ByteString;

use crate::graphql::LineIndex;
use crate::graphql::Location;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::SpecError;
use crate::spec::TYPENAME;

/// A selection, lowered from the query document without consulting the schema:
/// fields the schema does not define on the runtime type are kept and reported
/// during execution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Selection {
    Field(Field),
    InlineFragment {
        /// No type condition means the fragment applies to the enclosing type.
        type_condition: Option<String>,
        include_skip: IncludeSkip,
        selection_set: Vec<Selection>,
    },
    FragmentSpread {
        name: String,
        include_skip: IncludeSkip,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Field {
    pub(crate) name: String,
    pub(crate) alias: Option<String>,
    pub(crate) arguments: Vec<(String, InputValue)>,
    pub(crate) selection_set: Option<Vec<Selection>>,
    pub(crate) include_skip: IncludeSkip,
    pub(crate) location: Location,
}

impl Field {
    /// The key of this field in the response object.
    pub(crate) fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn is_typename(&self) -> bool {
        self.name == TYPENAME
    }
}

/// An argument value as written in the query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InputValue {
    Variable(String),
    /// Scalars, enum values (as strings) and `null`.
    Constant(Value),
    List(Vec<InputValue>),
    Object(Vec<(String, InputValue)>),
}

/// Document-wide state for lowering selection sets.
pub(crate) struct Lowering {
    line_index: LineIndex,
    /// Maximum nesting of selection sets, counting the outermost one as 1.
    max_depth: usize,
}

impl Lowering {
    pub(crate) fn new(source: &str, max_depth: usize) -> Self {
        Self {
            line_index: LineIndex::new(source),
            max_depth,
        }
    }
}

impl Selection {
    pub(crate) fn from_cst(
        selection: cst::Selection,
        lowering: &Lowering,
        depth: usize,
    ) -> Result<Option<Self>, SpecError> {
        Ok(match selection {
            // Spec: https://spec.graphql.org/draft/#Field
            cst::Selection::Field(field) => {
                let include_skip = IncludeSkip::parse(field.directives());
                if include_skip.statically_skipped() {
                    return Ok(None);
                }
                let location = lowering
                    .line_index
                    .location(usize::from(field.syntax().text_range().start()));
                let name = name_text(field.name())?;
                let alias = field
                    .alias()
                    .map(|alias| name_text(alias.name()))
                    .transpose()?;

                let arguments = field
                    .arguments()
                    .into_iter()
                    .flat_map(|arguments| arguments.arguments())
                    .map(|argument| {
                        let value = argument.value().ok_or_else(|| {
                            SpecError::ParsingError("argument without a value".to_string())
                        })?;
                        Ok((name_text(argument.name())?, InputValue::from_cst(value)?))
                    })
                    .collect::<Result<Vec<_>, SpecError>>()?;

                let selection_set = field
                    .selection_set()
                    .map(|selection_set| {
                        selection_set_from_cst(selection_set, lowering, depth + 1)
                    })
                    .transpose()?;

                Some(Self::Field(Field {
                    name,
                    alias,
                    arguments,
                    selection_set,
                    include_skip,
                    location,
                }))
            }
            // Spec: https://spec.graphql.org/draft/#InlineFragment
            cst::Selection::InlineFragment(inline_fragment) => {
                let include_skip = IncludeSkip::parse(inline_fragment.directives());
                if include_skip.statically_skipped() {
                    return Ok(None);
                }
                let type_condition = inline_fragment
                    .type_condition()
                    .map(type_condition_name)
                    .transpose()?;
                let selection_set = inline_fragment
                    .selection_set()
                    .map(|selection_set| {
                        selection_set_from_cst(selection_set, lowering, depth + 1)
                    })
                    .transpose()?
                    .unwrap_or_default();

                Some(Self::InlineFragment {
                    type_condition,
                    include_skip,
                    selection_set,
                })
            }
            // Spec: https://spec.graphql.org/draft/#FragmentSpread
            cst::Selection::FragmentSpread(fragment_spread) => {
                let include_skip = IncludeSkip::parse(fragment_spread.directives());
                if include_skip.statically_skipped() {
                    return Ok(None);
                }
                let name = fragment_spread
                    .fragment_name()
                    .ok_or_else(|| SpecError::ParsingError("missing fragment name".to_string()))
                    .and_then(|name| name_text(name.name()))?;

                Some(Self::FragmentSpread { name, include_skip })
            }
        })
    }
}

/// Lowers a selection set found `depth` selection sets deep.
pub(crate) fn selection_set_from_cst(
    selection_set: cst::SelectionSet,
    lowering: &Lowering,
    depth: usize,
) -> Result<Vec<Selection>, SpecError> {
    if depth > lowering.max_depth {
        return Err(SpecError::ParsingError(format!(
            "selection sets are nested deeper than the limit of {}",
            lowering.max_depth
        )));
    }
    Ok(selection_set
        .selections()
        .map(|selection| Selection::from_cst(selection, lowering, depth))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect())
}

pub(crate) fn name_text(name: Option<cst::Name>) -> Result<String, SpecError> {
    name.map(|name| name.text().to_string())
        .ok_or_else(|| SpecError::ParsingError("missing name".to_string()))
}

pub(crate) fn type_condition_name(condition: cst::TypeCondition) -> Result<String, SpecError> {
    condition
        .named_type()
        .ok_or_else(|| SpecError::ParsingError("missing type condition".to_string()))
        .and_then(|named_type| name_text(named_type.name()))
}

impl InputValue {
    /// The value with variables replaced by `null`, as used for default values.
    pub(crate) fn to_constant(&self) -> Value {
        match self {
            InputValue::Variable(_) => Value::Null,
            InputValue::Constant(value) => value.clone(),
            InputValue::List(items) => Value::Array(items.iter().map(Self::to_constant).collect()),
            InputValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (ByteString::from(name.as_str()), value.to_constant()))
                    .collect(),
            ),
        }
    }

    pub(crate) fn from_cst(value: cst::Value) -> Result<Self, SpecError> {
        Ok(match value {
            cst::Value::Variable(variable) => InputValue::Variable(name_text(variable.name())?),
            cst::Value::StringValue(string) => {
                InputValue::Constant(Value::String(String::from(string).into()))
            }
            cst::Value::FloatValue(float) => {
                let text = float
                    .float_token()
                    .map(|token| token.text().to_string())
                    .unwrap_or_default();
                let float = text.parse::<f64>().map_err(|_| {
                    SpecError::ParsingError(format!("invalid float value {text}"))
                })?;
                InputValue::Constant(Value::from(float))
            }
            cst::Value::IntValue(int) => {
                let text = int
                    .int_token()
                    .map(|token| token.text().to_string())
                    .unwrap_or_default();
                let int = text.parse::<i64>().map_err(|_| {
                    SpecError::ParsingError(format!("invalid int value {text}"))
                })?;
                InputValue::Constant(Value::from(int))
            }
            cst::Value::BooleanValue(boolean) => {
                InputValue::Constant(Value::Bool(boolean.true_token().is_some()))
            }
            cst::Value::NullValue(_) => InputValue::Constant(Value::Null),
            cst::Value::EnumValue(enum_value) => InputValue::Constant(Value::String(
                ByteString::from(name_text(enum_value.name())?),
            )),
            cst::Value::ListValue(list) => InputValue::List(
                list.values()
                    .map(InputValue::from_cst)
                    .collect::<Result<_, _>>()?,
            ),
            cst::Value::ObjectValue(object) => InputValue::Object(
                object
                    .object_fields()
                    .map(|field| {
                        let value = field.value().ok_or_else(|| {
                            SpecError::ParsingError("object field without a value".to_string())
                        })?;
                        Ok((name_text(field.name())?, InputValue::from_cst(value)?))
                    })
                    .collect::<Result<_, SpecError>>()?,
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct IncludeSkip {
    include: Condition,
    skip: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Condition {
    Yes,
    No,
    Variable(String),
}

impl IncludeSkip {
    pub(crate) fn parse(directives: Option<cst::Directives>) -> Self {
        let mut include = None;
        let mut skip = None;
        for directive in directives.iter().flat_map(|directives| directives.directives()) {
            let Ok(name) = name_text(directive.name()) else {
                continue;
            };
            if include.is_none() && name == "include" {
                include = Condition::parse(&directive)
            }
            if skip.is_none() && name == "skip" {
                skip = Condition::parse(&directive)
            }
        }
        Self {
            include: include.unwrap_or(Condition::Yes),
            skip: skip.unwrap_or(Condition::No),
        }
    }

    pub(crate) fn statically_skipped(&self) -> bool {
        matches!(self.skip, Condition::Yes) || matches!(self.include, Condition::No)
    }

    pub(crate) fn should_skip(&self, variables: &Object) -> bool {
        // Variables are not validated: a missing or non-boolean variable leaves
        // the selection included.
        self.skip.eval(variables).unwrap_or(false) || !self.include.eval(variables).unwrap_or(true)
    }
}

impl Condition {
    pub(crate) fn parse(directive: &cst::Directive) -> Option<Self> {
        let value = directive
            .arguments()?
            .arguments()
            .find(|argument| name_text(argument.name()).is_ok_and(|name| name == "if"))?
            .value()?;
        match value {
            cst::Value::BooleanValue(boolean) if boolean.true_token().is_some() => {
                Some(Condition::Yes)
            }
            cst::Value::BooleanValue(_) => Some(Condition::No),
            cst::Value::Variable(variable) => name_text(variable.name()).ok().map(Condition::Variable),
            _ => None,
        }
    }

    pub(crate) fn eval(&self, variables: &Object) -> Option<bool> {
        match self {
            Condition::Yes => Some(true),
            Condition::No => Some(false),
            Condition::Variable(variable_name) => variables
                .get(variable_name.as_str())
                .and_then(|v| v.as_bool()),
        }
    }
}
