//! Logic for loading configuration in to an object model

use std::str::FromStr;

use displaydoc::Display;
use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),
}

/// The configuration of an [`Executor`](crate::Executor).
///
/// Can be created through `serde::Deserialize` from various formats,
/// parsed from YAML with [`FromStr`], or built inline with [`Configuration::builder`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Limits and error reporting of the execution engine.
    #[serde(default)]
    pub execution: Execution,

    /// Limits applied when parsing query documents.
    #[serde(default)]
    pub parser: Parser,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(execution: Option<Execution>, parser: Option<Parser>) -> Self {
        Self {
            execution: execution.unwrap_or_default(),
            parser: parser.unwrap_or_default(),
        }
    }

    /// Checks values that deserialize correctly but cannot be used.
    pub fn validate(self) -> Result<Self, ConfigurationError> {
        if self.execution.max_depth == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid execution configuration",
                error: "max_depth must be greater than 0".to_string(),
            });
        }
        if self.parser.recursion_limit == 0
            || self.parser.token_limit == 0
            || self.parser.max_selection_depth == 0
        {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid parser configuration",
                error: "recursion_limit, token_limit and max_selection_depth must be greater than 0"
                    .to_string(),
            });
        }
        Ok(self)
    }
}

/// Parse configuration from a string in YAML syntax
impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str::<Configuration>(s)
            .map_err(ConfigurationError::DeserializeConfigError)?
            .validate()
    }
}

/// Execution engine configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Execution {
    /// Maximum nesting of selection sets during execution.
    /// Fields deeper than this resolve to `null` with an error.
    pub max_depth: usize,

    /// Include the underlying reason of a field error in its `extensions.cause`.
    pub error_cause: bool,
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            max_depth: 128,
            error_cause: true,
        }
    }
}

/// Query document parser configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Parser {
    /// Maximum recursion depth of the parser.
    pub recursion_limit: usize,

    /// Maximum number of tokens in a query document.
    pub token_limit: usize,

    /// Maximum nesting of selection sets in an operation or fragment.
    /// Deeper documents are rejected with a parsing error.
    pub max_selection_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            recursion_limit: 4096,
            token_limit: 15_000,
            max_selection_depth: 128,
        }
    }
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings.into_generator().into_root_schema_for::<Configuration>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let configuration = Configuration::default();
        assert_eq!(configuration.execution.max_depth, 128);
        assert!(configuration.execution.error_cause);
        assert_eq!(configuration.parser.recursion_limit, 4096);
        assert_eq!(configuration.parser.token_limit, 15_000);
        assert_eq!(configuration.parser.max_selection_depth, 128);
        assert_eq!(Configuration::builder().build(), configuration);
    }

    #[test]
    fn from_yaml() {
        let configuration: Configuration = r#"
execution:
  max_depth: 8
  error_cause: false
parser:
  token_limit: 100
  max_selection_depth: 16
"#
        .parse()
        .unwrap();
        assert_eq!(configuration.execution.max_depth, 8);
        assert!(!configuration.execution.error_cause);
        assert_eq!(configuration.parser.recursion_limit, 4096);
        assert_eq!(configuration.parser.token_limit, 100);
        assert_eq!(configuration.parser.max_selection_depth, 16);
    }

    #[test]
    fn empty_yaml_is_default() {
        let configuration: Configuration = "{}".parse().unwrap();
        assert_eq!(configuration, Configuration::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = "execution:\n  max_dept: 3\n"
            .parse::<Configuration>()
            .unwrap_err();
        assert!(matches!(error, ConfigurationError::DeserializeConfigError(_)));
        assert!(error.to_string().contains("max_dept"));
    }

    #[test]
    fn zero_depth_is_invalid() {
        let error = "execution:\n  max_depth: 0\n"
            .parse::<Configuration>()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid execution configuration: max_depth must be greater than 0"
        );

        let error = "parser:\n  max_selection_depth: 0\n"
            .parse::<Configuration>()
            .unwrap_err();
        assert!(matches!(
            error,
            ConfigurationError::InvalidConfiguration {
                message: "invalid parser configuration",
                ..
            }
        ));
    }

    #[test]
    fn config_schema() {
        let schema = serde_json::to_value(generate_config_schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties["execution"].is_object());
        assert!(properties["parser"].is_object());
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
    }
}
