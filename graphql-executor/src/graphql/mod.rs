//! Types related to GraphQL requests, responses, etc.

mod request;
mod response;

pub use request::Request;
pub use response::Response;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::json_ext::Object;
use crate::json_ext::Path;
pub use crate::json_ext::Path as JsonPath;
pub use crate::json_ext::PathElement as JsonPathElement;

/// Extension key holding the underlying reason of a field error.
pub(crate) const CAUSE_EXTENSION: &str = "cause";

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
/// The error location
pub struct Location {
    /// The line number
    pub line: u32,
    /// The column number
    pub column: u32,
}

/// Line starts of a document, for converting byte offsets to [`Location`]s.
///
/// Built once per document; each lookup is a binary search.
#[derive(Debug, Default)]
pub(crate) struct LineIndex {
    line_starts: Vec<usize>,
    /// Byte offset of every non-ASCII character, with the number of continuation
    /// bytes seen up to and including it.
    wide_chars: Vec<(usize, usize)>,
}

impl LineIndex {
    pub(crate) fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        let mut wide_chars = Vec::new();
        let mut continuation_bytes = 0;
        for (index, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(index + 1);
            } else if !c.is_ascii() {
                continuation_bytes += c.len_utf8() - 1;
                wide_chars.push((index, continuation_bytes));
            }
        }
        Self {
            line_starts,
            wide_chars,
        }
    }

    /// The 1-based line and column (in characters) of a byte offset.
    pub(crate) fn location(&self, offset: usize) -> Location {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self
            .line_starts
            .get(line.saturating_sub(1))
            .copied()
            .unwrap_or_default();
        let continuation_bytes =
            self.continuation_bytes_before(offset) - self.continuation_bytes_before(line_start);
        let column = offset.saturating_sub(line_start) - continuation_bytes;
        Location {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column: u32::try_from(column + 1).unwrap_or(u32::MAX),
        }
    }

    fn continuation_bytes_before(&self, offset: usize) -> usize {
        let count = self.wide_chars.partition_point(|&(index, _)| index < offset);
        count
            .checked_sub(1)
            .and_then(|last| self.wide_chars.get(last))
            .map_or(0, |&(_, continuation_bytes)| continuation_bytes)
    }
}

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as may be found in the `errors` field of a GraphQL [`Response`].
///
/// Converted to (or from) JSON with serde.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The locations of the error in the GraphQL document of the originating request.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locations: Vec<Location>,

    /// If this is a field error, the JSON path to that field in [`Response::data`]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<Path>,

    /// The optional GraphQL extensions for this error.
    #[serde(default, skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Error {
    /// Returns a builder that builds a GraphQL [`Error`] from its components.
    ///
    /// Builder methods:
    ///
    /// * `.message(impl Into<`[`String`]`>)`
    ///   Required.
    ///   Sets [`Error::message`].
    ///
    /// * `.location(impl Into<`[`Location`]`>)`
    ///   Optional, may be called multiple times.
    ///   Adds one item at the end of [`Error::locations`].
    ///
    /// * `.path(impl Into<`[`Path`]`>)`
    ///   Optional.
    ///   Sets [`Error::path`].
    ///
    /// * `.extension(impl Into<`[`ByteString`]`>, impl Into<`[`Value`]`>)`
    ///   Optional, may be called multiple times.
    ///   Adds one item to the [`Error::extensions`] map.
    ///
    /// * `.extension_code(impl Into<`[`String`]`>)`
    ///   Optional.
    ///   Sets the "code" in the extension map. Will be ignored if extension already has this key
    ///   set.
    ///
    /// * `.build()`
    ///   Finishes the builder and returns a GraphQL [`Error`].
    #[builder(visibility = "pub")]
    fn new(
        message: String,
        locations: Vec<Location>,
        path: Option<Path>,
        extension_code: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        mut extensions: JsonMap<ByteString, Value>,
    ) -> Self {
        if let Some(code) = extension_code {
            extensions
                .entry("code")
                .or_insert(Value::String(ByteString::from(code)));
        }
        Self {
            message,
            locations,
            path,
            extensions,
        }
    }

    /// Extract the error code from [`Error::extensions`] as a String if it is set.
    pub fn extension_code(&self) -> Option<String> {
        self.extensions.get("code").and_then(|c| match c {
            Value::String(s) => Some(s.as_str().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Bool(_) => None,
        })
    }

    /// The underlying reason for this error, if one was recorded.
    pub fn cause(&self) -> Option<&str> {
        self.extensions
            .get(CAUSE_EXTENSION)
            .and_then(|cause| cause.as_str())
    }
}

/// Trait used to convert expected errors into a list of GraphQL errors
pub(crate) trait ErrorExtension
where
    Self: Sized + std::fmt::Display,
{
    fn extension_code(&self) -> String;

    fn custom_extension_details(&self) -> Option<Object> {
        None
    }

    /// The error message; the [`Display`](std::fmt::Display) output by default.
    fn message(&self) -> String {
        self.to_string()
    }

    fn to_graphql_error(&self, path: Option<Path>, location: Option<Location>) -> Error {
        let mut extensions = self.custom_extension_details().unwrap_or_default();
        extensions.insert("code", self.extension_code().into());

        Error {
            message: self.message(),
            locations: location.into_iter().collect(),
            path,
            extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn line_index_locations() {
        let source = "query {\n  pets {\n    name\n  }\n}";
        let index = LineIndex::new(source);
        assert_eq!(index.location(0), Location { line: 1, column: 1 });
        let offset = source.find("pets").unwrap();
        assert_eq!(index.location(offset), Location { line: 2, column: 3 });
        let offset = source.find("name").unwrap();
        assert_eq!(index.location(offset), Location { line: 3, column: 5 });
        // a newline belongs to the line it ends
        let offset = source.find('\n').unwrap();
        assert_eq!(index.location(offset), Location { line: 1, column: 8 });
        assert_eq!(index.location(offset + 1), Location { line: 2, column: 1 });
    }

    #[test]
    fn line_index_counts_characters() {
        let source = "# ünïcödé\n{ pets(name: \"Félix\") { name } }";
        let index = LineIndex::new(source);
        let offset = source.find("name }").unwrap();
        assert_eq!(index.location(offset), Location { line: 2, column: 25 });
        let offset = source.find("ü").unwrap();
        assert_eq!(index.location(offset), Location { line: 1, column: 3 });
        let offset = source.find("cödé").unwrap();
        assert_eq!(index.location(offset), Location { line: 1, column: 6 });
    }

    #[test]
    fn error_builder_sets_code_and_cause() {
        let error = Error::builder()
            .message("Error trying to resolve field 'pets'.")
            .path(Path::from("pets"))
            .extension_code("FIELD_NOT_ON_CONCRETE_TYPE")
            .extension(CAUSE_EXTENSION, "some cause")
            .build();

        assert_eq!(
            error.extension_code().as_deref(),
            Some("FIELD_NOT_ON_CONCRETE_TYPE")
        );
        assert_eq!(error.cause(), Some("some cause"));
        assert_eq!(
            serde_json_bytes::to_value(&error).unwrap(),
            json!({
                "message": "Error trying to resolve field 'pets'.",
                "path": ["pets"],
                "extensions": {
                    "cause": "some cause",
                    "code": "FIELD_NOT_ON_CONCRETE_TYPE",
                }
            })
        );
    }

    #[test]
    fn error_deserializes_without_optional_members() {
        let error: Error =
            serde_json_bytes::from_value(json!({ "message": "something went wrong" })).unwrap();
        assert_eq!(error.message, "something went wrong");
        assert!(error.locations.is_empty());
        assert!(error.path.is_none());
        assert!(error.extensions.is_empty());
    }
}
