//! JSON helpers shared by the request, response and execution layers.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// Extension trait for [`serde_json_bytes::Value`].
pub trait ValueExt {
    /// Returns `true` if the values are equal and the objects are ordered the same.
    ///
    /// **Note:** this is recursive.
    fn eq_and_ordered(&self, other: &Self) -> bool;
}

impl ValueExt for Value {
    fn eq_and_ordered(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.eq_and_ordered(vb))
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| a.eq_and_ordered(b))
            }
            (a, b) => a == b,
        }
    }
}

/// A path element in a response.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => write!(f, "{key}"),
        }
    }
}

/// A path into the result document.
///
/// This can be composed of strings and numbers
#[derive(Clone, Deserialize, Serialize, Debug, Default, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Default::default())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element)
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.0.pop()
    }

    /// The path of the closest enclosing field: list indices at the end are dropped.
    pub fn field_path(&self) -> Path {
        let end = self
            .0
            .iter()
            .rposition(|element| matches!(element, PathElement::Key(_)))
            .map_or(0, |position| position + 1);
        Path(self.0[..end].to_vec())
    }
}

impl<T> From<T> for Path
where
    T: AsRef<str>,
{
    fn from(s: T) -> Self {
        Self(
            s.as_ref()
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(|segment| match segment.parse::<usize>() {
                    Ok(index) => PathElement::Index(index),
                    Err(_) => PathElement::Key(segment.to_string()),
                })
                .collect(),
        )
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.iter() {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn path_from_str() {
        let path = Path::from("pets/1/name");
        assert_eq!(
            path,
            Path(vec![
                PathElement::Key("pets".to_string()),
                PathElement::Index(1),
                PathElement::Key("name".to_string()),
            ])
        );
        assert_eq!(path.to_string(), "/pets/1/name");
    }

    #[test]
    fn path_serializes_as_array() {
        let path = Path::from("friends/0");
        assert_eq!(
            serde_json_bytes::to_value(&path).unwrap(),
            json!(["friends", 0])
        );
        let back: Path = serde_json_bytes::from_value(json!(["friends", 0])).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn field_path_drops_trailing_indices() {
        assert_eq!(Path::from("pets/0").field_path(), Path::from("pets"));
        assert_eq!(
            Path::from("owner/pets/3/2").field_path(),
            Path::from("owner/pets")
        );
        assert_eq!(Path::from("pets/0/name").field_path(), Path::from("pets/0/name"));
        assert_eq!(Path::from("").field_path(), Path::empty());
    }

    #[test]
    fn eq_and_ordered_checks_key_order() {
        let a = json!({"a": 1, "b": [{"c": true, "d": null}]});
        let b = json!({"b": [{"c": true, "d": null}], "a": 1});
        let c = json!({"a": 1, "b": [{"d": null, "c": true}]});
        assert_eq!(a, b);
        assert!(a.eq_and_ordered(&a.clone()));
        assert!(!a.eq_and_ordered(&b));
        assert!(!a.eq_and_ordered(&c));
    }
}
