//! Nested value paths
//!
//! An [`ObjectPath`] names a location inside a JSON-like value tree, one
//! segment per level. Reads stop at the first missing level. Assignments
//! create missing levels: an array when the next segment is an index, an
//! object otherwise.
//!
//! ```rust
//! use gom_core::ObjectPath;
//! use serde_json::json;
//!
//! let mut target = json!({ "foo": {} });
//! ObjectPath::parse("foo.bat.0").assign(&mut target, json!("test")).unwrap();
//!
//! assert_eq!(target, json!({ "foo": { "bat": ["test"] } }));
//! ```

use crate::error::PathError;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt;

/// One level of an [`ObjectPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Name(String),
    Index(usize),
}

impl From<&str> for PathKey {
    fn from(name: &str) -> Self {
        PathKey::Name(name.to_owned())
    }
}

impl From<String> for PathKey {
    fn from(name: String) -> Self {
        PathKey::Name(name)
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Name(name) => f.write_str(name),
            PathKey::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Path to a nested value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    keys: SmallVec<[PathKey; 4]>,
}

impl ObjectPath {
    /// The empty path, naming the target itself
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path; all-digit segments become indexes
    pub fn parse(path: &str) -> Self {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.parse::<usize>() {
                Ok(index) => PathKey::Index(index),
                Err(_) => PathKey::from(segment),
            })
            .collect()
    }

    /// Extend the path by a name segment
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.keys.push(PathKey::Name(name.into()));
        self
    }

    /// Extend the path by an index segment
    pub fn index(mut self, index: usize) -> Self {
        self.keys.push(PathKey::Index(index));
        self
    }

    pub fn keys(&self) -> &[PathKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The value at this path, or `None` if any level is missing
    pub fn read<'a>(&self, target: &'a Value) -> Option<&'a Value> {
        self.keys
            .iter()
            .try_fold(target, |value, key| match (value, key) {
                (Value::Object(map), PathKey::Name(name)) => map.get(name.as_str()),
                (Value::Object(map), PathKey::Index(index)) => map.get(&index.to_string()),
                (Value::Array(items), PathKey::Index(index)) => items.get(*index),
                (Value::Array(items), PathKey::Name(name)) => {
                    name.parse::<usize>().ok().and_then(|index| items.get(index))
                }
                _ => None,
            })
    }

    /// Store `value` at this path, creating missing levels
    ///
    /// Arrays grow as needed, padding with `null`. A `null` on the way is
    /// replaced like a missing level; any other scalar is an error and leaves
    /// the levels above it as they were created.
    pub fn assign(&self, target: &mut Value, value: Value) -> Result<(), PathError> {
        let Some((last, parents)) = self.keys.split_last() else {
            return Err(PathError::Empty);
        };

        let mut current = target;
        for (depth, key) in parents.iter().enumerate() {
            let next = &self.keys[depth + 1];
            current = slot(current, key, depth, || empty_container(next))?;
        }
        *slot(current, last, parents.len(), || Value::Null)? = value;
        Ok(())
    }
}

impl FromIterator<PathKey> for ObjectPath {
    fn from_iter<I: IntoIterator<Item = PathKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// The child of `value` at `key`, created with `make` if missing or null
fn slot<'a>(
    value: &'a mut Value,
    key: &PathKey,
    depth: usize,
    make: impl FnOnce() -> Value,
) -> Result<&'a mut Value, PathError> {
    let child = match value {
        Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
        Value::Array(items) => {
            let index = match key {
                PathKey::Index(index) => *index,
                PathKey::Name(name) => name.parse::<usize>().map_err(|_| PathError::InvalidIndex {
                    depth,
                    key: name.clone(),
                })?,
            };
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        other => {
            return Err(PathError::NotContainer {
                depth,
                found: kind(other),
            })
        }
    };

    if child.is_null() {
        *child = make();
    }
    Ok(child)
}

fn empty_container(next: &PathKey) -> Value {
    match next {
        PathKey::Index(_) => Value::Array(Vec::new()),
        PathKey::Name(_) => Value::Object(Map::new()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> Value {
        json!({ "foo": { "bar": [1, 2, 3], "baz": 123 } })
    }

    #[test]
    fn test_assign_nested_value() {
        let mut target = target();
        ObjectPath::root()
            .key("foo")
            .key("bar")
            .index(0)
            .assign(&mut target, json!("test"))
            .unwrap();

        assert_eq!(target["foo"]["bar"], json!(["test", 2, 3]));
    }

    #[test]
    fn test_assign_overwrites_existing() {
        let mut target = target();
        ObjectPath::parse("foo.baz")
            .assign(&mut target, json!("test"))
            .unwrap();

        assert_eq!(target["foo"]["baz"], json!("test"));
    }

    #[test]
    fn test_assign_creates_deep_objects() {
        let mut target = target();
        ObjectPath::parse("foo.bat.boo")
            .assign(&mut target, json!("test"))
            .unwrap();

        assert!(target["foo"]["bat"].is_object());
        assert_eq!(target["foo"]["bat"]["boo"], json!("test"));
    }

    #[test]
    fn test_assign_creates_arrays_for_indexes() {
        let mut target = target();
        ObjectPath::parse("foo.bat.0")
            .assign(&mut target, json!("test"))
            .unwrap();

        assert!(!target["foo"].is_array());
        assert_eq!(target["foo"]["bat"], json!(["test"]));

        ObjectPath::parse("foo.bat.2")
            .assign(&mut target, json!(true))
            .unwrap();
        assert_eq!(target["foo"]["bat"], json!(["test", null, true]));
    }

    #[test]
    fn test_assign_errors() {
        let mut target = target();

        assert_eq!(
            ObjectPath::root().assign(&mut target, json!(1)),
            Err(PathError::Empty)
        );
        assert_eq!(
            ObjectPath::parse("foo.baz.x").assign(&mut target, json!(1)),
            Err(PathError::NotContainer {
                depth: 2,
                found: "number"
            })
        );
        assert_eq!(
            ObjectPath::root()
                .key("foo")
                .key("bar")
                .key("first")
                .assign(&mut target, json!(1)),
            Err(PathError::InvalidIndex {
                depth: 2,
                key: "first".into()
            })
        );
        assert_eq!(target, self::target());
    }

    #[test]
    fn test_read_nested_value() {
        let target = target();
        assert_eq!(ObjectPath::parse("foo.bar.0").read(&target), Some(&json!(1)));
        assert_eq!(ObjectPath::root().read(&target), Some(&target));
    }

    #[test]
    fn test_read_missing_levels() {
        let target = target();
        assert_eq!(ObjectPath::parse("foo.bat").read(&target), None);
        assert_eq!(ObjectPath::parse("foo.bat.boo").read(&target), None);
        assert_eq!(ObjectPath::parse("foo.baz.boo").read(&target), None);
        assert_eq!(ObjectPath::parse("foo.bar.9").read(&target), None);
    }

    #[test]
    fn test_parse_and_display() {
        let path = ObjectPath::parse("foo.bar.0");
        assert_eq!(
            path.keys(),
            &[PathKey::from("foo"), PathKey::from("bar"), PathKey::Index(0)]
        );
        assert_eq!(path.to_string(), "foo.bar.0");
        assert!(ObjectPath::parse("").is_empty());
    }
}
