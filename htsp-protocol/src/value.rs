//! The htsmsg value model.
//!
//! Every HTSP message is a [`Map`] of named [`Value`]s. Values are a closed
//! tagged union; accessors never coerce between variants.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, TypeMismatch};

/// Discriminant of a [`Value`], used in type mismatch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Integer,
    String,
    Binary,
    List,
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Integer => "integer",
            ValueKind::String => "string",
            ValueKind::Binary => "binary",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        };
        f.write_str(name)
    }
}

/// A single protocol value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Signed 64-bit integer. Booleans travel as 0/1 integers.
    Integer(i64),
    /// UTF-8 text.
    String(String),
    /// Opaque bytes.
    Binary(Bytes),
    /// Ordered, possibly heterogeneous sequence.
    List(Vec<Value>),
    /// Nested field map.
    Map(Map),
}

impl Value {
    pub fn integer(v: impl Into<i64>) -> Self {
        Value::Integer(v.into())
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::String(v.into())
    }

    pub fn binary(v: impl Into<Bytes>) -> Self {
        Value::Binary(v.into())
    }

    pub fn list(v: impl IntoIterator<Item = Value>) -> Self {
        Value::List(v.into_iter().collect())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
            Value::Binary(_) => ValueKind::Binary,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    fn mismatch(&self, expected: ValueKind) -> TypeMismatch {
        TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_int(&self) -> Result<i64, TypeMismatch> {
        match self {
            Value::Integer(v) => Ok(*v),
            other => Err(other.mismatch(ValueKind::Integer)),
        }
    }

    /// Reads an integer as a boolean (zero is false).
    pub fn as_bool(&self) -> Result<bool, TypeMismatch> {
        self.as_int().map(|v| v != 0)
    }

    pub fn as_str(&self) -> Result<&str, TypeMismatch> {
        match self {
            Value::String(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::String)),
        }
    }

    pub fn as_bytes(&self) -> Result<&Bytes, TypeMismatch> {
        match self {
            Value::Binary(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::Binary)),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], TypeMismatch> {
        match self {
            Value::List(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::List)),
        }
    }

    pub fn as_map(&self) -> Result<&Map, TypeMismatch> {
        match self {
            Value::Map(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::Map)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Binary(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Map(v)
    }
}

/// An ordered field map with unique names.
///
/// Field order is kept exactly as inserted (or as decoded), so a decoded map
/// re-encodes to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Map {
    fields: Vec<(String, Value)>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Set a field. An existing field keeps its position; a new one is appended.
    /// Returns the previous value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Appends without the uniqueness scan. Callers must have checked.
    pub(crate) fn push_unchecked(&mut self, name: String, value: Value) {
        self.fields.push((name, value));
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        read: impl FnOnce(&'a Value) -> Result<T, TypeMismatch>,
    ) -> Result<Option<T>, FieldError> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => read(v).map(Some).map_err(|source| FieldError::Mistyped {
                field: name.to_string(),
                source,
            }),
        }
    }

    fn required<T>(name: &str, value: Option<T>) -> Result<T, FieldError> {
        value.ok_or_else(|| FieldError::Missing(name.to_string()))
    }

    pub fn optional_i64(&self, name: &str) -> Result<Option<i64>, FieldError> {
        self.typed(name, Value::as_int)
    }

    pub fn require_i64(&self, name: &str) -> Result<i64, FieldError> {
        Self::required(name, self.optional_i64(name)?)
    }

    /// Integer field narrowed to `u32` (ids, counts, versions).
    pub fn optional_u32(&self, name: &str) -> Result<Option<u32>, FieldError> {
        match self.optional_i64(name)? {
            None => Ok(None),
            Some(v) => u32::try_from(v).map(Some).map_err(|_| FieldError::OutOfRange {
                field: name.to_string(),
                value: v,
            }),
        }
    }

    pub fn require_u32(&self, name: &str) -> Result<u32, FieldError> {
        Self::required(name, self.optional_u32(name)?)
    }

    pub fn optional_i32(&self, name: &str) -> Result<Option<i32>, FieldError> {
        match self.optional_i64(name)? {
            None => Ok(None),
            Some(v) => i32::try_from(v).map(Some).map_err(|_| FieldError::OutOfRange {
                field: name.to_string(),
                value: v,
            }),
        }
    }

    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, FieldError> {
        self.typed(name, Value::as_bool)
    }

    pub fn optional_str(&self, name: &str) -> Result<Option<&str>, FieldError> {
        self.typed(name, Value::as_str)
    }

    pub fn require_str(&self, name: &str) -> Result<&str, FieldError> {
        Self::required(name, self.optional_str(name)?)
    }

    pub fn optional_bytes(&self, name: &str) -> Result<Option<&Bytes>, FieldError> {
        self.typed(name, Value::as_bytes)
    }

    pub fn require_bytes(&self, name: &str) -> Result<&Bytes, FieldError> {
        Self::required(name, self.optional_bytes(name)?)
    }

    pub fn optional_list(&self, name: &str) -> Result<Option<&[Value]>, FieldError> {
        self.typed(name, Value::as_list)
    }

    pub fn require_list(&self, name: &str) -> Result<&[Value], FieldError> {
        Self::required(name, self.optional_list(name)?)
    }

    pub fn optional_map(&self, name: &str) -> Result<Option<&Map>, FieldError> {
        self.typed(name, Value::as_map)
    }

    /// A list of integers narrowed to `u32` (`tags`, `members`).
    pub fn u32_list(&self, name: &str) -> Result<Vec<u32>, FieldError> {
        let Some(items) = self.optional_list(name)? else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .map(|item| {
                let v = item.as_int().map_err(|source| FieldError::Mistyped {
                    field: name.to_string(),
                    source,
                })?;
                u32::try_from(v).map_err(|_| FieldError::OutOfRange {
                    field: name.to_string(),
                    value: v,
                })
            })
            .collect()
    }

    /// A list of strings (`servercapability`).
    pub fn string_list(&self, name: &str) -> Result<Vec<String>, FieldError> {
        let Some(items) = self.optional_list(name)? else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .map_err(|source| FieldError::Mistyped {
                        field: name.to_string(),
                        source,
                    })
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for Map {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_do_not_coerce() {
        let v = Value::from("27");
        assert_eq!(
            v.as_int(),
            Err(TypeMismatch {
                expected: ValueKind::Integer,
                found: ValueKind::String,
            })
        );
        assert_eq!(v.as_str(), Ok("27"));
        assert!(Value::from(27).as_str().is_err());
        assert!(Value::binary(Bytes::from_static(b"x")).as_list().is_err());
    }

    #[test]
    fn test_bool_is_integer_alias() {
        assert_eq!(Value::from(true), Value::Integer(1));
        assert_eq!(Value::Integer(0).as_bool(), Ok(false));
        assert_eq!(Value::Integer(5).as_bool(), Ok(true));
        assert!(Value::from("true").as_bool().is_err());
    }

    #[test]
    fn test_insert_keeps_position() {
        let mut map = Map::new().with("a", 1).with("b", 2).with("c", 3);
        let prev = map.insert("b", "two");
        assert_eq!(prev, Some(Value::Integer(2)));

        let names: Vec<&str> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(map.get("b"), Some(&Value::from("two")));

        assert_eq!(map.remove("a"), Some(Value::Integer(1)));
        assert_eq!(map.len(), 2);
        assert!(!map.contains("a"));
    }

    #[test]
    fn test_typed_field_getters() {
        let map = Map::new()
            .with("channelId", 12)
            .with("channelName", "BBC ONE")
            .with("negative", -1)
            .with("tags", vec![Value::from(1), Value::from(4)]);

        assert_eq!(map.require_u32("channelId"), Ok(12));
        assert_eq!(map.require_str("channelName"), Ok("BBC ONE"));
        assert_eq!(map.optional_str("channelIcon"), Ok(None));
        assert_eq!(map.u32_list("tags"), Ok(vec![1, 4]));
        assert_eq!(map.u32_list("services"), Ok(vec![]));

        assert_eq!(
            map.require_str("missing"),
            Err(FieldError::Missing("missing".to_string()))
        );
        assert!(matches!(
            map.require_str("channelId"),
            Err(FieldError::Mistyped { .. })
        ));
        assert!(matches!(
            map.require_u32("negative"),
            Err(FieldError::OutOfRange { value: -1, .. })
        ));
    }
}
