//! Attribute values
//!
//! Documents are schema-less maps from field name to value. Four shapes are
//! indexable: string, integer, list of strings, list of integers. Anything
//! else (objects, floats, booleans, null, mixed lists) is kept verbatim in
//! the body as [`AttributeValue::Unindexed`] and never reaches the index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name to value. Ordered, so serialization is canonical.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// One attribute value.
///
/// Untagged: the JSON form is the plain value. Variant order decides how an
/// ambiguous input is read (`[]` is an empty string list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    String(String),
    StringList(Vec<String>),
    IntegerList(Vec<i64>),
    Unindexed(Value),
}

impl AttributeValue {
    /// Index terms for this value: one per scalar, one per list element.
    pub fn index_terms(&self) -> Vec<String> {
        match self {
            AttributeValue::String(s) => vec![s.clone()],
            AttributeValue::Integer(i) => vec![i.to_string()],
            AttributeValue::StringList(items) => items.clone(),
            AttributeValue::IntegerList(items) => items.iter().map(|i| i.to_string()).collect(),
            AttributeValue::Unindexed(_) => Vec::new(),
        }
    }

    pub fn is_indexable(&self) -> bool {
        !matches!(self, AttributeValue::Unindexed(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::String(_) => "string",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::StringList(_) => "string list",
            AttributeValue::IntegerList(_) => "integer list",
            AttributeValue::Unindexed(_) => "unindexed",
        }
    }

    /// Classify an arbitrary JSON value. Never fails: unrecognized shapes
    /// become `Unindexed`.
    pub fn from_json(value: Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(AttributeValue::Unindexed(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(items: Vec<String>) -> Self {
        AttributeValue::StringList(items)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(items: Vec<&str>) -> Self {
        AttributeValue::StringList(items.into_iter().map(String::from).collect())
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(items: Vec<i64>) -> Self {
        AttributeValue::IntegerList(items)
    }
}

/// Parse a JSON object into attributes. Returns `None` for non-objects.
pub fn attributes_from_json(value: Value) -> Option<Attributes> {
    match value {
        Value::Object(map) => Some(
            map.into_iter()
                .map(|(k, v)| (k, AttributeValue::from_json(v)))
                .collect(),
        ),
        _ => None,
    }
}

/// Build attributes from `(field, value)` pairs
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttributeValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
