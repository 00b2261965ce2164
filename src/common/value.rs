use crate::error::{Argument, InvalidInput};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_dynamo::to_attribute_value;
use std::{cmp, collections};

/// Name of the store-assigned identity field.
pub const IDENTITY_FIELD: &str = "_id";

/// One animal record: field names mapped to scalar values.
///
/// ```rust
/// use shelter_repository::common::value::{Document, Value};
///
/// let document = Document::from([
///     ("name".to_string(), Value::from("Rex")),
///     ("age_upon_outcome_in_weeks".to_string(), Value::from(52)),
/// ]);
/// ```
pub type Document = IndexMap<String, Value>;

/// Raw mapping a caller-supplied argument normalizes into.
pub(crate) type Mapping = collections::HashMap<String, types::AttributeValue>;

/// Scalar value held by a document field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// String value.
    String(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Number(_) => 1,
            Self::String(_) => 2,
            Self::Bool(_) => 3,
        }
    }

    /// Total order used when sorting: null, then numbers, then strings, then booleans.
    pub fn total_cmp(&self, other: &Self) -> cmp::Ordering {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => left.total_cmp(right),
            (Self::String(left), Self::String(right)) => left.cmp(right),
            (Self::Bool(left), Self::Bool(right)) => left.cmp(right),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Order between two numbers or two strings; `None` for any other pairing.
    pub(crate) fn compare(&self, other: &Self) -> Option<cmp::Ordering> {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => left.partial_cmp(right),
            (Self::String(left), Self::String(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }

    pub(crate) fn from_attribute_value(value: types::AttributeValue) -> Option<Self> {
        match value {
            types::AttributeValue::Bool(value) => Some(Self::Bool(value)),
            types::AttributeValue::N(value) => value.parse().ok().map(Self::Number),
            types::AttributeValue::Null(_) => Some(Self::Null),
            types::AttributeValue::S(value) => Some(Self::String(value)),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Number(value) => serializer.serialize_f64(*value),
            Self::String(value) => serializer.serialize_str(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Normalize a raw argument, keeping it only if it is a mapping.
pub(crate) fn to_mapping<T: Serialize>(raw: T) -> Option<Mapping> {
    match to_attribute_value(raw) {
        Ok(types::AttributeValue::M(mapping)) => Some(mapping),
        _ => None,
    }
}

/// Whether a raw argument is a mapping with at least one field.
///
/// ```rust
/// use serde_json::json;
/// use shelter_repository::common::value;
///
/// assert!(value::is_non_empty_mapping(json!({"name": "Rex"})));
/// assert!(!value::is_non_empty_mapping(json!({})));
/// assert!(!value::is_non_empty_mapping(json!(null)));
/// ```
pub fn is_non_empty_mapping<T: Serialize>(raw: T) -> bool {
    to_mapping(raw).is_some_and(|mapping| !mapping.is_empty())
}

/// Mapping required by a mutating operation, rejected when absent or empty.
pub(crate) fn require_mapping<T: Serialize>(
    raw: T,
    argument: Argument,
) -> Result<Mapping, InvalidInput> {
    let mapping = to_mapping(raw).ok_or(InvalidInput::NotAMapping(argument))?;
    if mapping.is_empty() {
        return Err(InvalidInput::Empty(argument));
    }
    Ok(mapping)
}

/// Document from a mapping whose fields must all hold scalar values.
///
/// Fields are ordered by name, mappings carry no field order of their own.
pub(crate) fn document_from_mapping(
    mapping: Mapping,
    argument: Argument,
) -> Result<Document, InvalidInput> {
    let mut document = Document::with_capacity(mapping.len());
    for (field, value) in mapping {
        if field.starts_with('$') {
            return Err(InvalidInput::UnsupportedOperator {
                argument,
                operator: field.clone(),
                field,
            });
        }
        match Value::from_attribute_value(value) {
            Some(value) => {
                document.insert(field, value);
            }
            None => return Err(InvalidInput::UnsupportedValue { argument, field }),
        }
    }
    document.sort_keys();
    Ok(document)
}
