//! dynamic value representation
//!
//! Values produced while evaluating a configuration are dynamically typed. The model contains
//! - null
//! - boolean (true/false)
//! - number ([hcl::Number], exact for 64 bit integers, f64 otherwise)
//! - string (utf-8)
//! - list (ordered, elements of one type, see [Type::Tuple] for mixed elements)
//! - set (unique elements, insertion ordered)
//! - map (string keys, elements of one type)
//! - object (record: string keys, every field carries its own type)
//!
//! Objects are the only aggregate with heterogeneous fields, which is why dependency outputs (a mix of strings,
//! numbers and nested structures) are always represented as objects.
//!
//! The static/dynamic boundary is crossed in [bridge] only.
pub mod bridge;
pub mod json;
mod ty;

pub use bridge::{synthetic_record_type, value_to_generic_map, GenericMap};
pub use ty::Type;

use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// All possible values
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(hcl::Number),
    String(String),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(IndexMap<String, Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Creates a set, dropping duplicate elements
    pub fn set(elements: impl IntoIterator<Item = Value>) -> Self {
        let mut unique: Vec<Value> = vec![];
        for element in elements {
            if !unique.contains(&element) {
                unique.push(element);
            }
        }
        Value::Set(unique)
    }

    /// An object without fields
    pub fn empty_object() -> Self {
        Value::Object(IndexMap::new())
    }

    /// Derive the type of this value
    pub fn ty(&self) -> Type {
        match self {
            Value::Null => Type::Dynamic,
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::List(elements) => {
                let types: Vec<Type> = elements.iter().map(Value::ty).collect();
                match common_type(&types) {
                    Some(element) => Type::list(element),
                    None => Type::Tuple(types),
                }
            }
            Value::Set(elements) => {
                let types: Vec<Type> = elements.iter().map(Value::ty).collect();
                match common_type(&types) {
                    Some(element) => Type::set(element),
                    None => Type::Tuple(types),
                }
            }
            Value::Map(entries) => {
                let types: Vec<Type> = entries.values().map(Value::ty).collect();
                match common_type(&types) {
                    Some(element) => Type::map(element),
                    None => synthetic_record_type(entries),
                }
            }
            Value::Object(fields) => synthetic_record_type(fields),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Object fields or map entries
    pub fn as_record(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(fields) | Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_record().and_then(|fields| fields.get(key))
    }
}

/// The single type shared by all `types`
///
/// `Dynamic` for no types, `None` when they differ.
fn common_type(types: &[Type]) -> Option<Type> {
    let Some((first, rest)) = types.split_first() else {
        return Some(Type::Dynamic);
    };

    rest.iter().all(|ty| ty == first).then(|| first.clone())
}

/// Errors crossing the static/dynamic boundary
#[derive(thiserror::Error, Debug)]
pub enum ConversionError {
    #[error("expected an object, found {0}")]
    NotARecord(Type),
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: Type, found: Type },
    #[error("expected a json {expected} for type {ty}")]
    JsonMismatch { expected: &'static str, ty: Type },
    #[error("number {0} is not representable")]
    UnrepresentableNumber(String),
    #[error("invalid type descriptor {0}")]
    InvalidType(String),
    #[error("missing attribute {0:?}")]
    MissingAttribute(String),
    #[error("unsupported attribute {0:?}")]
    UnsupportedAttribute(String),
    #[error("tuple expects {expected} elements, found {found}")]
    TupleLength { expected: usize, found: usize },
    #[error("malformed json")]
    Json(#[from] serde_json::Error),
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<hcl::Number> for Value {
    fn from(value: hcl::Number) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<hcl::value::Map<K, V>> for Value {
    fn from(value: hcl::value::Map<K, V>) -> Self {
        Value::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<hcl::Value> for Value {
    fn from(value: hcl::Value) -> Value {
        match value {
            hcl::Value::Null => Value::Null,
            hcl::Value::Bool(b) => b.into(),
            hcl::Value::Number(n) => n.into(),
            hcl::Value::String(s) => s.into(),
            hcl::Value::Array(a) => a.into(),
            hcl::Value::Object(o) => o.into(),
        }
    }
}

/// Values handed to the hcl evaluator
///
/// hcl has no notion of sets or homogeneous maps, those become arrays and objects.
impl From<Value> for hcl::Value {
    fn from(value: Value) -> hcl::Value {
        match value {
            Value::Null => hcl::Value::Null,
            Value::Bool(b) => hcl::Value::Bool(b),
            Value::Number(n) => hcl::Value::Number(n),
            Value::String(s) => hcl::Value::String(s),
            Value::List(elements) | Value::Set(elements) => {
                hcl::Value::Array(elements.into_iter().map(Into::into).collect())
            }
            Value::Map(fields) | Value::Object(fields) => hcl::Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Number(value) => serde::Serialize::serialize(value, serializer),
            Value::String(value) => serializer.serialize_str(value),
            Value::List(value) | Value::Set(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Map(value) | Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}
