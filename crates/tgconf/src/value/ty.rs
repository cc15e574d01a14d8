//! type descriptors for [super::Value]
//!
//! Types are derived from values at runtime (see [super::Value::ty]) and have a self-describing JSON encoding:
//!
//! | type                 | json                                |
//! |----------------------|-------------------------------------|
//! | `Bool`               | `"bool"`                            |
//! | `Number`             | `"number"`                          |
//! | `String`             | `"string"`                          |
//! | `Dynamic`            | `"dynamic"`                         |
//! | `List(T)`            | `["list", T]`                       |
//! | `Set(T)`             | `["set", T]`                        |
//! | `Map(T)`             | `["map", T]`                        |
//! | `Object{a: A, ...}`  | `["object", {"a": A, ...}]`         |
//! | `Tuple([A, B, ...])` | `["tuple", [A, B, ...]]`            |
//!
//! This is the same encoding `terraform output -json` uses for the `type` of each output.
use super::ConversionError;
use indexmap::IndexMap;
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Bool,
    Number,
    String,
    /// Any type, resolved from the value itself
    Dynamic,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    /// Record type, each field has its own type
    Object(IndexMap<String, Type>),
    Tuple(Vec<Type>),
}

impl Type {
    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    pub fn set(element: Type) -> Self {
        Type::Set(Box::new(element))
    }

    pub fn map(element: Type) -> Self {
        Type::Map(Box::new(element))
    }

    pub fn to_json(&self) -> Json {
        match self {
            Type::Bool => Json::from("bool"),
            Type::Number => Json::from("number"),
            Type::String => Json::from("string"),
            Type::Dynamic => Json::from("dynamic"),
            Type::List(element) => Json::Array(vec!["list".into(), element.to_json()]),
            Type::Set(element) => Json::Array(vec!["set".into(), element.to_json()]),
            Type::Map(element) => Json::Array(vec!["map".into(), element.to_json()]),
            Type::Object(fields) => Json::Array(vec![
                "object".into(),
                Json::Object(
                    fields
                        .iter()
                        .map(|(name, ty)| (name.clone(), ty.to_json()))
                        .collect(),
                ),
            ]),
            Type::Tuple(elements) => Json::Array(vec![
                "tuple".into(),
                Json::Array(elements.iter().map(Type::to_json).collect()),
            ]),
        }
    }

    pub fn from_json(json: &Json) -> Result<Self, ConversionError> {
        let invalid = || ConversionError::InvalidType(json.to_string());

        match json {
            Json::String(name) => match name.as_str() {
                "bool" => Ok(Type::Bool),
                "number" => Ok(Type::Number),
                "string" => Ok(Type::String),
                "dynamic" => Ok(Type::Dynamic),
                _ => Err(invalid()),
            },
            Json::Array(parts) => {
                let [Json::String(kind), argument, ..] = parts.as_slice() else {
                    return Err(invalid());
                };

                match (kind.as_str(), argument) {
                    ("list", element) => Ok(Type::list(Type::from_json(element)?)),
                    ("set", element) => Ok(Type::set(Type::from_json(element)?)),
                    ("map", element) => Ok(Type::map(Type::from_json(element)?)),
                    // a third element lists optional attributes, which makes no difference for decoding
                    ("object", Json::Object(fields)) => fields
                        .iter()
                        .map(|(name, ty)| Ok((name.clone(), Type::from_json(ty)?)))
                        .collect::<Result<IndexMap<_, _>, ConversionError>>()
                        .map(Type::Object),
                    ("tuple", Json::Array(elements)) => elements
                        .iter()
                        .map(Type::from_json)
                        .collect::<Result<Vec<_>, _>>()
                        .map(Type::Tuple),
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Number => f.write_str("number"),
            Type::String => f.write_str("string"),
            Type::Dynamic => f.write_str("dynamic"),
            Type::List(element) => write!(f, "list of {element}"),
            Type::Set(element) => write!(f, "set of {element}"),
            Type::Map(element) => write!(f, "map of {element}"),
            Type::Object(_) => f.write_str("object"),
            Type::Tuple(_) => f.write_str("tuple"),
        }
    }
}

impl serde::Serialize for Type {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Type {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let json = Json::deserialize(deserializer)?;
        Type::from_json(&json).map_err(serde::de::Error::custom)
    }
}
