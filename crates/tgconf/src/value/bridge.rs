//! bridge between dynamic [Value]s and plain rust containers
//!
//! Two directions:
//! - [value_to_generic_map]: a record becomes a `serde_json` map, used for the `inputs` of a configuration
//! - [synthetic_record_type]: a map of values becomes a record type, so that maps with differently shaped entries
//!   (every dependency exposes its own outputs) can still be one value
use super::json::marshal;
use super::{ConversionError, Type, Value};
use indexmap::IndexMap;

/// Generic, order preserving map of json values
pub type GenericMap = serde_json::Map<String, serde_json::Value>;

/// The self describing encoding produced by [marshal] with [Type::Dynamic]
#[derive(serde::Deserialize)]
struct TypedJson {
    value: GenericMap,
    #[serde(rename = "type")]
    _type: serde_json::Value,
}

/// Convert a record into a generic map
///
/// The value is encoded as typed json and the `value` part is read back into generic containers. Integers, strings
/// and booleans are carried over exactly.
///
/// `null` converts to an empty map, any value that is not an object or map is rejected.
pub fn value_to_generic_map(value: &Value) -> Result<GenericMap, ConversionError> {
    match value {
        Value::Null => return Ok(GenericMap::new()),
        Value::Object(_) | Value::Map(_) => {}
        other => return Err(ConversionError::NotARecord(other.ty())),
    }

    let json = marshal(value, &Type::Dynamic)?;
    let typed: TypedJson = serde_json::from_value(json)?;

    Ok(typed.value)
}

/// Derive an object type with one field per entry, typed like the entry's value
pub fn synthetic_record_type(values: &IndexMap<String, Value>) -> Type {
    Type::Object(
        values
            .iter()
            .map(|(key, value)| (key.clone(), value.ty()))
            .collect(),
    )
}
