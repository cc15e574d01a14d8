//! typed json encoding of [Value]s
//!
//! A value is always encoded against a [Type]. For concrete types the json is just the plain value, for
//! [Type::Dynamic] the type travels along with the value:
//!
//! ```json
//! { "value": { "port": 5432 }, "type": ["object", { "port": "number" }] }
//! ```
//!
//! which makes the encoding self describing: decoding never has to guess.
use super::{ConversionError, Type, Value};
use indexmap::IndexMap;
use serde_json::Value as Json;

/// Encode `value` as json of type `ty`
pub fn marshal(value: &Value, ty: &Type) -> Result<Json, ConversionError> {
    let mismatch = || ConversionError::TypeMismatch {
        expected: ty.clone(),
        found: value.ty(),
    };

    match (ty, value) {
        (_, Value::Null) => Ok(Json::Null),
        (Type::Dynamic, value) => {
            let ty = value.ty();
            let mut envelope = serde_json::Map::new();
            envelope.insert("value".to_string(), marshal(value, &ty)?);
            envelope.insert("type".to_string(), ty.to_json());
            Ok(Json::Object(envelope))
        }
        (Type::Bool, Value::Bool(b)) => Ok(Json::Bool(*b)),
        (Type::Number, Value::Number(n)) => number_to_json(n).map(Json::Number),
        (Type::String, Value::String(s)) => Ok(Json::String(s.clone())),
        (Type::List(element) | Type::Set(element), Value::List(elements) | Value::Set(elements)) => {
            elements
                .iter()
                .map(|value| marshal(value, element))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array)
        }
        (Type::Tuple(types), Value::List(elements) | Value::Set(elements)) => {
            if types.len() != elements.len() {
                return Err(ConversionError::TupleLength {
                    expected: types.len(),
                    found: elements.len(),
                });
            }

            elements
                .iter()
                .zip(types)
                .map(|(value, ty)| marshal(value, ty))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array)
        }
        (Type::Map(element), Value::Map(fields) | Value::Object(fields)) => fields
            .iter()
            .map(|(key, value)| Ok((key.clone(), marshal(value, element)?)))
            .collect::<Result<serde_json::Map<_, _>, ConversionError>>()
            .map(Json::Object),
        (Type::Object(field_types), Value::Map(fields) | Value::Object(fields)) => {
            if let Some(unsupported) = fields.keys().find(|key| !field_types.contains_key(*key)) {
                return Err(ConversionError::UnsupportedAttribute(unsupported.clone()));
            }

            field_types
                .iter()
                .map(|(key, ty)| {
                    let value = fields
                        .get(key)
                        .ok_or_else(|| ConversionError::MissingAttribute(key.clone()))?;
                    Ok((key.clone(), marshal(value, ty)?))
                })
                .collect::<Result<serde_json::Map<_, _>, ConversionError>>()
                .map(Json::Object)
        }
        _ => Err(mismatch()),
    }
}

/// Decode json of type `ty` into a [Value]
pub fn unmarshal(json: &Json, ty: &Type) -> Result<Value, ConversionError> {
    let mismatch = |expected| ConversionError::JsonMismatch {
        expected,
        ty: ty.clone(),
    };

    match (ty, json) {
        (_, Json::Null) => Ok(Value::Null),
        (Type::Dynamic, Json::Object(envelope)) => {
            let (Some(value), Some(ty)) = (envelope.get("value"), envelope.get("type")) else {
                return Err(mismatch("object with value and type"));
            };
            unmarshal(value, &Type::from_json(ty)?)
        }
        (Type::Dynamic, _) => Err(mismatch("object with value and type")),
        (Type::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
        (Type::Bool, _) => Err(mismatch("bool")),
        (Type::Number, Json::Number(n)) => number_from_json(n).map(Value::Number),
        (Type::Number, _) => Err(mismatch("number")),
        (Type::String, Json::String(s)) => Ok(Value::String(s.clone())),
        (Type::String, _) => Err(mismatch("string")),
        (Type::List(element), Json::Array(elements)) => elements
            .iter()
            .map(|json| unmarshal(json, element))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (Type::Set(element), Json::Array(elements)) => elements
            .iter()
            .map(|json| unmarshal(json, element))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::set),
        (Type::Tuple(types), Json::Array(elements)) => {
            if types.len() != elements.len() {
                return Err(ConversionError::TupleLength {
                    expected: types.len(),
                    found: elements.len(),
                });
            }

            elements
                .iter()
                .zip(types)
                .map(|(json, ty)| unmarshal(json, ty))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        (Type::List(_) | Type::Set(_) | Type::Tuple(_), _) => Err(mismatch("array")),
        (Type::Map(element), Json::Object(fields)) => fields
            .iter()
            .map(|(key, json)| Ok((key.clone(), unmarshal(json, element)?)))
            .collect::<Result<IndexMap<_, _>, ConversionError>>()
            .map(Value::Map),
        (Type::Object(field_types), Json::Object(fields)) => {
            if let Some(unsupported) = fields.keys().find(|key| !field_types.contains_key(*key)) {
                return Err(ConversionError::UnsupportedAttribute(unsupported.clone()));
            }

            field_types
                .iter()
                .map(|(key, ty)| {
                    let json = fields
                        .get(key)
                        .ok_or_else(|| ConversionError::MissingAttribute(key.clone()))?;
                    Ok((key.clone(), unmarshal(json, ty)?))
                })
                .collect::<Result<IndexMap<_, _>, ConversionError>>()
                .map(Value::Object)
        }
        (Type::Map(_) | Type::Object(_), _) => Err(mismatch("object")),
    }
}

fn number_to_json(number: &hcl::Number) -> Result<serde_json::Number, ConversionError> {
    if let Some(int) = number.as_i64() {
        return Ok(int.into());
    }
    if let Some(uint) = number.as_u64() {
        return Ok(uint.into());
    }

    number
        .as_f64()
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| ConversionError::UnrepresentableNumber(number.to_string()))
}

fn number_from_json(number: &serde_json::Number) -> Result<hcl::Number, ConversionError> {
    if let Some(int) = number.as_i64() {
        return Ok(int.into());
    }
    if let Some(uint) = number.as_u64() {
        return Ok(uint.into());
    }

    number
        .as_f64()
        .and_then(hcl::Number::from_f64)
        .ok_or_else(|| ConversionError::UnrepresentableNumber(number.to_string()))
}
