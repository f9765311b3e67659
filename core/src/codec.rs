//! JSON payload codec.
//!
//! Bodies of keyed calls are JSON objects in both directions. Decoding is
//! strict: a body that parses as JSON but is not an object (array, scalar,
//! `null`) is a `CannotDecodeData` failure, never a degraded success.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, Result};

/// String-keyed JSON object, the body representation for keyed calls.
pub type KeyedData = serde_json::Map<String, Value>;

/// Decode `bytes` as a top-level JSON object.
pub fn decode_keyed(bytes: &[u8]) -> Result<KeyedData> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ApiError::CannotDecodeData(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::CannotDecodeData(format!(
            "expected a JSON object, found {}",
            kind_of(&other)
        ))),
    }
}

/// Decode `bytes` into `T`. Any mismatch between the JSON and `T` fails.
pub fn decode_typed<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::CannotDecodeData(e.to_string()))
}

/// Encode keyed data as a JSON body.
pub fn encode_keyed(data: &KeyedData) -> Result<Vec<u8>> {
    serde_json::to_vec(data).map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// Encode any serializable value as a keyed body. The value must serialize
/// to a JSON object.
pub fn to_keyed<T: Serialize + ?Sized>(value: &T) -> Result<KeyedData> {
    match serde_json::to_value(value).map_err(|e| ApiError::SerializationError(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::SerializationError(format!(
            "request body must be a JSON object, found {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
