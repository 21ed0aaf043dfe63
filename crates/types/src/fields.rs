use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::SchemaError;

/// A raw JSON entity, before it is turned into a typed record.
pub type Record = Map<String, Value>;

pub fn as_record<'a>(entity: &str, value: &'a Value) -> Result<&'a Record, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::mismatch(entity, "expected a JSON object"))
}

pub fn into_record(entity: &str, value: Value) -> Result<Record, SchemaError> {
    match value {
        Value::Object(record) => Ok(record),
        _ => Err(SchemaError::mismatch(entity, "expected a JSON object")),
    }
}

pub fn missing_fields(record: &Record, fields: &[&str]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| !record.contains_key(**field))
        .map(|field| field.to_string())
        .collect()
}

pub fn require_fields(entity: &str, record: &Record, fields: &[&str]) -> Result<(), SchemaError> {
    match fields.iter().find(|field| !record.contains_key(**field)) {
        Some(field) => Err(SchemaError::missing(entity, *field)),
        None => Ok(()),
    }
}

/// Deserializes one field; any serde failure is reported as a type mismatch on that field.
pub fn decode_field<T: DeserializeOwned>(field: &str, value: Value) -> Result<T, SchemaError> {
    serde_json::from_value(value).map_err(|err| SchemaError::mismatch(field, err.to_string()))
}

/// Removes a nested provider block. `Ok(None)` when absent, mismatch when it is not an object.
pub fn take_block(record: &mut Record, block: &str) -> Result<Option<Record>, SchemaError> {
    match record.remove(block) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(inner)) => Ok(Some(inner)),
        Some(_) => Err(SchemaError::mismatch(block, "provider block must be an object")),
    }
}
