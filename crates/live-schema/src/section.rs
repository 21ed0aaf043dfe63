use serde::de::DeserializeOwned;
use serde_json::Value;

use types::{decode_field, into_record, require_fields, SchemaError};

/// A JSON object section with a fixed set of mandatory keys.
pub trait Section: DeserializeOwned {
    const NAME: &'static str;
    const REQUIRED: &'static [&'static str];
}

pub fn decode_section<T: Section>(value: Value) -> Result<T, SchemaError> {
    decode_section_as(T::NAME, value)
}

/// Like [`decode_section`], reporting errors under the name the section has in its document.
pub fn decode_section_as<T: Section>(name: &str, value: Value) -> Result<T, SchemaError> {
    let record = into_record(name, value)?;
    require_fields(name, &record, T::REQUIRED)?;
    decode_field(name, Value::Object(record))
}

/// State of one optional subsystem in a live-data document.
#[derive(Debug, Clone, PartialEq)]
pub enum Subsystem<T> {
    /// Absent from the document, switched off, or not tracked by this parser.
    Disabled,
    Active(T),
    /// Present and enabled but unreadable; the rest of the document is unaffected.
    Malformed(SchemaError),
}

impl<T> Subsystem<T> {
    pub fn active(&self) -> Option<&T> {
        match self {
            Subsystem::Active(section) => Some(section),
            _ => None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Subsystem::Disabled)
    }

    pub fn error(&self) -> Option<&SchemaError> {
        match self {
            Subsystem::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T: Section> Subsystem<T> {
    /// Reads a subsystem section carrying an `enabled` flag next to its readings.
    pub fn from_section(name: &str, raw: Option<&Value>) -> Self {
        let Some(raw) = raw else {
            return Subsystem::Disabled;
        };
        match raw {
            Value::Null => Subsystem::Disabled,
            Value::Object(object) => match object.get("enabled") {
                Some(Value::Bool(false)) => Subsystem::Disabled,
                Some(Value::Bool(true)) => match decode_section_as::<T>(name, raw.clone()) {
                    Ok(section) => Subsystem::Active(section),
                    Err(err) => Subsystem::Malformed(err),
                },
                Some(_) => Subsystem::Malformed(SchemaError::mismatch(
                    format!("{name}.enabled"),
                    "expected a boolean",
                )),
                None => Subsystem::Malformed(SchemaError::missing(name, "enabled")),
            },
            _ => Subsystem::Malformed(SchemaError::mismatch(name, "expected a JSON object")),
        }
    }
}
