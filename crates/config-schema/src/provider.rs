use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use types::{decode_field, take_block, Record, SchemaError};

/// The closed set of backends a subsystem can be configured for.
pub trait ProviderKind: Copy + Eq + Sized + 'static {
    /// Name of the discriminator field in the record.
    const FIELD: &'static str;
    /// Whether the discriminator is written as its numeric code rather than its name.
    const NUMERIC: bool;

    fn all() -> &'static [Self];
    fn code(self) -> u8;
    fn name(self) -> &'static str;
    /// Nested block carrying this provider's settings, if it has any.
    fn block(self) -> Option<&'static str>;

    /// Accepts the numeric code or the name (case-insensitive). Anything else
    /// is `UnknownProvider`, whatever the rest of the record looks like.
    fn parse(entity: &str, raw: Option<&Value>) -> Result<Self, SchemaError> {
        let unknown = |value: String| SchemaError::UnknownProvider {
            field: Self::FIELD.to_string(),
            value,
        };

        let found = match raw {
            None | Some(Value::Null) => return Err(SchemaError::missing(entity, Self::FIELD)),
            Some(Value::Number(number)) => number
                .as_u64()
                .and_then(|code| Self::all().iter().find(|kind| u64::from(kind.code()) == code)),
            Some(Value::String(text)) => {
                let text = text.trim();
                match text.parse::<u64>() {
                    Ok(code) => Self::all()
                        .iter()
                        .find(|kind| u64::from(kind.code()) == code),
                    Err(_) => Self::all()
                        .iter()
                        .find(|kind| kind.name().eq_ignore_ascii_case(text)),
                }
            }
            Some(_) => None,
        };

        match (found, raw) {
            (Some(kind), _) => Ok(*kind),
            (None, Some(Value::String(text))) => Err(unknown(text.clone())),
            (None, Some(other)) => Err(unknown(other.to_string())),
            (None, None) => Err(SchemaError::missing(entity, Self::FIELD)),
        }
    }

    fn to_wire(self) -> Value {
        if Self::NUMERIC {
            Value::from(self.code())
        } else {
            Value::from(self.name())
        }
    }

    /// Every block name used by any provider of this subsystem.
    fn block_names() -> BTreeSet<&'static str> {
        Self::all().iter().filter_map(|kind| kind.block()).collect()
    }
}

/// Checks a discriminator the record already carries. An absent one is left
/// to migration, which may infer it.
pub(crate) fn check_stored_discriminator<K: ProviderKind>(
    entity: &str,
    value: &Value,
) -> Result<(), SchemaError> {
    match value.get(K::FIELD) {
        None | Some(Value::Null) => Ok(()),
        Some(raw) => K::parse(entity, Some(raw)).map(|_| ()),
    }
}

/// Settings nested under one provider's block.
pub trait ProviderBlock: Serialize + DeserializeOwned {
    const NAME: &'static str;
    /// Fields that must be present inside the block.
    const REQUIRED: &'static [&'static str];

    fn check(&self) -> Result<(), SchemaError> {
        Ok(())
    }
}

/// Removes and validates the block of the active provider.
pub(crate) fn active_block<B: ProviderBlock>(record: &mut Record) -> Result<B, SchemaError> {
    let inner = take_block(record, B::NAME)?
        .ok_or_else(|| SchemaError::incomplete(B::NAME, "block is missing"))?;

    if let Some(field) = B::REQUIRED.iter().find(|field| !inner.contains_key(**field)) {
        return Err(SchemaError::incomplete(
            B::NAME,
            format!("missing `{field}`"),
        ));
    }

    let block: B = decode_field(B::NAME, Value::Object(inner))?;
    block.check()?;
    Ok(block)
}

pub(crate) fn block_entry<B: ProviderBlock>(block: &B) -> Result<(String, Value), SchemaError> {
    Ok((B::NAME.to_string(), serde_json::to_value(block)?))
}

/// Moves the blocks of inactive providers out of the record, untouched.
pub(crate) fn take_dormant<K: ProviderKind>(record: &mut Record, active: K) -> Record {
    let mut dormant = Record::new();
    for name in K::block_names() {
        if Some(name) == active.block() {
            continue;
        }
        if let Some(block) = record.remove(name) {
            dormant.insert(name.to_string(), block);
        }
    }
    dormant
}

/// Checks the required top-level fields, then decodes the remaining record.
pub(crate) fn decode_settings<T: DeserializeOwned>(
    entity: &str,
    record: Record,
    required: &[&str],
) -> Result<T, SchemaError> {
    types::require_fields(entity, &record, required)?;
    decode_field(entity, Value::Object(record))
}

/// Serializes settings into the top level of a wire record.
pub(crate) fn settings_record<T: Serialize>(entity: &str, settings: &T) -> Result<Record, SchemaError> {
    match serde_json::to_value(settings)? {
        Value::Object(record) => Ok(record),
        _ => Err(SchemaError::mismatch(entity, "settings must serialize to an object")),
    }
}

pub(crate) fn check_non_empty(block: &str, field: &str, value: &str) -> Result<(), SchemaError> {
    if value.trim().is_empty() {
        return Err(SchemaError::incomplete(
            block,
            format!("`{field}` must not be empty"),
        ));
    }
    Ok(())
}

pub(crate) fn check_nonzero(field: &str, value: u64) -> Result<(), SchemaError> {
    if value == 0 {
        return Err(SchemaError::out_of_range(field, "must be at least 1"));
    }
    Ok(())
}

pub(crate) fn check_max_len(field: &str, value: &str, max: usize) -> Result<(), SchemaError> {
    if value.chars().count() > max {
        return Err(SchemaError::out_of_range(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}
