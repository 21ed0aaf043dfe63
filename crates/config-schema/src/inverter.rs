use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use types::{into_record, EntityKind, SchemaError};

use crate::provider::{check_max_len, decode_settings, settings_record};
use crate::ConfigEntity;

const ENTITY: &str = "inverter";

const REQUIRED: &[&str] = &["id", "serial", "name", "type"];

const MAX_NAME_LEN: usize = 31;
const MAX_CHANNELS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterChannel {
    #[serde(default)]
    pub name: String,
    /// Watt peak of the attached module string.
    #[serde(default)]
    pub max_power: u16,
    #[serde(default)]
    pub yield_total_offset: f64,
}

/// One registered inverter. Flags absent from the record read as off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Hexadecimal serial number.
    pub serial: String,
    pub name: String,
    #[serde(rename = "type")]
    pub model: String,
    #[serde(default)]
    pub order: u8,
    #[serde(default)]
    pub poll_enable_day: bool,
    #[serde(default)]
    pub poll_enable_night: bool,
    #[serde(default)]
    pub command_enable_day: bool,
    #[serde(default)]
    pub command_enable_night: bool,
    #[serde(default)]
    pub reachable_threshold: u8,
    #[serde(default)]
    pub zero_runtime: bool,
    #[serde(default)]
    pub zero_day: bool,
    #[serde(default)]
    pub clear_eventlog: bool,
    #[serde(default)]
    pub yieldday_correction: bool,
    #[serde(default)]
    pub channel: Vec<InverterChannel>,
}

impl InverterConfig {
    pub fn serial_number(&self) -> Option<u64> {
        u64::from_str_radix(&self.serial, 16).ok()
    }

    fn check(&self) -> Result<(), SchemaError> {
        if self.serial.is_empty() || self.serial_number().is_none() {
            return Err(SchemaError::out_of_range(
                "serial",
                "must be a hexadecimal serial number",
            ));
        }
        if self.name.is_empty() {
            return Err(SchemaError::out_of_range("name", "must not be empty"));
        }
        check_max_len("name", &self.name, MAX_NAME_LEN)?;
        if self.channel.len() > MAX_CHANNELS {
            return Err(SchemaError::out_of_range(
                "channel",
                format!("at most {MAX_CHANNELS} channels"),
            ));
        }
        for (index, channel) in self.channel.iter().enumerate() {
            check_max_len(&format!("channel[{index}].name"), &channel.name, MAX_NAME_LEN)?;
        }
        Ok(())
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or a number, got {other}"
        ))),
    }
}

impl ConfigEntity for InverterConfig {
    const KIND: EntityKind = EntityKind::Inverter;

    fn validate(value: Value) -> Result<Self, SchemaError> {
        let record = into_record(ENTITY, value)?;
        let config: Self = decode_settings(ENTITY, record, REQUIRED)?;
        config.check()?;
        Ok(config)
    }

    fn to_document(&self) -> Result<Value, SchemaError> {
        settings_record(ENTITY, self).map(Value::Object)
    }
}
