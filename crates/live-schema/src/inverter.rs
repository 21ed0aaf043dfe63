use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use types::{MeasuredValue, SchemaError};

use crate::section::Section;

/// Readings of one channel, keyed by field name (`Power`, `Voltage`, `YieldDay`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStats {
    /// User label of a DC string, carried on the wire as `{"u": "<label>"}`.
    pub name: Option<String>,
    pub fields: BTreeMap<String, MeasuredValue>,
}

impl ChannelStats {
    pub fn from_json(raw: &Value) -> Result<Self, SchemaError> {
        let object = raw
            .as_object()
            .ok_or_else(|| SchemaError::mismatch("channel", "expected a JSON object"))?;

        let mut stats = ChannelStats::default();
        for (key, value) in object {
            if key == "name" {
                stats.name = value
                    .get("u")
                    .and_then(Value::as_str)
                    .or_else(|| value.as_str())
                    .map(str::to_string);
                continue;
            }
            stats.fields.insert(key.clone(), MeasuredValue::from_json(value)?);
        }
        Ok(stats)
    }

    pub fn get(&self, field: &str) -> Option<&MeasuredValue> {
        self.fields.get(field)
    }
}

/// Channels of one type (AC, DC or INV), keyed by channel number.
///
/// Accepted as an object keyed by the number or as an array indexed by it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channels(pub BTreeMap<u8, ChannelStats>);

impl Channels {
    pub fn from_json(field: &str, raw: &Value) -> Result<Self, SchemaError> {
        let mut channels = BTreeMap::new();
        match raw {
            Value::Object(entries) => {
                for (key, value) in entries {
                    let number = key.parse::<u8>().map_err(|_| {
                        SchemaError::mismatch(field, format!("channel key `{key}` is not a number"))
                    })?;
                    channels.insert(number, ChannelStats::from_json(value)?);
                }
            }
            Value::Array(items) => {
                for (index, value) in items.iter().enumerate() {
                    let number = u8::try_from(index)
                        .map_err(|_| SchemaError::mismatch(field, "too many channels"))?;
                    channels.insert(number, ChannelStats::from_json(value)?);
                }
            }
            _ => {
                return Err(SchemaError::mismatch(
                    field,
                    "expected an object or an array of channels",
                ))
            }
        }
        Ok(Channels(channels))
    }

    pub fn get(&self, channel: u8) -> Option<&ChannelStats> {
        self.0.get(&channel)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u8, &ChannelStats)> {
        self.0.iter()
    }
}

/// Point-in-time view of one inverter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InverterStatus {
    pub serial: String,
    pub name: String,
    #[serde(default)]
    pub order: u32,
    /// Seconds since the last successful poll.
    pub data_age: u64,
    #[serde(default)]
    pub poll_enabled: bool,
    pub reachable: bool,
    pub producing: bool,
    /// Percent of the nominal power.
    #[serde(default)]
    pub limit_relative: f64,
    /// Watts; the device reports -1 while the nominal power is unknown.
    #[serde(default, deserialize_with = "unknown_if_negative_f64")]
    pub limit_absolute: Option<f64>,
    /// Event log entries; -1 while the log has not been read.
    #[serde(default, deserialize_with = "unknown_if_negative_u32")]
    pub events: Option<u32>,
    #[serde(rename = "AC", default, deserialize_with = "ac_channels")]
    pub ac: Channels,
    #[serde(rename = "DC", default, deserialize_with = "dc_channels")]
    pub dc: Channels,
    #[serde(rename = "INV", default, deserialize_with = "inv_channels")]
    pub inv: Channels,
}

impl Section for InverterStatus {
    const NAME: &'static str = "inverter";
    const REQUIRED: &'static [&'static str] = &["serial", "name", "data_age", "reachable", "producing"];
}

impl InverterStatus {
    /// AC output power summed over all AC channels.
    pub fn ac_power(&self) -> Option<f64> {
        let readings: Vec<f64> = self
            .ac
            .iter()
            .filter_map(|(_, channel)| channel.get("Power"))
            .map(|power| power.value)
            .collect();
        (!readings.is_empty()).then(|| readings.iter().sum())
    }
}

fn unknown_if_negative_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|value| *value >= 0.0))
}

fn unknown_if_negative_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.and_then(|value| u32::try_from(value).ok()))
}

fn channels<'de, D: Deserializer<'de>>(field: &str, deserializer: D) -> Result<Channels, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Channels::from_json(field, &raw).map_err(serde::de::Error::custom)
}

fn ac_channels<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Channels, D::Error> {
    channels("AC", deserializer)
}

fn dc_channels<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Channels, D::Error> {
    channels("DC", deserializer)
}

fn inv_channels<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Channels, D::Error> {
    channels("INV", deserializer)
}
