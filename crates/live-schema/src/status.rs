//! Detailed per-device status documents, each served on its own endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use types::{CellAggregate, LiveValues, MeasuredValue, SchemaError};

use crate::section::{decode_section, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Warning,
    Alarm,
    Other(u8),
}

impl From<u8> for IssueSeverity {
    fn from(level: u8) -> Self {
        match level {
            1 => IssueSeverity::Warning,
            2 => IssueSeverity::Alarm,
            other => IssueSeverity::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatteryIssue {
    pub name: Option<String>,
    pub severity: IssueSeverity,
}

/// Active BMS warnings and alarms: `{ "<name>": 1 | 2 }` or a bare list of levels.
fn issues<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<BatteryIssue>, D::Error> {
    let level = |value: &Value| -> Result<IssueSeverity, D::Error> {
        value
            .as_u64()
            .and_then(|level| u8::try_from(level).ok())
            .map(IssueSeverity::from)
            .ok_or_else(|| serde::de::Error::custom("issue level must be a small integer"))
    };

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Object(entries) => entries
            .iter()
            .map(|(name, value)| {
                Ok::<_, D::Error>(BatteryIssue {
                    name: Some(name.clone()),
                    severity: level(value)?,
                })
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|value| {
                Ok::<_, D::Error>(BatteryIssue {
                    name: None,
                    severity: level(value)?,
                })
            })
            .collect(),
        _ => Err(serde::de::Error::custom(
            "issues must be an object or an array",
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackStatus {
    #[serde(rename = "moduleNumber")]
    pub module_number: u32,
    #[serde(rename = "moduleName", default)]
    pub module_name: String,
    #[serde(rename = "moduleRole", default)]
    pub module_role: Option<String>,
    #[serde(default)]
    pub device_name: String,
    #[serde(rename = "moduleSerialNumber", default)]
    pub serial_number: String,
    #[serde(alias = "swversion", default)]
    pub software_version: String,
    #[serde(default)]
    pub values: LiveValues,
    #[serde(default)]
    pub parameters: LiveValues,
    #[serde(default)]
    pub cell: Option<CellAggregate>,
    #[serde(rename = "tempSensor", default)]
    pub temp_sensors: Vec<MeasuredValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatteryStatus {
    pub manufacturer: String,
    #[serde(default)]
    pub fwversion: Option<String>,
    #[serde(default)]
    pub hwversion: Option<String>,
    pub data_age: u64,
    #[serde(default)]
    pub values: LiveValues,
    #[serde(default, deserialize_with = "issues")]
    pub issues: Vec<BatteryIssue>,
    #[serde(rename = "numberOfPacks", default)]
    pub number_of_packs: Option<u32>,
    #[serde(default)]
    pub packs: Vec<PackStatus>,
}

impl Section for BatteryStatus {
    const NAME: &'static str = "battery_status";
    const REQUIRED: &'static [&'static str] = &["manufacturer", "data_age"];
}

impl BatteryStatus {
    /// Declared pack count, falling back to the packs actually present.
    pub fn pack_count(&self) -> usize {
        self.number_of_packs
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or(self.packs.len())
    }

    pub fn alarms(&self) -> impl Iterator<Item = &BatteryIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Alarm)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HuaweiStatus {
    pub data_age: u64,
    #[serde(rename = "inputValues", default)]
    pub input_values: LiveValues,
    #[serde(rename = "outputValues", default)]
    pub output_values: LiveValues,
    #[serde(default)]
    pub amp_hour: Option<MeasuredValue>,
}

impl Section for HuaweiStatus {
    const NAME: &'static str = "huawei_status";
    const REQUIRED: &'static [&'static str] = &["data_age"];
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeanWellStatus {
    pub data_age: u64,
    #[serde(rename = "manufacturerModelName", default)]
    pub model_name: String,
    /// Charger follows the automatic charge curve.
    #[serde(default)]
    pub automatic: bool,
    #[serde(rename = "inputValues", default)]
    pub input_values: LiveValues,
    /// Output switched on.
    #[serde(default)]
    pub operation: bool,
    /// Charge curve control active.
    #[serde(rename = "cuve", default)]
    pub curve: bool,
    /// Charge status readable.
    #[serde(default)]
    pub stgs: bool,
    #[serde(rename = "outputValues", default)]
    pub output_values: LiveValues,
}

impl Section for MeanWellStatus {
    const NAME: &'static str = "meanwell_status";
    const REQUIRED: &'static [&'static str] = &["data_age"];
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefusolStatus {
    #[serde(rename = "serNo")]
    pub serial_number: String,
    #[serde(rename = "PID", default)]
    pub pid: String,
    #[serde(default)]
    pub firmware: String,
    /// Set by the device once the data is too old to act on.
    #[serde(default)]
    pub age_critical: bool,
    pub data_age: u64,
    #[serde(rename = "deviceValues", default)]
    pub device_values: LiveValues,
    #[serde(rename = "acValues", default)]
    pub ac_values: LiveValues,
    #[serde(rename = "dcValues", default)]
    pub dc_values: LiveValues,
    #[serde(rename = "yieldValues", default)]
    pub yield_values: LiveValues,
}

impl Section for RefusolStatus {
    const NAME: &'static str = "refusol_status";
    const REQUIRED: &'static [&'static str] = &["serNo", "data_age"];
}

pub fn parse_battery_status(bytes: &[u8]) -> Result<BatteryStatus, SchemaError> {
    parse_document(bytes)
}

pub fn parse_huawei_status(bytes: &[u8]) -> Result<HuaweiStatus, SchemaError> {
    parse_document(bytes)
}

pub fn parse_meanwell_status(bytes: &[u8]) -> Result<MeanWellStatus, SchemaError> {
    parse_document(bytes)
}

pub fn parse_refusol_status(bytes: &[u8]) -> Result<RefusolStatus, SchemaError> {
    parse_document(bytes)
}

fn parse_document<T: Section>(bytes: &[u8]) -> Result<T, SchemaError> {
    let value: Value = serde_json::from_slice(bytes)?;
    decode_section(value)
}

/// Cell voltage spread per pack, by module number.
pub fn cell_spread(status: &BatteryStatus) -> BTreeMap<u32, MeasuredValue> {
    status
        .packs
        .iter()
        .filter_map(|pack| {
            let diff = pack.cell.as_ref()?.diff()?;
            Some((pack.module_number, diff))
        })
        .collect()
}
