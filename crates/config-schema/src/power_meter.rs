use serde::{Deserialize, Serialize};
use serde_json::Value;

use types::{into_record, EntityKind, Record, SchemaError};

use crate::provider::{
    active_block, block_entry, check_non_empty, check_nonzero, check_stored_discriminator,
    decode_settings, settings_record, take_dormant, ProviderBlock, ProviderKind,
};
use crate::ConfigEntity;

const ENTITY: &str = "power_meter";

const REQUIRED: &[&str] = &["enabled", "updatesonly", "verbose_logging"];

/// One reading per phase at most.
const MAX_PHASES: usize = 3;

/// kW, W, mW.
const MAX_POWER_UNIT: u8 = 2;

/// None, basic, digest.
const MAX_AUTH_TYPE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMeterSourceKind {
    Mqtt,
    SdmSinglePhase,
    SdmThreePhase,
    HttpJson,
    SerialSml,
    SmaHm2,
    HttpSml,
}

impl ProviderKind for PowerMeterSourceKind {
    const FIELD: &'static str = "source";
    const NUMERIC: bool = true;

    fn all() -> &'static [Self] {
        &[
            Self::Mqtt,
            Self::SdmSinglePhase,
            Self::SdmThreePhase,
            Self::HttpJson,
            Self::SerialSml,
            Self::SmaHm2,
            Self::HttpSml,
        ]
    }

    fn code(self) -> u8 {
        match self {
            Self::Mqtt => 0,
            Self::SdmSinglePhase => 1,
            Self::SdmThreePhase => 2,
            Self::HttpJson => 3,
            Self::SerialSml => 4,
            Self::SmaHm2 => 5,
            Self::HttpSml => 6,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Mqtt => "Mqtt",
            Self::SdmSinglePhase => "SdmSinglePhase",
            Self::SdmThreePhase => "SdmThreePhase",
            Self::HttpJson => "HttpJson",
            Self::SerialSml => "SerialSml",
            Self::SmaHm2 => "SmaHm2",
            Self::HttpSml => "HttpSml",
        }
    }

    fn block(self) -> Option<&'static str> {
        match self {
            Self::Mqtt => Some(MqttMeterSettings::NAME),
            Self::SdmSinglePhase | Self::SdmThreePhase => Some(SerialSdmSettings::NAME),
            Self::HttpJson => Some(HttpJsonSettings::NAME),
            Self::HttpSml => Some(HttpSmlSettings::NAME),
            Self::SerialSml | Self::SmaHm2 => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerMeterSettings {
    pub enabled: bool,
    pub updatesonly: bool,
    pub verbose_logging: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttMeterValue {
    pub topic: String,
    #[serde(default)]
    pub json_path: String,
    pub unit: u8,
    #[serde(default)]
    pub sign_inverted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttMeterSettings {
    pub values: Vec<MqttMeterValue>,
}

impl ProviderBlock for MqttMeterSettings {
    const NAME: &'static str = "mqtt";
    const REQUIRED: &'static [&'static str] = &["values"];

    fn check(&self) -> Result<(), SchemaError> {
        check_phase_count(Self::NAME, self.values.len())?;
        for (index, value) in self.values.iter().enumerate() {
            check_non_empty(Self::NAME, &format!("values[{index}].topic"), &value.topic)?;
            check_unit(&format!("mqtt.values[{index}].unit"), value.unit)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSdmSettings {
    pub baudrate: u32,
    pub address: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u32>,
}

impl ProviderBlock for SerialSdmSettings {
    const NAME: &'static str = "serial_sdm";
    const REQUIRED: &'static [&'static str] = &["baudrate", "address"];

    fn check(&self) -> Result<(), SchemaError> {
        check_nonzero("serial_sdm.baudrate", u64::from(self.baudrate))?;
        check_polling_interval("serial_sdm.polling_interval", self.polling_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpJsonValue {
    pub enabled: bool,
    pub url: String,
    /// 0 none, 1 basic, 2 digest.
    pub auth_type: u8,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub header_key: String,
    #[serde(default)]
    pub header_value: String,
    /// Milliseconds.
    pub timeout: u32,
    pub json_path: String,
    pub unit: u8,
    #[serde(default)]
    pub sign_inverted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpJsonSettings {
    pub individual_requests: bool,
    pub values: Vec<HttpJsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u32>,
}

impl ProviderBlock for HttpJsonSettings {
    const NAME: &'static str = "http_json";
    const REQUIRED: &'static [&'static str] = &["individual_requests", "values"];

    /// The first value always describes a request. Later values only do when
    /// they are enabled and requested individually; otherwise they just pick
    /// another path out of the first response.
    fn check(&self) -> Result<(), SchemaError> {
        check_phase_count(Self::NAME, self.values.len())?;
        check_polling_interval("http_json.polling_interval", self.polling_interval)?;

        for (index, value) in self.values.iter().enumerate() {
            if index > 0 && !value.enabled {
                continue;
            }
            let field = |name: &str| format!("http_json.values[{index}].{name}");

            if index == 0 || self.individual_requests {
                check_request(
                    &field,
                    &value.url,
                    value.auth_type,
                    &value.username,
                    &value.password,
                    value.timeout,
                )?;
                check_unit(&field("unit"), value.unit)?;
            }
            check_non_empty(Self::NAME, &format!("values[{index}].json_path"), &value.json_path)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSmlSettings {
    pub url: String,
    #[serde(default)]
    pub auth_type: u8,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub timeout: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u32>,
}

impl ProviderBlock for HttpSmlSettings {
    const NAME: &'static str = "http_sml";
    const REQUIRED: &'static [&'static str] = &["url", "timeout"];

    fn check(&self) -> Result<(), SchemaError> {
        check_polling_interval("http_sml.polling_interval", self.polling_interval)?;
        check_request(
            &|name: &str| format!("http_sml.{name}"),
            &self.url,
            self.auth_type,
            &self.username,
            &self.password,
            self.timeout,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PowerMeterSource {
    Mqtt(MqttMeterSettings),
    SdmSinglePhase(SerialSdmSettings),
    SdmThreePhase(SerialSdmSettings),
    HttpJson(HttpJsonSettings),
    SerialSml,
    SmaHm2,
    HttpSml(HttpSmlSettings),
}

impl PowerMeterSource {
    pub fn kind(&self) -> PowerMeterSourceKind {
        match self {
            Self::Mqtt(_) => PowerMeterSourceKind::Mqtt,
            Self::SdmSinglePhase(_) => PowerMeterSourceKind::SdmSinglePhase,
            Self::SdmThreePhase(_) => PowerMeterSourceKind::SdmThreePhase,
            Self::HttpJson(_) => PowerMeterSourceKind::HttpJson,
            Self::SerialSml => PowerMeterSourceKind::SerialSml,
            Self::SmaHm2 => PowerMeterSourceKind::SmaHm2,
            Self::HttpSml(_) => PowerMeterSourceKind::HttpSml,
        }
    }

    fn from_record(kind: PowerMeterSourceKind, record: &mut Record) -> Result<Self, SchemaError> {
        Ok(match kind {
            PowerMeterSourceKind::Mqtt => Self::Mqtt(active_block(record)?),
            PowerMeterSourceKind::SdmSinglePhase => Self::SdmSinglePhase(active_block(record)?),
            PowerMeterSourceKind::SdmThreePhase => Self::SdmThreePhase(active_block(record)?),
            PowerMeterSourceKind::HttpJson => Self::HttpJson(active_block(record)?),
            PowerMeterSourceKind::SerialSml => Self::SerialSml,
            PowerMeterSourceKind::SmaHm2 => Self::SmaHm2,
            PowerMeterSourceKind::HttpSml => Self::HttpSml(active_block(record)?),
        })
    }

    fn block_entry(&self) -> Result<Option<(String, Value)>, SchemaError> {
        match self {
            Self::Mqtt(block) => block_entry(block).map(Some),
            Self::SdmSinglePhase(block) | Self::SdmThreePhase(block) => {
                block_entry(block).map(Some)
            }
            Self::HttpJson(block) => block_entry(block).map(Some),
            Self::HttpSml(block) => block_entry(block).map(Some),
            Self::SerialSml | Self::SmaHm2 => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerMeterConfig {
    pub settings: PowerMeterSettings,
    pub source: PowerMeterSource,
    pub dormant: Record,
}

impl ConfigEntity for PowerMeterConfig {
    const KIND: EntityKind = EntityKind::PowerMeter;

    fn check_discriminator(value: &Value) -> Result<(), SchemaError> {
        check_stored_discriminator::<PowerMeterSourceKind>(ENTITY, value)
    }

    fn validate(value: Value) -> Result<Self, SchemaError> {
        let mut record = into_record(ENTITY, value)?;
        let kind = PowerMeterSourceKind::parse(ENTITY, record.get(PowerMeterSourceKind::FIELD))?;
        record.remove(PowerMeterSourceKind::FIELD);

        types::require_fields(ENTITY, &record, REQUIRED)?;
        let source = PowerMeterSource::from_record(kind, &mut record)?;
        let dormant = take_dormant(&mut record, kind);
        let settings = decode_settings(ENTITY, record, REQUIRED)?;

        Ok(Self {
            settings,
            source,
            dormant,
        })
    }

    fn to_document(&self) -> Result<Value, SchemaError> {
        let mut record = settings_record(ENTITY, &self.settings)?;
        record.insert(
            PowerMeterSourceKind::FIELD.to_string(),
            self.source.kind().to_wire(),
        );
        if let Some((name, block)) = self.source.block_entry()? {
            record.insert(name, block);
        }
        record.extend(self.dormant.clone());
        Ok(Value::Object(record))
    }
}

fn check_phase_count(block: &str, count: usize) -> Result<(), SchemaError> {
    if count == 0 {
        return Err(SchemaError::incomplete(block, "`values` must not be empty"));
    }
    if count > MAX_PHASES {
        return Err(SchemaError::out_of_range(
            format!("{block}.values"),
            format!("at most {MAX_PHASES} values"),
        ));
    }
    Ok(())
}

fn check_unit(field: &str, unit: u8) -> Result<(), SchemaError> {
    if unit > MAX_POWER_UNIT {
        return Err(SchemaError::out_of_range(
            field,
            "must be 0 (kW), 1 (W) or 2 (mW)",
        ));
    }
    Ok(())
}

fn check_polling_interval(field: &str, interval: Option<u32>) -> Result<(), SchemaError> {
    match interval {
        Some(interval) => check_nonzero(field, u64::from(interval)),
        None => Ok(()),
    }
}

fn check_request(
    field: &dyn Fn(&str) -> String,
    url: &str,
    auth_type: u8,
    username: &str,
    password: &str,
    timeout: u32,
) -> Result<(), SchemaError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(SchemaError::out_of_range(
            field("url"),
            "must start with http:// or https://",
        ));
    }
    if auth_type > MAX_AUTH_TYPE {
        return Err(SchemaError::out_of_range(
            field("auth_type"),
            "must be 0 (none), 1 (basic) or 2 (digest)",
        ));
    }
    if auth_type != 0 && (username.is_empty() || password.is_empty()) {
        return Err(SchemaError::out_of_range(
            field("username"),
            "username and password are required with authentication",
        ));
    }
    if timeout == 0 {
        return Err(SchemaError::out_of_range(
            field("timeout"),
            "must be greater than 0 ms",
        ));
    }
    Ok(())
}
