//! Configuration entities of the device, one per subsystem.
//!
//! Every entity goes through the same pipeline: raw JSON → migration to the
//! current revision → validation into a typed record. Subsystems with
//! interchangeable backends carry exactly one active provider block; the
//! blocks of inactive providers are kept verbatim as dormant data.

mod battery;
mod charger;
mod inverter;
mod meanwell_limit;
mod mqtt;
mod network;
mod power_meter;
mod provider;
mod zero_export;

use serde_json::Value;
use tracing::{debug, info};

use types::{EntityKind, SchemaError};

pub use battery::{
    BatteryConfig, BatteryProvider, BatteryProviderKind, BatterySettings, JkBmsSettings,
    MqttBatterySettings, ZendureSettings,
};
pub use charger::{AcChargerConfig, Charger, ChargerKind, ChargerSettings, HuaweiSettings, MeanWellSettings};
pub use inverter::{InverterChannel, InverterConfig};
pub use meanwell_limit::MeanWellLimitConfig;
pub use mqtt::MqttConfig;
pub use network::NetworkConfig;
pub use power_meter::{
    HttpJsonSettings, HttpJsonValue, HttpSmlSettings, MqttMeterSettings, MqttMeterValue,
    PowerMeterConfig, PowerMeterSettings, PowerMeterSource, PowerMeterSourceKind,
    SerialSdmSettings,
};
pub use provider::{ProviderBlock, ProviderKind};
pub use zero_export::ZeroExportConfig;

/// A configuration entity that can be validated from, and written back to, its wire record.
pub trait ConfigEntity: Sized {
    const KIND: EntityKind;

    /// Rejects a stored discriminator outside the entity's provider set.
    /// Runs on the raw record, before any migration step.
    fn check_discriminator(_value: &Value) -> Result<(), SchemaError> {
        Ok(())
    }

    /// Validates a record that is already in the current revision.
    fn validate(value: Value) -> Result<Self, SchemaError>;

    fn to_document(&self) -> Result<Value, SchemaError>;
}

/// Parses, migrates and validates one stored or submitted record.
///
/// Either the whole record is accepted or an error is returned; nothing is
/// partially applied.
pub fn load<E: ConfigEntity>(bytes: &[u8]) -> Result<E, SchemaError> {
    let value: Value = serde_json::from_slice(bytes)?;
    load_value(value)
}

pub fn load_value<E: ConfigEntity>(value: Value) -> Result<E, SchemaError> {
    E::check_discriminator(&value)?;
    let migrated = migration::migrate(E::KIND, value)?;
    if migrated.applied.is_empty() {
        debug!(entity = %E::KIND, "record already current");
    } else {
        info!(entity = %E::KIND, steps = ?migrated.applied, "record migrated");
    }
    E::validate(Value::Object(migrated.record))
}

/// Any configuration entity, for callers that pick the entity at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyConfig {
    Battery(BatteryConfig),
    AcCharger(AcChargerConfig),
    PowerMeter(PowerMeterConfig),
    Inverter(InverterConfig),
    Network(NetworkConfig),
    Mqtt(MqttConfig),
    ZeroExport(ZeroExportConfig),
    MeanWellLimit(MeanWellLimitConfig),
}

impl AnyConfig {
    pub fn load(kind: EntityKind, bytes: &[u8]) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::load_value(kind, value)
    }

    pub fn load_value(kind: EntityKind, value: Value) -> Result<Self, SchemaError> {
        Ok(match kind {
            EntityKind::Battery => AnyConfig::Battery(load_value(value)?),
            EntityKind::AcCharger => AnyConfig::AcCharger(load_value(value)?),
            EntityKind::PowerMeter => AnyConfig::PowerMeter(load_value(value)?),
            EntityKind::Inverter => AnyConfig::Inverter(load_value(value)?),
            EntityKind::Network => AnyConfig::Network(load_value(value)?),
            EntityKind::Mqtt => AnyConfig::Mqtt(load_value(value)?),
            EntityKind::ZeroExport => AnyConfig::ZeroExport(load_value(value)?),
            EntityKind::MeanWellLimit => AnyConfig::MeanWellLimit(load_value(value)?),
        })
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            AnyConfig::Battery(_) => EntityKind::Battery,
            AnyConfig::AcCharger(_) => EntityKind::AcCharger,
            AnyConfig::PowerMeter(_) => EntityKind::PowerMeter,
            AnyConfig::Inverter(_) => EntityKind::Inverter,
            AnyConfig::Network(_) => EntityKind::Network,
            AnyConfig::Mqtt(_) => EntityKind::Mqtt,
            AnyConfig::ZeroExport(_) => EntityKind::ZeroExport,
            AnyConfig::MeanWellLimit(_) => EntityKind::MeanWellLimit,
        }
    }

    pub fn to_document(&self) -> Result<Value, SchemaError> {
        match self {
            AnyConfig::Battery(config) => config.to_document(),
            AnyConfig::AcCharger(config) => config.to_document(),
            AnyConfig::PowerMeter(config) => config.to_document(),
            AnyConfig::Inverter(config) => config.to_document(),
            AnyConfig::Network(config) => config.to_document(),
            AnyConfig::Mqtt(config) => config.to_document(),
            AnyConfig::ZeroExport(config) => config.to_document(),
            AnyConfig::MeanWellLimit(config) => config.to_document(),
        }
    }
}
