use serde::{Deserialize, Serialize};
use serde_json::Value;

use types::{into_record, EntityKind, Record, SchemaError};

use crate::provider::{
    active_block, block_entry, check_non_empty, check_nonzero, check_stored_discriminator,
    decode_settings, settings_record, take_dormant, ProviderBlock, ProviderKind,
};
use crate::ConfigEntity;

const ENTITY: &str = "battery";

const REQUIRED: &[&str] = &[
    "enabled",
    "numberOfBatteries",
    "pollinterval",
    "updatesonly",
    "verbose_logging",
    "min_charge_temp",
    "max_charge_temp",
    "min_discharge_temp",
    "max_discharge_temp",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryProviderKind {
    PylontechRs485,
    PylontechCan,
    PylontechMcp2515,
    JkBms,
    VictronSmartShunt,
    DalyBms,
    Mqtt,
    Zendure,
}

impl ProviderKind for BatteryProviderKind {
    const FIELD: &'static str = "provider";
    const NUMERIC: bool = true;

    fn all() -> &'static [Self] {
        &[
            Self::PylontechRs485,
            Self::PylontechCan,
            Self::PylontechMcp2515,
            Self::JkBms,
            Self::VictronSmartShunt,
            Self::DalyBms,
            Self::Mqtt,
            Self::Zendure,
        ]
    }

    fn code(self) -> u8 {
        match self {
            Self::PylontechRs485 => 0,
            Self::PylontechCan => 1,
            Self::PylontechMcp2515 => 2,
            Self::JkBms => 3,
            Self::VictronSmartShunt => 4,
            Self::DalyBms => 5,
            Self::Mqtt => 6,
            Self::Zendure => 7,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::PylontechRs485 => "PylontechRs485",
            Self::PylontechCan => "PylontechCan",
            Self::PylontechMcp2515 => "PylontechMcp2515",
            Self::JkBms => "JkBms",
            Self::VictronSmartShunt => "VictronSmartShunt",
            Self::DalyBms => "DalyBms",
            Self::Mqtt => "Mqtt",
            Self::Zendure => "Zendure",
        }
    }

    fn block(self) -> Option<&'static str> {
        match self {
            Self::JkBms => Some(JkBmsSettings::NAME),
            Self::Mqtt => Some(MqttBatterySettings::NAME),
            Self::Zendure => Some(ZendureSettings::NAME),
            _ => None,
        }
    }
}

/// Fields shared by every battery provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterySettings {
    pub enabled: bool,
    #[serde(rename = "numberOfBatteries")]
    pub number_of_batteries: u8,
    pub pollinterval: u32,
    pub updatesonly: bool,
    pub verbose_logging: bool,
    pub min_charge_temp: i8,
    pub max_charge_temp: i8,
    pub min_discharge_temp: i8,
    pub max_discharge_temp: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_controller_frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_charging_soc: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_charge_voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_discharge_voltage: Option<f64>,
}

impl BatterySettings {
    fn check(&self) -> Result<(), SchemaError> {
        check_nonzero("pollinterval", u64::from(self.pollinterval))?;
        SchemaError::check_order(
            "min_charge_temp",
            self.min_charge_temp,
            "max_charge_temp",
            self.max_charge_temp,
        )?;
        SchemaError::check_order(
            "min_discharge_temp",
            self.min_discharge_temp,
            "max_discharge_temp",
            self.max_discharge_temp,
        )?;
        if let Some(soc) = self.stop_charging_soc {
            if soc > 100 {
                return Err(SchemaError::out_of_range(
                    "stop_charging_soc",
                    "must be a percentage (0..=100)",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JkBmsSettings {
    pub interface: u8,
    pub polling_interval: u32,
}

impl ProviderBlock for JkBmsSettings {
    const NAME: &'static str = "jkbms";
    const REQUIRED: &'static [&'static str] = &["interface", "polling_interval"];

    fn check(&self) -> Result<(), SchemaError> {
        check_nonzero("jkbms.polling_interval", u64::from(self.polling_interval))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttBatterySettings {
    pub soc_topic: String,
    #[serde(default)]
    pub soc_json_path: String,
    #[serde(default)]
    pub voltage_topic: String,
    #[serde(default)]
    pub voltage_json_path: String,
    /// 0 V, 1 dV, 2 cV, 3 mV.
    #[serde(default)]
    pub voltage_unit: u8,
}

impl ProviderBlock for MqttBatterySettings {
    const NAME: &'static str = "mqtt";
    const REQUIRED: &'static [&'static str] = &["soc_topic"];

    fn check(&self) -> Result<(), SchemaError> {
        check_non_empty(Self::NAME, "soc_topic", &self.soc_topic)?;
        if self.voltage_unit > 3 {
            return Err(SchemaError::out_of_range(
                "mqtt.voltage_unit",
                "must be one of 0 (V), 1 (dV), 2 (cV), 3 (mV)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZendureSettings {
    /// 0 HUB1200, 1 HUB2000, 2 AIO2400, 3 ACE1500, 4 HYPER2000.
    pub device_type: u8,
    pub device_serial: String,
    pub polling_interval: u32,
    pub min_soc: u8,
    pub max_soc: u8,
    /// 0 automatic, 1 always off, 2 always on.
    pub bypass_mode: u8,
    pub max_output: u16,
}

impl ProviderBlock for ZendureSettings {
    const NAME: &'static str = "zendure";
    const REQUIRED: &'static [&'static str] = &[
        "device_type",
        "device_serial",
        "polling_interval",
        "min_soc",
        "max_soc",
        "bypass_mode",
        "max_output",
    ];

    fn check(&self) -> Result<(), SchemaError> {
        check_non_empty(Self::NAME, "device_serial", &self.device_serial)?;
        check_nonzero("zendure.polling_interval", u64::from(self.polling_interval))?;
        if self.device_type > 4 {
            return Err(SchemaError::out_of_range(
                "zendure.device_type",
                "unknown device type",
            ));
        }
        if self.bypass_mode > 2 {
            return Err(SchemaError::out_of_range(
                "zendure.bypass_mode",
                "must be 0 (automatic), 1 (always off) or 2 (always on)",
            ));
        }
        if self.max_soc > 100 {
            return Err(SchemaError::out_of_range(
                "zendure.max_soc",
                "must be a percentage (0..=100)",
            ));
        }
        SchemaError::check_order("zendure.min_soc", self.min_soc, "zendure.max_soc", self.max_soc)
    }
}

/// The active battery backend with only its own settings.
#[derive(Debug, Clone, PartialEq)]
pub enum BatteryProvider {
    PylontechRs485,
    PylontechCan,
    PylontechMcp2515,
    JkBms(JkBmsSettings),
    VictronSmartShunt,
    DalyBms,
    Mqtt(MqttBatterySettings),
    Zendure(ZendureSettings),
}

impl BatteryProvider {
    pub fn kind(&self) -> BatteryProviderKind {
        match self {
            Self::PylontechRs485 => BatteryProviderKind::PylontechRs485,
            Self::PylontechCan => BatteryProviderKind::PylontechCan,
            Self::PylontechMcp2515 => BatteryProviderKind::PylontechMcp2515,
            Self::JkBms(_) => BatteryProviderKind::JkBms,
            Self::VictronSmartShunt => BatteryProviderKind::VictronSmartShunt,
            Self::DalyBms => BatteryProviderKind::DalyBms,
            Self::Mqtt(_) => BatteryProviderKind::Mqtt,
            Self::Zendure(_) => BatteryProviderKind::Zendure,
        }
    }

    fn from_record(kind: BatteryProviderKind, record: &mut Record) -> Result<Self, SchemaError> {
        Ok(match kind {
            BatteryProviderKind::PylontechRs485 => Self::PylontechRs485,
            BatteryProviderKind::PylontechCan => Self::PylontechCan,
            BatteryProviderKind::PylontechMcp2515 => Self::PylontechMcp2515,
            BatteryProviderKind::JkBms => Self::JkBms(active_block(record)?),
            BatteryProviderKind::VictronSmartShunt => Self::VictronSmartShunt,
            BatteryProviderKind::DalyBms => Self::DalyBms,
            BatteryProviderKind::Mqtt => Self::Mqtt(active_block(record)?),
            BatteryProviderKind::Zendure => Self::Zendure(active_block(record)?),
        })
    }

    fn block_entry(&self) -> Result<Option<(String, Value)>, SchemaError> {
        match self {
            Self::JkBms(block) => block_entry(block).map(Some),
            Self::Mqtt(block) => block_entry(block).map(Some),
            Self::Zendure(block) => block_entry(block).map(Some),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatteryConfig {
    pub settings: BatterySettings,
    pub provider: BatteryProvider,
    /// Blocks of inactive providers, kept as stored.
    pub dormant: Record,
}

impl ConfigEntity for BatteryConfig {
    const KIND: EntityKind = EntityKind::Battery;

    fn check_discriminator(value: &Value) -> Result<(), SchemaError> {
        check_stored_discriminator::<BatteryProviderKind>(ENTITY, value)
    }

    fn validate(value: Value) -> Result<Self, SchemaError> {
        let mut record = into_record(ENTITY, value)?;
        let kind = BatteryProviderKind::parse(ENTITY, record.get(BatteryProviderKind::FIELD))?;
        record.remove(BatteryProviderKind::FIELD);

        types::require_fields(ENTITY, &record, REQUIRED)?;
        let provider = BatteryProvider::from_record(kind, &mut record)?;
        let dormant = take_dormant(&mut record, kind);

        let settings: BatterySettings = decode_settings(ENTITY, record, REQUIRED)?;
        settings.check()?;

        Ok(Self {
            settings,
            provider,
            dormant,
        })
    }

    fn to_document(&self) -> Result<Value, SchemaError> {
        let mut record = settings_record(ENTITY, &self.settings)?;
        record.insert(
            BatteryProviderKind::FIELD.to_string(),
            self.provider.kind().to_wire(),
        );
        if let Some((name, block)) = self.provider.block_entry()? {
            record.insert(name, block);
        }
        record.extend(self.dormant.clone());
        Ok(Value::Object(record))
    }
}
