use serde::{Deserialize, Serialize};
use serde_json::Value;

use types::{into_record, EntityKind, Record, SchemaError};

use crate::provider::{
    active_block, block_entry, check_nonzero, check_stored_discriminator, decode_settings,
    settings_record, take_dormant, ProviderBlock, ProviderKind,
};
use crate::ConfigEntity;

const ENTITY: &str = "ac_charger";

const REQUIRED: &[&str] = &["enabled", "updatesonly", "verbose_logging"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerKind {
    Meanwell,
    Huawei,
}

impl ProviderKind for ChargerKind {
    const FIELD: &'static str = "chargerType";
    const NUMERIC: bool = false;

    fn all() -> &'static [Self] {
        &[Self::Meanwell, Self::Huawei]
    }

    fn code(self) -> u8 {
        match self {
            Self::Meanwell => 0,
            Self::Huawei => 1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Meanwell => "Meanwell",
            Self::Huawei => "Huawei",
        }
    }

    fn block(self) -> Option<&'static str> {
        match self {
            Self::Meanwell => Some(MeanWellSettings::NAME),
            Self::Huawei => Some(HuaweiSettings::NAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargerSettings {
    pub enabled: bool,
    pub updatesonly: bool,
    pub verbose_logging: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_controller_frequency: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanWellSettings {
    pub pollinterval: u32,
    pub min_voltage: f64,
    pub max_voltage: f64,
    pub min_current: f64,
    pub max_current: f64,
    pub hysteresis: f64,
    #[serde(rename = "EEPROMwrites")]
    pub eeprom_writes: u32,
    #[serde(rename = "mustInverterProduce")]
    pub must_inverter_produce: bool,
}

impl ProviderBlock for MeanWellSettings {
    const NAME: &'static str = "meanwell";
    const REQUIRED: &'static [&'static str] = &[
        "pollinterval",
        "min_voltage",
        "max_voltage",
        "min_current",
        "max_current",
        "hysteresis",
        "EEPROMwrites",
        "mustInverterProduce",
    ];

    fn check(&self) -> Result<(), SchemaError> {
        check_nonzero("meanwell.pollinterval", u64::from(self.pollinterval))?;
        SchemaError::check_order(
            "min_voltage",
            self.min_voltage,
            "max_voltage",
            self.max_voltage,
        )?;
        SchemaError::check_order(
            "min_current",
            self.min_current,
            "max_current",
            self.max_current,
        )?;
        if self.hysteresis < 0.0 {
            return Err(SchemaError::out_of_range(
                "meanwell.hysteresis",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuaweiSettings {
    pub auto_power_enabled: bool,
    pub voltage_limit: f64,
    pub enable_voltage_limit: f64,
    pub lower_power_limit: f64,
    pub upper_power_limit: f64,
}

impl ProviderBlock for HuaweiSettings {
    const NAME: &'static str = "huawei";
    const REQUIRED: &'static [&'static str] = &[
        "auto_power_enabled",
        "voltage_limit",
        "enable_voltage_limit",
        "lower_power_limit",
        "upper_power_limit",
    ];

    fn check(&self) -> Result<(), SchemaError> {
        SchemaError::check_order(
            "lower_power_limit",
            self.lower_power_limit,
            "upper_power_limit",
            self.upper_power_limit,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Charger {
    Meanwell(MeanWellSettings),
    Huawei(HuaweiSettings),
}

impl Charger {
    pub fn kind(&self) -> ChargerKind {
        match self {
            Self::Meanwell(_) => ChargerKind::Meanwell,
            Self::Huawei(_) => ChargerKind::Huawei,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcChargerConfig {
    pub settings: ChargerSettings,
    pub charger: Charger,
    pub dormant: Record,
}

impl ConfigEntity for AcChargerConfig {
    const KIND: EntityKind = EntityKind::AcCharger;

    fn check_discriminator(value: &Value) -> Result<(), SchemaError> {
        check_stored_discriminator::<ChargerKind>(ENTITY, value)
    }

    fn validate(value: Value) -> Result<Self, SchemaError> {
        let mut record = into_record(ENTITY, value)?;
        let kind = ChargerKind::parse(ENTITY, record.get(ChargerKind::FIELD))?;
        record.remove(ChargerKind::FIELD);

        types::require_fields(ENTITY, &record, REQUIRED)?;
        let charger = match kind {
            ChargerKind::Meanwell => Charger::Meanwell(active_block(&mut record)?),
            ChargerKind::Huawei => Charger::Huawei(active_block(&mut record)?),
        };
        let dormant = take_dormant(&mut record, kind);
        let settings = decode_settings(ENTITY, record, REQUIRED)?;

        Ok(Self {
            settings,
            charger,
            dormant,
        })
    }

    fn to_document(&self) -> Result<Value, SchemaError> {
        let mut record = settings_record(ENTITY, &self.settings)?;
        record.insert(ChargerKind::FIELD.to_string(), self.charger.kind().to_wire());
        let (name, block) = match &self.charger {
            Charger::Meanwell(block) => block_entry(block)?,
            Charger::Huawei(block) => block_entry(block)?,
        };
        record.insert(name, block);
        record.extend(self.dormant.clone());
        Ok(Value::Object(record))
    }
}
