use serde::{Deserialize, Serialize};
use serde_json::Value;

use types::{into_record, EntityKind, SchemaError};

use crate::provider::{check_nonzero, decode_settings, settings_record};
use crate::ConfigEntity;

const ENTITY: &str = "zero_export";

const REQUIRED: &[&str] = &[
    "enabled",
    "updatesonly",
    "verbose_logging",
    "InverterId",
    "MaxGrid",
    "PowerHysteresis",
    "MinimumLimit",
    "Tn",
];

/// Regulation of the inverter limit so that grid export stays near zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroExportConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pollinterval: Option<u32>,
    pub updatesonly: bool,
    pub verbose_logging: bool,
    /// Bit mask over the registered inverters.
    #[serde(rename = "InverterId")]
    pub inverter_mask: u16,
    /// Watts.
    #[serde(rename = "MaxGrid")]
    pub max_grid: u16,
    /// Percent.
    #[serde(rename = "PowerHysteresis")]
    pub power_hysteresis: u16,
    /// Percent.
    #[serde(rename = "MinimumLimit")]
    pub minimum_limit: u16,
    /// Integral time, seconds.
    #[serde(rename = "Tn")]
    pub tn: u16,
}

impl ZeroExportConfig {
    pub fn controls_inverter(&self, index: u8) -> bool {
        index < 16 && self.inverter_mask & (1 << index) != 0
    }

    fn check(&self) -> Result<(), SchemaError> {
        if let Some(interval) = self.pollinterval {
            check_nonzero("pollinterval", u64::from(interval))?;
        }
        for (field, percent) in [
            ("PowerHysteresis", self.power_hysteresis),
            ("MinimumLimit", self.minimum_limit),
        ] {
            if percent > 100 {
                return Err(SchemaError::out_of_range(field, "must be a percentage (0..=100)"));
            }
        }
        check_nonzero("Tn", u64::from(self.tn))
    }
}

impl ConfigEntity for ZeroExportConfig {
    const KIND: EntityKind = EntityKind::ZeroExport;

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
