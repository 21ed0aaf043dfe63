use serde::{Deserialize, Serialize};
use serde_json::Value;

use types::{into_record, EntityKind, SchemaError};

use crate::provider::{decode_settings, settings_record};
use crate::ConfigEntity;

const ENTITY: &str = "meanwell_limit";

/// A one-off limit request for the Meanwell charger.
///
/// Each setpoint only takes effect when its `*Valid` flag is set; absent
/// setpoints read as not requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanWellLimitConfig {
    #[serde(default)]
    pub voltage: f64,
    #[serde(default, rename = "voltageValid")]
    pub voltage_valid: bool,
    #[serde(default)]
    pub current: f64,
    #[serde(default, rename = "currentValid")]
    pub current_valid: bool,
    #[serde(default, rename = "curveCV")]
    pub curve_cv: f64,
    #[serde(default, rename = "curveCVvalid")]
    pub curve_cv_valid: bool,
    #[serde(default, rename = "curveCC")]
    pub curve_cc: f64,
    #[serde(default, rename = "curveCCvalid")]
    pub curve_cc_valid: bool,
    #[serde(default, rename = "curveFV")]
    pub curve_fv: f64,
    #[serde(default, rename = "curveFVvalid")]
    pub curve_fv_valid: bool,
    #[serde(default, rename = "curveTC")]
    pub curve_tc: f64,
    #[serde(default, rename = "curveTCvalid")]
    pub curve_tc_valid: bool,
}

impl MeanWellLimitConfig {
    /// Setpoints the request actually carries, by wire name.
    pub fn requested(&self) -> Vec<(&'static str, f64)> {
        [
            ("voltage", self.voltage_valid, self.voltage),
            ("current", self.current_valid, self.current),
            ("curveCV", self.curve_cv_valid, self.curve_cv),
            ("curveCC", self.curve_cc_valid, self.curve_cc),
            ("curveFV", self.curve_fv_valid, self.curve_fv),
            ("curveTC", self.curve_tc_valid, self.curve_tc),
        ]
        .into_iter()
        .filter(|(_, valid, _)| *valid)
        .map(|(name, _, value)| (name, value))
        .collect()
    }

    fn check(&self) -> Result<(), SchemaError> {
        for (field, value) in self.requested() {
            // The temperature compensation curve may be negative.
            if field != "curveTC" && value < 0.0 {
                return Err(SchemaError::out_of_range(field, "must not be negative"));
            }
        }
        Ok(())
    }
}

impl ConfigEntity for MeanWellLimitConfig {
    const KIND: EntityKind = EntityKind::MeanWellLimit;

    fn validate(value: Value) -> Result<Self, SchemaError> {
        let record = into_record(ENTITY, value)?;
        let config: Self = decode_settings(ENTITY, record, &[])?;
        config.check()?;
        Ok(config)
    }

    fn to_document(&self) -> Result<Value, SchemaError> {
        settings_record(ENTITY, self).map(Value::Object)
    }
}
