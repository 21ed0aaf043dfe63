use serde_json::{json, Value};

use types::{EntityKind, Record};

use crate::{has_any, nest_field, take_object, MigrationChain, MigrationStep};

/// Factory values of the Meanwell block, used when a legacy record lacks one.
pub struct MeanWellDefaults;

impl MeanWellDefaults {
    pub const POLL_INTERVAL: u64 = 5;
    pub const MIN_VOLTAGE: f64 = 42.0;
    pub const MAX_VOLTAGE: f64 = 54.0;
    pub const MIN_CURRENT: f64 = 1.0;
    pub const MAX_CURRENT: f64 = 18.0;
    pub const HYSTERESIS: f64 = 25.0;
    pub const EEPROM_WRITES: u64 = 0;
    pub const MUST_INVERTER_PRODUCE: bool = true;
}

/// Factory values of the Huawei block.
pub struct HuaweiDefaults;

impl HuaweiDefaults {
    pub const AUTO_POWER_ENABLED: bool = false;
    pub const VOLTAGE_LIMIT: f64 = 42.0;
    pub const ENABLE_VOLTAGE_LIMIT: f64 = 42.0;
    pub const LOWER_POWER_LIMIT: f64 = 150.0;
    pub const UPPER_POWER_LIMIT: f64 = 2000.0;
}

const REQUIRED: &[&str] = &["enabled", "updatesonly", "verbose_logging", "chargerType"];

const FLAT_MEANWELL: &[&str] = &[
    "pollinterval",
    "min_voltage",
    "max_voltage",
    "min_current",
    "max_current",
    "hysteresis",
    "EEPROMwrites",
    "mustInverterProduce",
];

const FLAT_HUAWEI: &[&str] = &[
    "auto_power_enabled",
    "voltage_limit",
    "enable_voltage_limit",
    "lower_power_limit",
    "upper_power_limit",
];

const LEGACY: &[&str] = &[
    "pollinterval",
    "min_voltage",
    "max_voltage",
    "min_current",
    "max_current",
    "hysteresis",
    "EEPROMwrites",
    "mustInverterProduce",
    "auto_power_enabled",
    "voltage_limit",
    "enable_voltage_limit",
    "lower_power_limit",
    "upper_power_limit",
];

const STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: "charger.nest_meanwell_fields",
        applies: has_flat_meanwell,
        apply: nest_meanwell_fields,
    },
    MigrationStep {
        name: "charger.nest_huawei_fields",
        applies: has_flat_huawei,
        apply: nest_huawei_fields,
    },
    MigrationStep {
        name: "charger.infer_charger_type",
        applies: has_single_block_without_type,
        apply: infer_charger_type,
    },
];

pub(crate) fn chain() -> MigrationChain {
    MigrationChain {
        entity: EntityKind::AcCharger,
        required: REQUIRED,
        legacy: LEGACY,
        steps: STEPS,
    }
}

fn has_flat_meanwell(record: &Record) -> bool {
    has_any(record, FLAT_MEANWELL)
}

fn nest_meanwell_fields(record: &mut Record) {
    let mut meanwell = take_object(record, "meanwell");
    for field in FLAT_MEANWELL {
        nest_field(record, &mut meanwell, field, field);
    }
    for (field, default) in [
        ("pollinterval", json!(MeanWellDefaults::POLL_INTERVAL)),
        ("min_voltage", json!(MeanWellDefaults::MIN_VOLTAGE)),
        ("max_voltage", json!(MeanWellDefaults::MAX_VOLTAGE)),
        ("min_current", json!(MeanWellDefaults::MIN_CURRENT)),
        ("max_current", json!(MeanWellDefaults::MAX_CURRENT)),
        ("hysteresis", json!(MeanWellDefaults::HYSTERESIS)),
        ("EEPROMwrites", json!(MeanWellDefaults::EEPROM_WRITES)),
        (
            "mustInverterProduce",
            json!(MeanWellDefaults::MUST_INVERTER_PRODUCE),
        ),
    ] {
        meanwell.entry(field.to_string()).or_insert(default);
    }
    record.insert("meanwell".to_string(), Value::Object(meanwell));
}

fn has_flat_huawei(record: &Record) -> bool {
    has_any(record, FLAT_HUAWEI)
}

fn nest_huawei_fields(record: &mut Record) {
    let mut huawei = take_object(record, "huawei");
    for field in FLAT_HUAWEI {
        nest_field(record, &mut huawei, field, field);
    }
    for (field, default) in [
        ("auto_power_enabled", json!(HuaweiDefaults::AUTO_POWER_ENABLED)),
        ("voltage_limit", json!(HuaweiDefaults::VOLTAGE_LIMIT)),
        (
            "enable_voltage_limit",
            json!(HuaweiDefaults::ENABLE_VOLTAGE_LIMIT),
        ),
        ("lower_power_limit", json!(HuaweiDefaults::LOWER_POWER_LIMIT)),
        ("upper_power_limit", json!(HuaweiDefaults::UPPER_POWER_LIMIT)),
    ] {
        huawei.entry(field.to_string()).or_insert(default);
    }
    record.insert("huawei".to_string(), Value::Object(huawei));
}

/// Records written before `chargerType` existed carry exactly one charger block.
fn has_single_block_without_type(record: &Record) -> bool {
    !record.contains_key("chargerType")
        && (record.contains_key("meanwell") != record.contains_key("huawei"))
}

fn infer_charger_type(record: &mut Record) {
    let charger_type = if record.contains_key("meanwell") {
        "Meanwell"
    } else {
        "Huawei"
    };
    record.insert("chargerType".to_string(), json!(charger_type));
}
