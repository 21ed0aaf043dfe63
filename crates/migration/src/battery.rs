use serde_json::{json, Value};

use types::{EntityKind, Record};

use crate::{has_any, nest_field, take_object, MigrationChain, MigrationStep};

pub const BATTERY_COUNT_DEFAULT: u64 = 1;
/// Volts.
pub const MQTT_VOLTAGE_UNIT_DEFAULT: u64 = 0;
const JKBMS_INTERFACE_DEFAULT: u64 = 0;
const JKBMS_POLLING_INTERVAL_DEFAULT: u64 = 5;

const REQUIRED: &[&str] = &[
    "enabled",
    "pollinterval",
    "updatesonly",
    "verbose_logging",
    "provider",
    "numberOfBatteries",
    "min_charge_temp",
    "max_charge_temp",
    "min_discharge_temp",
    "max_discharge_temp",
];

const FLAT_MQTT: &[(&str, &str)] = &[
    ("mqtt_soc_topic", "soc_topic"),
    ("mqtt_soc_json_path", "soc_json_path"),
    ("mqtt_voltage_topic", "voltage_topic"),
    ("mqtt_voltage_json_path", "voltage_json_path"),
    ("mqtt_voltage_unit", "voltage_unit"),
];

const FLAT_JKBMS: &[(&str, &str)] = &[
    ("jkbms_interface", "interface"),
    ("jkbms_polling_interval", "polling_interval"),
];

const LEGACY: &[&str] = &[
    "mqtt_soc_topic",
    "mqtt_soc_json_path",
    "mqtt_voltage_topic",
    "mqtt_voltage_json_path",
    "mqtt_voltage_unit",
    "jkbms_interface",
    "jkbms_polling_interval",
];

const STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: "battery.nest_mqtt_fields",
        applies: has_flat_mqtt,
        apply: nest_mqtt_fields,
    },
    MigrationStep {
        name: "battery.nest_jkbms_fields",
        applies: has_flat_jkbms,
        apply: nest_jkbms_fields,
    },
    MigrationStep {
        name: "battery.default_battery_count",
        applies: lacks_battery_count,
        apply: default_battery_count,
    },
];

pub(crate) fn chain() -> MigrationChain {
    MigrationChain {
        entity: EntityKind::Battery,
        required: REQUIRED,
        legacy: LEGACY,
        steps: STEPS,
    }
}

fn has_flat_mqtt(record: &Record) -> bool {
    has_any(record, &flat_keys(FLAT_MQTT))
}

fn nest_mqtt_fields(record: &mut Record) {
    let mut mqtt = take_object(record, "mqtt");
    for (flat, field) in FLAT_MQTT {
        nest_field(record, &mut mqtt, flat, field);
    }
    for (field, default) in [
        ("soc_topic", json!("")),
        ("soc_json_path", json!("")),
        ("voltage_topic", json!("")),
        ("voltage_json_path", json!("")),
        ("voltage_unit", json!(MQTT_VOLTAGE_UNIT_DEFAULT)),
    ] {
        mqtt.entry(field.to_string()).or_insert(default);
    }
    record.insert("mqtt".to_string(), Value::Object(mqtt));
}

fn has_flat_jkbms(record: &Record) -> bool {
    has_any(record, &flat_keys(FLAT_JKBMS))
}

fn nest_jkbms_fields(record: &mut Record) {
    let mut jkbms = take_object(record, "jkbms");
    for (flat, field) in FLAT_JKBMS {
        nest_field(record, &mut jkbms, flat, field);
    }
    jkbms
        .entry("interface".to_string())
        .or_insert(json!(JKBMS_INTERFACE_DEFAULT));
    let polling = record
        .get("pollinterval")
        .cloned()
        .unwrap_or(json!(JKBMS_POLLING_INTERVAL_DEFAULT));
    jkbms
        .entry("polling_interval".to_string())
        .or_insert(polling);
    record.insert("jkbms".to_string(), Value::Object(jkbms));
}

fn lacks_battery_count(record: &Record) -> bool {
    !record.contains_key("numberOfBatteries")
}

fn default_battery_count(record: &mut Record) {
    record.insert("numberOfBatteries".to_string(), json!(BATTERY_COUNT_DEFAULT));
}

fn flat_keys(pairs: &[(&'static str, &'static str)]) -> Vec<&'static str> {
    pairs.iter().map(|(flat, _)| *flat).collect()
}
