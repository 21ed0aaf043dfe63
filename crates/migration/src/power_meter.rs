use serde_json::{json, Value};

use types::{EntityKind, Record};

use crate::{has_any, take_object, MigrationChain, MigrationStep};

pub const SDM_BAUDRATE_DEFAULT: u64 = 9600;
pub const SDM_ADDRESS_DEFAULT: u64 = 1;
pub const HTTP_TIMEOUT_DEFAULT_MS: u64 = 2000;
/// Watts.
pub const POWER_UNIT_DEFAULT: u64 = 1;

const REQUIRED: &[&str] = &["enabled", "updatesonly", "verbose_logging", "source"];

const FLAT_MQTT: &[&str] = &[
    "mqtt_topic_powermeter_1",
    "mqtt_topic_powermeter_2",
    "mqtt_topic_powermeter_3",
];

const FLAT_SDM: &[&str] = &["sdmbaudrate", "sdmaddress"];

const FLAT_HTTP: &[&str] = &["http_individual_requests", "http_phases"];

const POLLED_BLOCKS: &[&str] = &["serial_sdm", "http_json", "http_sml"];

const LEGACY: &[&str] = &[
    "mqtt_topic_powermeter_1",
    "mqtt_topic_powermeter_2",
    "mqtt_topic_powermeter_3",
    "sdmbaudrate",
    "sdmaddress",
    "http_individual_requests",
    "http_phases",
    "pollinterval",
];

const STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: "power_meter.nest_mqtt_topics",
        applies: has_flat_mqtt,
        apply: nest_mqtt_topics,
    },
    MigrationStep {
        name: "power_meter.nest_sdm_fields",
        applies: has_flat_sdm,
        apply: nest_sdm_fields,
    },
    MigrationStep {
        name: "power_meter.nest_http_phases",
        applies: has_flat_http,
        apply: nest_http_phases,
    },
    MigrationStep {
        name: "power_meter.retire_poll_interval",
        applies: has_poll_interval,
        apply: retire_poll_interval,
    },
    MigrationStep {
        name: "power_meter.default_verbose_logging",
        applies: lacks_verbose_logging,
        apply: default_verbose_logging,
    },
];

pub(crate) fn chain() -> MigrationChain {
    MigrationChain {
        entity: EntityKind::PowerMeter,
        required: REQUIRED,
        legacy: LEGACY,
        steps: STEPS,
    }
}

fn has_flat_mqtt(record: &Record) -> bool {
    has_any(record, FLAT_MQTT)
}

/// Only non-empty legacy topics become values, in phase order. A meter
/// configured on phase 2 alone therefore ends up at `values[0]`.
fn nest_mqtt_topics(record: &mut Record) {
    let mut mqtt = take_object(record, "mqtt");
    let topics: Vec<Value> = FLAT_MQTT
        .iter()
        .filter_map(|flat| record.remove(*flat))
        .filter_map(|topic| match topic {
            Value::String(topic) if !topic.is_empty() => Some(json!({
                "topic": topic,
                "json_path": "",
                "unit": POWER_UNIT_DEFAULT,
                "sign_inverted": false,
            })),
            _ => None,
        })
        .collect();
    mqtt.entry("values".to_string())
        .or_insert(Value::Array(topics));
    record.insert("mqtt".to_string(), Value::Object(mqtt));
}

fn has_flat_sdm(record: &Record) -> bool {
    has_any(record, FLAT_SDM)
}

fn nest_sdm_fields(record: &mut Record) {
    let mut sdm = take_object(record, "serial_sdm");
    let baudrate = record
        .remove("sdmbaudrate")
        .unwrap_or(json!(SDM_BAUDRATE_DEFAULT));
    let address = record
        .remove("sdmaddress")
        .unwrap_or(json!(SDM_ADDRESS_DEFAULT));
    sdm.entry("baudrate".to_string()).or_insert(baudrate);
    sdm.entry("address".to_string()).or_insert(address);
    record.insert("serial_sdm".to_string(), Value::Object(sdm));
}

fn has_flat_http(record: &Record) -> bool {
    has_any(record, FLAT_HTTP)
}

fn nest_http_phases(record: &mut Record) {
    let mut http = take_object(record, "http_json");
    let individual = record
        .remove("http_individual_requests")
        .unwrap_or(json!(false));
    let phases = match record.remove("http_phases") {
        Some(Value::Array(phases)) => phases
            .into_iter()
            .enumerate()
            .map(|(position, phase)| phase_to_value(position, phase))
            .collect(),
        _ => Vec::new(),
    };
    http.entry("individual_requests".to_string())
        .or_insert(individual);
    http.entry("values".to_string())
        .or_insert(Value::Array(phases));
    record.insert("http_json".to_string(), Value::Object(http));
}

/// Legacy phases carried a 1-based `index`; position in `values` replaces it.
/// A first phase without an `enabled` flag is enabled.
fn phase_to_value(position: usize, phase: Value) -> Value {
    let mut phase = match phase {
        Value::Object(phase) => phase,
        _ => Record::new(),
    };
    phase.remove("index");
    for (field, default) in [
        ("enabled", json!(position == 0)),
        ("url", json!("")),
        ("auth_type", json!(0)),
        ("username", json!("")),
        ("password", json!("")),
        ("header_key", json!("")),
        ("header_value", json!("")),
        ("timeout", json!(HTTP_TIMEOUT_DEFAULT_MS)),
        ("json_path", json!("")),
        ("unit", json!(POWER_UNIT_DEFAULT)),
        ("sign_inverted", json!(false)),
    ] {
        phase.entry(field.to_string()).or_insert(default);
    }
    Value::Object(phase)
}

fn has_poll_interval(record: &Record) -> bool {
    record.contains_key("pollinterval")
}

fn retire_poll_interval(record: &mut Record) {
    let Some(interval) = record.remove("pollinterval") else {
        return;
    };
    for block in POLLED_BLOCKS {
        if let Some(Value::Object(inner)) = record.get_mut(*block) {
            inner
                .entry("polling_interval".to_string())
                .or_insert_with(|| interval.clone());
        }
    }
}

fn lacks_verbose_logging(record: &Record) -> bool {
    !record.contains_key("verbose_logging")
}

fn default_verbose_logging(record: &mut Record) {
    record.insert("verbose_logging".to_string(), json!(false));
}
