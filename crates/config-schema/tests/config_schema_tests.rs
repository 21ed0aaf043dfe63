use serde_json::{json, Value};

use config_schema::{
    load, load_value, AcChargerConfig, AnyConfig, BatteryConfig, BatteryProvider, Charger,
    ConfigEntity, InverterConfig, MeanWellLimitConfig, MqttConfig, NetworkConfig,
    PowerMeterConfig, PowerMeterSource, ZeroExportConfig,
};
use types::{EntityKind, SchemaError};

fn fixture(data: &str) -> Value {
    serde_json::from_str(data).expect("fixture json")
}

fn assert_round_trip<E: ConfigEntity + PartialEq + std::fmt::Debug>(config: &E) {
    let document = config.to_document().expect("to_document");
    let again = E::validate(document).expect("validate written document");
    assert_eq!(&again, config);
}

fn zendure_battery() -> Value {
    fixture(include_str!("fixtures/battery-zendure.json"))
}

#[test]
fn zendure_battery_validates_and_keeps_dormant_mqtt_block() {
    let config = BatteryConfig::validate(zendure_battery()).expect("validate");

    match &config.provider {
        BatteryProvider::Zendure(zendure) => {
            assert_eq!(zendure.device_serial, "P2A1B2C3D4E5");
            assert_eq!(zendure.max_output, 800);
        }
        other => panic!("unexpected provider {other:?}"),
    }
    assert_eq!(config.dormant["mqtt"]["soc_topic"], json!("old/soc"));
    assert_eq!(config.settings.stop_charging_soc, Some(95));

    let document = config.to_document().expect("to_document");
    assert_eq!(document["provider"], json!(7));
    assert_eq!(document["mqtt"], zendure_battery()["mqtt"]);
    assert_round_trip(&config);
}

#[test]
fn zendure_without_block_is_incomplete() {
    let mut record = zendure_battery();
    record["provider"] = json!("Zendure");
    record.as_object_mut().expect("object").remove("zendure");

    let err = BatteryConfig::validate(record).expect_err("must fail");
    assert!(
        matches!(err, SchemaError::IncompleteProviderBlock { ref block, .. } if block == "zendure"),
        "{err:?}"
    );
}

#[test]
fn zendure_with_empty_serial_is_incomplete() {
    let mut record = zendure_battery();
    record["zendure"]["device_serial"] = json!("");

    let err = BatteryConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::IncompleteProviderBlock { ref block, .. } if block == "zendure"));
}

#[test]
fn unknown_provider_is_rejected_before_anything_else() {
    for provider in [json!(42), json!("LeadAcid"), json!(true)] {
        let record = json!({ "provider": provider });
        let err = BatteryConfig::validate(record).expect_err("must fail");
        assert!(
            matches!(err, SchemaError::UnknownProvider { ref field, .. } if field == "provider"),
            "{err:?}"
        );
    }

    let err = PowerMeterConfig::validate(json!({ "source": 9 })).expect_err("must fail");
    assert!(matches!(err, SchemaError::UnknownProvider { ref field, .. } if field == "source"));

    let err = AcChargerConfig::validate(json!({ "chargerType": "Victron" })).expect_err("must fail");
    assert!(matches!(err, SchemaError::UnknownProvider { ref field, .. } if field == "chargerType"));
}

#[test]
fn load_reports_unknown_provider_before_migration() {
    let err = load_value::<BatteryConfig>(json!({ "provider": 42, "pollinterval": 5 }))
        .expect_err("must fail");
    assert_eq!(
        err,
        SchemaError::UnknownProvider {
            field: "provider".to_string(),
            value: "42".to_string(),
        }
    );

    let err = load::<PowerMeterConfig>(br#"{"source": "Ferraris", "sdmbaudrate": 9600}"#)
        .expect_err("must fail");
    assert!(matches!(err, SchemaError::UnknownProvider { ref field, .. } if field == "source"));

    let err = AnyConfig::load(EntityKind::AcCharger, br#"{"chargerType": "Victron"}"#)
        .expect_err("must fail");
    assert!(matches!(err, SchemaError::UnknownProvider { ref field, .. } if field == "chargerType"));
}

#[test]
fn provider_name_is_accepted_and_written_as_code() {
    let mut record = zendure_battery();
    record["provider"] = json!("zendure");

    let config = BatteryConfig::validate(record).expect("validate");
    let document = config.to_document().expect("to_document");
    assert_eq!(document["provider"], json!(7));
}

#[test]
fn missing_scalar_field_is_reported() {
    let mut record = zendure_battery();
    record.as_object_mut().expect("object").remove("updatesonly");

    let err = BatteryConfig::validate(record).expect_err("must fail");
    assert_eq!(err, SchemaError::missing("battery", "updatesonly"));
}

#[test]
fn wrong_scalar_type_is_a_mismatch() {
    let mut record = zendure_battery();
    record["pollinterval"] = json!("fast");

    let err = BatteryConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::TypeMismatch { .. }), "{err:?}");
}

#[test]
fn temperature_ranges_reject_inverted_bounds_and_accept_equal_ones() {
    let mut record = zendure_battery();
    record["min_charge_temp"] = json!(51);
    let err = BatteryConfig::validate(record).expect_err("must fail");
    assert_eq!(
        err,
        SchemaError::RangeInvariantViolated {
            lower: "min_charge_temp".into(),
            upper: "max_charge_temp".into(),
        }
    );

    let mut record = zendure_battery();
    record["min_discharge_temp"] = json!(60);
    let err = BatteryConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::RangeInvariantViolated { ref lower, .. } if lower == "min_discharge_temp"));

    let mut record = zendure_battery();
    record["min_charge_temp"] = json!(50);
    record["min_discharge_temp"] = json!(50);
    BatteryConfig::validate(record).expect("equal bounds are fine");
}

#[test]
fn zendure_soc_bounds_are_ordered() {
    let mut record = zendure_battery();
    record["zendure"]["min_soc"] = json!(95);
    let err = BatteryConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::RangeInvariantViolated { .. }));
}

#[test]
fn zero_poll_interval_is_out_of_range() {
    let mut record = zendure_battery();
    record["pollinterval"] = json!(0);
    let err = BatteryConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::OutOfRange { ref field, .. } if field == "pollinterval"));
}

#[test]
fn legacy_battery_loads_through_migration() {
    let bytes = include_bytes!("fixtures/battery-legacy.json");
    let config: BatteryConfig = load(bytes).expect("load");

    match &config.provider {
        BatteryProvider::Mqtt(mqtt) => {
            assert_eq!(mqtt.soc_topic, "batt/soc");
            assert_eq!(mqtt.voltage_unit, 0);
        }
        other => panic!("unexpected provider {other:?}"),
    }
    assert_eq!(config.dormant["jkbms"], json!({"interface": 0, "polling_interval": 7}));
    assert_eq!(config.settings.can_controller_frequency, Some(8_000_000));
    assert_round_trip(&config);
}

#[test]
fn legacy_charger_loads_as_meanwell() {
    let legacy = json!({
        "enabled": true,
        "pollinterval": 5,
        "updatesonly": true,
        "min_voltage": 42.5,
        "max_voltage": 53.2,
        "min_current": 1.5,
        "max_current": 16.0,
        "hysteresis": 30.0,
        "verbose_logging": false,
        "EEPROMwrites": 12,
        "mustInverterProduce": false
    });

    let config: AcChargerConfig = load_value(legacy).expect("load");
    match &config.charger {
        Charger::Meanwell(meanwell) => {
            assert_eq!(meanwell.max_voltage, 53.2);
            assert_eq!(meanwell.eeprom_writes, 12);
            assert!(!meanwell.must_inverter_produce);
        }
        other => panic!("unexpected charger {other:?}"),
    }
    let document = config.to_document().expect("to_document");
    assert_eq!(document["chargerType"], json!("Meanwell"));
    assert_round_trip(&config);
}

#[test]
fn meanwell_voltage_window_must_be_ordered() {
    let record = json!({
        "enabled": true,
        "updatesonly": true,
        "verbose_logging": false,
        "chargerType": 0,
        "meanwell": {
            "pollinterval": 5,
            "min_voltage": 54.0,
            "max_voltage": 42.0,
            "min_current": 1.0,
            "max_current": 18.0,
            "hysteresis": 25.0,
            "EEPROMwrites": 0,
            "mustInverterProduce": true
        }
    });

    let err = AcChargerConfig::validate(record).expect_err("must fail");
    assert_eq!(
        err,
        SchemaError::RangeInvariantViolated {
            lower: "min_voltage".into(),
            upper: "max_voltage".into(),
        }
    );
}

#[test]
fn huawei_charger_accepts_upper_case_alias() {
    let config = AcChargerConfig::validate(fixture(include_str!("fixtures/charger-huawei.json")))
        .expect("validate");
    assert!(matches!(config.charger, Charger::Huawei(_)));
    assert_eq!(
        config.to_document().expect("to_document")["chargerType"],
        json!("Huawei")
    );
    assert_round_trip(&config);
}

#[test]
fn huawei_power_limits_must_be_ordered() {
    let mut record = fixture(include_str!("fixtures/charger-huawei.json"));
    record["huawei"]["lower_power_limit"] = json!(2500.0);
    let err = AcChargerConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::RangeInvariantViolated { ref lower, .. } if lower == "lower_power_limit"));
}

#[test]
fn legacy_power_meter_loads_as_http_json() {
    let bytes = include_bytes!("fixtures/power-meter-legacy.json");
    let config: PowerMeterConfig = load(bytes).expect("load");

    match &config.source {
        PowerMeterSource::HttpJson(http) => {
            assert_eq!(http.values.len(), 2);
            assert_eq!(http.values[0].json_path, "total_power");
            assert_eq!(http.polling_interval, Some(10));
        }
        other => panic!("unexpected source {other:?}"),
    }
    assert!(config.dormant.contains_key("mqtt"));
    assert!(config.dormant.contains_key("serial_sdm"));
    assert_round_trip(&config);
}

fn http_meter(values: Value) -> Value {
    json!({
        "enabled": true,
        "updatesonly": false,
        "verbose_logging": false,
        "source": 3,
        "http_json": { "individual_requests": true, "values": values }
    })
}

fn http_value(url: &str) -> Value {
    json!({
        "enabled": true,
        "url": url,
        "auth_type": 0,
        "timeout": 1000,
        "json_path": "power",
        "unit": 1
    })
}

#[test]
fn http_json_without_values_is_incomplete() {
    let err = PowerMeterConfig::validate(http_meter(json!([]))).expect_err("must fail");
    assert!(matches!(err, SchemaError::IncompleteProviderBlock { ref block, .. } if block == "http_json"));
}

#[test]
fn http_json_checks_every_individually_requested_value() {
    let values = json!([http_value("http://meter/a"), http_value("ftp://meter/b")]);
    let err = PowerMeterConfig::validate(http_meter(values)).expect_err("must fail");
    assert!(
        matches!(err, SchemaError::OutOfRange { ref field, .. } if field == "http_json.values[1].url"),
        "{err:?}"
    );

    let mut disabled = http_value("");
    disabled["enabled"] = json!(false);
    let values = json!([http_value("https://meter/a"), disabled]);
    PowerMeterConfig::validate(http_meter(values)).expect("disabled values are skipped");
}

#[test]
fn http_json_authentication_needs_credentials() {
    let mut value = http_value("http://meter/a");
    value["auth_type"] = json!(1);
    let err = PowerMeterConfig::validate(http_meter(json!([value]))).expect_err("must fail");
    assert!(matches!(err, SchemaError::OutOfRange { .. }));
}

#[test]
fn sdm_sources_share_the_serial_block() {
    let record = json!({
        "enabled": true,
        "updatesonly": false,
        "verbose_logging": false,
        "source": "SdmThreePhase",
        "serial_sdm": { "baudrate": 9600, "address": 1, "polling_interval": 5 }
    });
    let config = PowerMeterConfig::validate(record).expect("validate");
    assert!(matches!(config.source, PowerMeterSource::SdmThreePhase(_)));
    assert_eq!(config.to_document().expect("to_document")["source"], json!(2));
    assert_round_trip(&config);
}

#[test]
fn mqtt_config_round_trips() {
    let config = MqttConfig::validate(fixture(include_str!("fixtures/mqtt.json"))).expect("validate");
    assert_eq!(config.port, 1883);
    assert_round_trip(&config);
}

#[test]
fn mqtt_topic_rules_apply_when_enabled() {
    let mut record = fixture(include_str!("fixtures/mqtt.json"));
    record["topic"] = json!("solar");
    let err = MqttConfig::validate(record.clone()).expect_err("must fail");
    assert!(matches!(err, SchemaError::OutOfRange { ref field, .. } if field == "topic"));

    record["enabled"] = json!(false);
    MqttConfig::validate(record).expect("disabled client is not checked");
}

#[test]
fn mqtt_port_and_qos_are_bounded() {
    let mut record = fixture(include_str!("fixtures/mqtt.json"));
    record["port"] = json!(70000);
    let err = MqttConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::OutOfRange { ref field, .. } if field == "port"));

    let mut record = fixture(include_str!("fixtures/mqtt.json"));
    record["lwt_qos"] = json!(3);
    let err = MqttConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::OutOfRange { ref field, .. } if field == "lwt_qos"));
}

#[test]
fn network_requires_ipv4_addresses() {
    let config =
        NetworkConfig::validate(fixture(include_str!("fixtures/network.json"))).expect("validate");
    assert_round_trip(&config);

    let mut record = fixture(include_str!("fixtures/network.json"));
    record["gateway"] = json!("192.168.1");
    let err = NetworkConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::OutOfRange { ref field, .. } if field == "gateway"));
}

#[test]
fn network_hostname_length_is_limited() {
    let mut record = fixture(include_str!("fixtures/network.json"));
    record["hostname"] = json!("a-very-long-hostname-for-this-device");
    let err = NetworkConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::OutOfRange { ref field, .. } if field == "hostname"));
}

#[test]
fn inverter_channels_are_kept_in_order() {
    let config =
        InverterConfig::validate(fixture(include_str!("fixtures/inverter.json"))).expect("validate");
    assert_eq!(config.id, "0");
    assert_eq!(config.serial_number(), Some(0x1161_8123_4567));
    assert_eq!(config.channel[1].name, "West");
    assert_round_trip(&config);

    let mut record = fixture(include_str!("fixtures/inverter.json"));
    record["serial"] = json!("not-hex");
    assert!(InverterConfig::validate(record).is_err());
}

#[test]
fn zero_export_mask_selects_inverters() {
    let config =
        ZeroExportConfig::validate(fixture(include_str!("fixtures/zero-export.json"))).expect("validate");
    assert!(config.controls_inverter(0));
    assert!(config.controls_inverter(1));
    assert!(!config.controls_inverter(2));
    assert_round_trip(&config);

    let mut record = fixture(include_str!("fixtures/zero-export.json"));
    record["Tn"] = json!(0);
    let err = ZeroExportConfig::validate(record).expect_err("must fail");
    assert!(matches!(err, SchemaError::OutOfRange { ref field, .. } if field == "Tn"));
}

#[test]
fn meanwell_limit_lists_only_valid_setpoints() {
    let config = MeanWellLimitConfig::validate(json!({
        "voltage": 53.5,
        "voltageValid": true,
        "current": 12.0,
        "currentValid": false
    }))
    .expect("validate");
    assert_eq!(config.requested(), vec![("voltage", 53.5)]);
    assert_round_trip(&config);
}

#[test]
fn any_config_dispatches_by_entity() {
    let bytes = include_bytes!("fixtures/zero-export.json");
    let config = AnyConfig::load(EntityKind::ZeroExport, bytes).expect("load");
    assert_eq!(config.kind(), EntityKind::ZeroExport);
    assert_eq!(config.to_document().expect("to_document")["MaxGrid"], json!(400));

    let err = AnyConfig::load(EntityKind::Battery, b"{").expect_err("must fail");
    assert!(matches!(err, SchemaError::Json(_)));
}

#[test]
fn unmigratable_record_fails_load() {
    let err = load_value::<InverterConfig>(json!({ "name": "lonely" })).expect_err("must fail");
    assert!(matches!(err, SchemaError::UnmigratableSchema { .. }));
}
