use serde_json::json;
use types::{CellAggregate, LiveValue, LiveValues, MeasuredArray, MeasuredValue, SchemaError};

#[test]
fn measured_value_decodes_wire_keys() {
    let value = MeasuredValue::from_json(&json!({"v": 230.4, "u": "V", "d": 1})).expect("decode");
    assert_eq!(value.value, 230.4);
    assert_eq!(value.unit, "V");
    assert_eq!(value.digits, 1);
    assert_eq!(value.max, None);

    let long = MeasuredValue::from_json(&json!({"value": 12, "unit": "A", "digits": 0, "max": 20}))
        .expect("decode long form");
    assert_eq!(long.max, Some(20.0));
}

#[test]
fn measured_value_requires_unit_and_digits() {
    let err = MeasuredValue::from_json(&json!({"v": 1.0, "d": 1})).unwrap_err();
    assert_eq!(err, SchemaError::missing("ValueObject", "u"));

    let err = MeasuredValue::from_json(&json!({"v": 1.0, "u": "W"})).unwrap_err();
    assert_eq!(err, SchemaError::missing("ValueObject", "d"));
}

#[test]
fn negative_digits_are_rejected() {
    let err = MeasuredValue::from_json(&json!({"v": 1.0, "u": "W", "d": -1})).unwrap_err();
    assert!(matches!(err, SchemaError::TypeMismatch { ref field, .. } if field == "d"));

    let via_serde: Result<MeasuredValue, _> =
        serde_json::from_value(json!({"v": 1.0, "u": "W", "d": -1}));
    assert!(via_serde.is_err());
}

#[test]
fn measured_value_serializes_without_absent_max() {
    let value = MeasuredValue::new(5.0, "%", 0);
    assert_eq!(
        serde_json::to_value(&value).expect("serialize"),
        json!({"v": 5.0, "u": "%", "d": 0})
    );
    let with_max = value.with_max(100.0);
    assert_eq!(
        serde_json::to_value(&with_max).expect("serialize"),
        json!({"v": 5.0, "u": "%", "d": 0, "max": 100.0})
    );
}

#[test]
fn measured_value_rounds_to_precision() {
    assert_eq!(MeasuredValue::new(3.14159, "V", 2).rounded(), 3.14);
    assert_eq!(MeasuredValue::new(7.6, "W", 0).rounded(), 8.0);
}

#[test]
fn measured_array_keeps_metadata() {
    let hours = MeasuredArray::from_json(&json!({"values": [0, 12.5, 40], "u": "Wh", "d": 1}))
        .expect("decode");
    assert_eq!(hours.values, vec![0.0, 12.5, 40.0]);
    assert_eq!(hours.unit, "Wh");

    let err = MeasuredArray::from_json(&json!({"values": [1, "x"], "u": "Wh", "d": 0})).unwrap_err();
    assert!(matches!(err, SchemaError::TypeMismatch { .. }));
}

#[test]
fn live_values_accept_array_and_object_forms() {
    let list = LiveValues::from_json(&json!([{"v": 1, "u": "V", "d": 0}, "Pylontech"]))
        .expect("array form");
    assert_eq!(list.len(), 2);
    assert_eq!(list.0[1].value.as_text(), Some("Pylontech"));

    let named = LiveValues::from_json(&json!({
        "SoC": {"v": 87, "u": "%", "d": 0},
        "chargeEnabled": "yes"
    }))
    .expect("object form");
    assert_eq!(named.get("chargeEnabled"), Some(&LiveValue::Text("yes".to_string())));
    assert_eq!(
        named.get("SoC").and_then(LiveValue::as_measured).map(|v| v.value),
        Some(87.0)
    );
    assert_eq!(
        serde_json::to_value(&named).expect("serialize"),
        json!({"SoC": {"v": 87.0, "u": "%", "d": 0}, "chargeEnabled": "yes"})
    );

    assert!(LiveValues::from_json(&json!([true])).is_err());
}

#[test]
fn named_channels_keep_document_order() {
    let raw: serde_json::Value = serde_json::from_str(
        r#"{"Voltage": {"v": 52.1, "u": "V", "d": 1}, "Current": {"v": -3.2, "u": "A", "d": 1}, "Alarm": "none"}"#,
    )
    .expect("json");
    let named = LiveValues::from_json(&raw).expect("object form");

    let order: Vec<&str> = named.iter().filter_map(|entry| entry.name.as_deref()).collect();
    assert_eq!(order, vec!["Voltage", "Current", "Alarm"]);

    let written = serde_json::to_string(&named).expect("serialize");
    let voltage = written.find("Voltage").expect("voltage");
    let current = written.find("Current").expect("current");
    let alarm = written.find("Alarm").expect("alarm");
    assert!(voltage < current && current < alarm, "{written}");
}

#[test]
fn cell_aggregate_derives_min_max_diff() {
    let cells = CellAggregate::from_json(&json!({
        "voltage": [
            {"v": 3.301, "u": "V", "d": 3},
            {"v": 3.287, "u": "V", "d": 3},
            {"v": 3.315, "u": "V", "d": 3}
        ],
        "cellMinVoltage": {"v": 0.0, "u": "V", "d": 3},
        "cellMaxVoltage": {"v": 9.0, "u": "V", "d": 3},
        "cellDiffVoltage": {"v": 9.0, "u": "V", "d": 3}
    }))
    .expect("decode");

    let min = cells.min().expect("min");
    let max = cells.max().expect("max");
    let diff = cells.diff().expect("diff");
    assert_eq!(min.value, 3.287);
    assert_eq!(max.value, 3.315);
    assert_eq!(diff.value, max.value - min.value);

    let encoded = serde_json::to_value(&cells).expect("serialize");
    assert_eq!(encoded["cellMaxVoltage"]["v"], json!(3.315));
}

#[test]
fn empty_cell_aggregate_has_no_extremes() {
    let cells = CellAggregate::new(Vec::new());
    assert!(cells.min().is_none());
    assert!(cells.diff().is_none());
    assert_eq!(
        serde_json::to_value(&cells).expect("serialize"),
        json!({"voltage": []})
    );
}

#[test]
fn wrapped_text_channel_is_text() {
    let value = LiveValue::from_json(&json!({"value": "yes", "translate": true})).expect("decode");
    assert_eq!(value.as_text(), Some("yes"));

    let err = LiveValue::from_json(&json!(true)).expect_err("must fail");
    assert!(matches!(err, SchemaError::TypeMismatch { .. }));
}
