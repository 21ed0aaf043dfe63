use serde_json::{json, Value};

use live_schema::{
    cell_spread, parse, parse_battery_status, parse_huawei_status, parse_meanwell_status,
    parse_refusol_status, DataSource, Freshness, IssueSeverity, LiveDataParser, LiveSubsystem,
    StalenessPolicy, Subsystem,
};
use types::{LiveValue, SchemaError};

const LIVEDATA: &[u8] = include_bytes!("fixtures/livedata.json");

fn livedata() -> Value {
    serde_json::from_slice(LIVEDATA).expect("fixture json")
}

fn bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("serialize")
}

#[test]
fn full_document_parses_every_section() {
    let snapshot = parse(LIVEDATA).expect("parse");

    assert_eq!(snapshot.inverters.len(), 2);
    let garage = &snapshot.inverters[0];
    assert_eq!(garage.name, "Garage roof");
    assert_eq!(garage.dc.len(), 2);
    assert_eq!(garage.dc.get(0).and_then(|c| c.name.as_deref()), Some("East"));
    assert_eq!(
        garage.dc.get(0).and_then(|c| c.get("Irradiation")).and_then(|v| v.max),
        Some(410.0)
    );
    assert_eq!(garage.ac_power(), Some(412.3));

    let balcony = &snapshot.inverters[1];
    assert_eq!(balcony.limit_absolute, None);
    assert_eq!(balcony.events, None);
    assert_eq!(balcony.ac_power(), None);

    let total = snapshot.total.as_ref().expect("total");
    assert_eq!(total.yield_total.digits, 3);
    assert_eq!(snapshot.hours.as_ref().map(|h| h.values.len()), Some(5));
    assert!(snapshot.hints.expect("hints").default_password);

    assert_eq!(
        snapshot.battery.active().and_then(|b| b.soc.as_ref()).map(|soc| soc.value),
        Some(87.0)
    );
    assert_eq!(
        snapshot.power_meter.active().map(|pm| pm.grid_power.value),
        Some(-35.2)
    );
    assert!(snapshot.meanwell.active().is_some());
    assert!(snapshot.vedirect.active().is_some());
    assert!(snapshot.refusol.is_disabled());
    assert!(snapshot.huawei.is_disabled());
    assert!(snapshot.ignored.is_empty());
    assert!(snapshot.problems.is_empty());
    assert!(snapshot.malformed().is_empty());
}

#[test]
fn missing_battery_section_is_disabled() {
    let mut document = livedata();
    document.as_object_mut().expect("object").remove("battery");

    let snapshot = parse(&bytes(&document)).expect("parse");
    assert_eq!(snapshot.battery, Subsystem::Disabled);
    assert!(snapshot.power_meter.active().is_some());
}

#[test]
fn malformed_section_does_not_block_the_others() {
    let mut document = livedata();
    document["power_meter"] = json!({ "enabled": true, "GridPower": { "v": 1, "u": "W", "d": 0 } });
    document["meanwell"]["Power"]["d"] = json!(-1);

    let snapshot = parse(&bytes(&document)).expect("parse");
    assert_eq!(
        snapshot.power_meter.error(),
        Some(&SchemaError::missing("power_meter", "HousePower"))
    );
    assert!(matches!(snapshot.meanwell, Subsystem::Malformed(_)));
    assert!(snapshot.battery.active().is_some());
    assert_eq!(snapshot.inverters.len(), 2);
    assert_eq!(snapshot.malformed().len(), 2);
}

#[test]
fn broken_inverter_is_reported_and_skipped() {
    let mut document = livedata();
    document["inverters"][1]
        .as_object_mut()
        .expect("object")
        .remove("serial");

    let snapshot = parse(&bytes(&document)).expect("parse");
    assert_eq!(snapshot.inverters.len(), 1);
    assert_eq!(snapshot.problems.len(), 1);
    assert_eq!(snapshot.problems[0].section, "inverters[1]");
}

#[test]
fn section_without_enabled_flag_is_malformed() {
    let mut document = livedata();
    document["battery"] = json!({ "soc": { "v": 50, "u": "%", "d": 0 } });

    let snapshot = parse(&bytes(&document)).expect("parse");
    assert_eq!(
        snapshot.battery.error(),
        Some(&SchemaError::missing("battery", "enabled"))
    );
}

#[test]
fn unconfigured_subsystems_are_ignored() {
    let parser = LiveDataParser::with_subsystems([LiveSubsystem::Battery, LiveSubsystem::PowerMeter]);
    let snapshot = parser.parse(LIVEDATA).expect("parse");

    assert!(snapshot.battery.active().is_some());
    assert!(snapshot.meanwell.is_disabled());
    assert!(snapshot.vedirect.is_disabled());
    assert_eq!(
        snapshot.ignored,
        vec![LiveSubsystem::MeanWell, LiveSubsystem::Refusol, LiveSubsystem::Vedirect]
    );
}

#[test]
fn hours_nested_in_total_are_accepted() {
    let mut document = livedata();
    let hours = document.as_object_mut().expect("object").remove("hours").expect("hours");
    document["total"]["hours"] = hours;

    let snapshot = parse(&bytes(&document)).expect("parse");
    assert_eq!(snapshot.hours.map(|h| h.unit), Some("Wh".to_string()));
}

#[test]
fn only_unreadable_documents_fail() {
    assert!(matches!(parse(b"not json"), Err(SchemaError::Json(_))));
    assert!(matches!(parse(b"[1, 2]"), Err(SchemaError::TypeMismatch { .. })));

    let snapshot = parse(b"{}").expect("empty document");
    assert!(snapshot.inverters.is_empty());
    assert!(snapshot.total.is_none());
    assert!(snapshot.battery.is_disabled());
}

#[test]
fn subsystem_names_parse_loosely() {
    assert_eq!("Power-Meter".parse::<LiveSubsystem>(), Ok(LiveSubsystem::PowerMeter));
    assert!("solar".parse::<LiveSubsystem>().is_err());
}

#[test]
fn staleness_uses_per_source_thresholds() {
    let policy = StalenessPolicy::default();
    assert_eq!(policy.freshness(DataSource::PowerMeter, 30), Freshness::Fresh);
    assert_eq!(policy.freshness(DataSource::PowerMeter, 31), Freshness::Stale);
    assert_eq!(policy.freshness(DataSource::Inverter, 299), Freshness::Fresh);

    let snapshot = parse(LIVEDATA).expect("parse");
    let stale: Vec<_> = snapshot.stale_inverters(&policy).map(|inv| inv.name.as_str()).collect();
    assert_eq!(stale, vec!["Balcony"]);

    let relaxed = policy.with_threshold(DataSource::Inverter, std::time::Duration::from_secs(3600));
    assert_eq!(snapshot.stale_inverters(&relaxed).count(), 0);
}

#[test]
fn battery_status_reads_packs_cells_and_issues() {
    let status = parse_battery_status(include_bytes!("fixtures/battery-status.json")).expect("parse");

    assert_eq!(status.manufacturer, "Pylontech");
    assert_eq!(status.pack_count(), 1);
    assert_eq!(
        status.values.get("chargeEnabled"),
        Some(&LiveValue::Text("yes".to_string()))
    );
    assert_eq!(status.alarms().count(), 1);
    assert!(status
        .issues
        .iter()
        .any(|issue| issue.severity == IssueSeverity::Warning));

    let pack = &status.packs[0];
    assert_eq!(pack.software_version, "1.4");
    assert_eq!(pack.module_role.as_deref(), Some("Master"));
    assert_eq!(pack.temp_sensors.len(), 2);

    // Stored min/max/diff are ignored in favour of the cell readings.
    let cells = pack.cell.as_ref().expect("cells");
    assert_eq!(cells.min().map(|v| v.value), Some(3.238));
    assert_eq!(cells.max().map(|v| v.value), Some(3.252));

    let spread = cell_spread(&status);
    let diff = spread.get(&1).expect("pack 1");
    assert!((diff.value - 0.014).abs() < 1e-9);
    assert_eq!(diff.unit, "V");
}

#[test]
fn battery_status_requires_manufacturer() {
    let err = parse_battery_status(br#"{"data_age": 1}"#).expect_err("must fail");
    assert_eq!(err, SchemaError::missing("battery_status", "manufacturer"));
}

#[test]
fn charger_and_refusol_statuses_parse() {
    let huawei = parse_huawei_status(
        br#"{"data_age": 3,
             "inputValues": {"input_voltage": {"v": 230.1, "u": "V", "d": 2}},
             "outputValues": {"output_power": {"v": 1500, "u": "W", "d": 0}}}"#,
    )
    .expect("huawei");
    assert_eq!(huawei.output_values.len(), 1);
    assert!(huawei.amp_hour.is_none());

    let meanwell = parse_meanwell_status(
        br#"{"data_age": 0, "manufacturerModelName": "NPB-1200-48", "automatic": true,
             "operation": true, "cuve": false, "stgs": true,
             "inputValues": [], "outputValues": [{"v": 53.5, "u": "V", "d": 2}]}"#,
    )
    .expect("meanwell");
    assert_eq!(meanwell.model_name, "NPB-1200-48");
    assert!(!meanwell.curve);

    let refusol = parse_refusol_status(
        br#"{"serNo": "740123", "PID": "0x1B", "firmware": "8.04", "age_critical": false,
             "data_age": 12, "acValues": {"Power": {"v": 1800, "u": "W", "d": 0}}}"#,
    )
    .expect("refusol");
    assert_eq!(refusol.serial_number, "740123");
    assert!(refusol.dc_values.is_empty());
}
