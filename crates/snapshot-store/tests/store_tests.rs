use std::time::Duration;

use serde_json::json;

use config_schema::{BatteryConfig, BatteryProvider, ZeroExportConfig};
use live_schema::{LiveDataParser, LiveSubsystem};
use snapshot_store::{ConfigStore, LiveDataStore};
use types::SchemaError;

fn zero_export(max_grid: u16) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "enabled": true,
        "updatesonly": true,
        "verbose_logging": false,
        "InverterId": 1,
        "MaxGrid": max_grid,
        "PowerHysteresis": 2,
        "MinimumLimit": 10,
        "Tn": 60
    }))
    .expect("serialize")
}

#[tokio::test]
async fn subscribers_see_whole_snapshots() {
    let store = LiveDataStore::default();
    let mut rx = store.subscribe();
    assert!(store.current().is_none());

    store
        .ingest(br#"{"battery": {"enabled": true, "soc": {"v": 40, "u": "%", "d": 0}}}"#)
        .expect("first");
    tokio::time::timeout(Duration::from_secs(1), rx.changed())
        .await
        .expect("timely")
        .expect("changed");
    let first = rx.borrow_and_update().clone().expect("snapshot");
    assert!(first.battery.active().is_some());

    store
        .ingest(br#"{"battery": {"enabled": false}}"#)
        .expect("second");
    rx.changed().await.expect("changed");
    let second = rx.borrow_and_update().clone().expect("snapshot");
    assert!(second.battery.is_disabled());

    // The earlier snapshot is untouched by the replacement.
    assert!(first.battery.active().is_some());
}

#[tokio::test]
async fn unreadable_document_keeps_previous_snapshot() {
    let store = LiveDataStore::new(LiveDataParser::with_subsystems([LiveSubsystem::Battery]));
    store
        .ingest(br#"{"battery": {"enabled": true}}"#)
        .expect("first");

    let err = store.ingest(b"{ truncated").expect_err("must fail");
    assert!(matches!(err, SchemaError::Json(_)));
    let current = store.current().expect("snapshot kept");
    assert!(current.battery.active().is_some());
}

#[tokio::test]
async fn failed_config_write_leaves_record_untouched() {
    let store: ConfigStore<ZeroExportConfig> = ConfigStore::new();
    let applied = store.apply(&zero_export(400)).expect("apply");
    assert_eq!(applied.max_grid, 400);

    let mut invalid: serde_json::Value =
        serde_json::from_slice(&zero_export(800)).expect("json");
    invalid["Tn"] = json!(0);
    let err = store
        .apply(&serde_json::to_vec(&invalid).expect("serialize"))
        .expect_err("must fail");
    assert!(matches!(err, SchemaError::OutOfRange { .. }));

    assert_eq!(store.current().expect("record").max_grid, 400);
    assert_eq!(
        store.document().expect("document").expect("stored")["MaxGrid"],
        json!(400)
    );
}

#[tokio::test]
async fn config_subscribers_observe_applied_records() {
    let store: ConfigStore<BatteryConfig> = ConfigStore::new();
    let mut rx = store.subscribe();

    let legacy = include_bytes!("../../config-schema/tests/fixtures/battery-legacy.json");
    store.apply(legacy).expect("apply");

    rx.changed().await.expect("changed");
    let record = rx.borrow_and_update().clone().expect("record");
    assert!(matches!(record.provider, BatteryProvider::Mqtt(_)));
}
