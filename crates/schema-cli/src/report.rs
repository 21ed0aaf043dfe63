use serde_json::{json, Map, Value};

use live_schema::{
    DataSource, Freshness, LiveDataSnapshot, LiveSubsystem, StalenessPolicy, Subsystem,
};
use migration::Migrated;

/// Per-subsystem overview of one live-data document.
pub fn live_summary(snapshot: &LiveDataSnapshot, policy: &StalenessPolicy) -> Value {
    let inverters: Vec<Value> = snapshot
        .inverters
        .iter()
        .map(|inverter| {
            json!({
                "serial": inverter.serial,
                "name": inverter.name,
                "data_age": inverter.data_age,
                "stale": policy.freshness(DataSource::Inverter, inverter.data_age) == Freshness::Stale,
                "reachable": inverter.reachable,
                "producing": inverter.producing,
                "ac_power": inverter.ac_power(),
            })
        })
        .collect();

    let mut subsystems = Map::new();
    let states = [
        (LiveSubsystem::Battery, state(&snapshot.battery)),
        (LiveSubsystem::PowerMeter, state(&snapshot.power_meter)),
        (LiveSubsystem::MeanWell, state(&snapshot.meanwell)),
        (LiveSubsystem::Huawei, state(&snapshot.huawei)),
        (LiveSubsystem::Refusol, state(&snapshot.refusol)),
        (LiveSubsystem::Vedirect, state(&snapshot.vedirect)),
    ];
    for (subsystem, state) in states {
        let state = if snapshot.ignored.contains(&subsystem) {
            json!("ignored")
        } else {
            state
        };
        subsystems.insert(subsystem.name().to_string(), state);
    }

    json!({
        "inverters": inverters,
        "total_power": snapshot.total.as_ref().map(|total| total.power.rounded()),
        "subsystems": subsystems,
        "problems": snapshot
            .problems
            .iter()
            .map(|problem| json!({ "section": problem.section, "error": problem.error.to_string() }))
            .collect::<Vec<_>>(),
    })
}

pub fn migration_summary(migrated: &Migrated) -> Value {
    json!({
        "applied": migrated.applied,
        "record": Value::Object(migrated.record.clone()),
    })
}

pub fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|_| value.to_string())
}

fn state<T>(subsystem: &Subsystem<T>) -> Value {
    match subsystem {
        Subsystem::Disabled => json!("disabled"),
        Subsystem::Active(_) => json!("active"),
        Subsystem::Malformed(err) => json!({ "malformed": err.to_string() }),
    }
}
