use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use live_schema::{DataSource, LiveSubsystem};
use schema_cli::CliConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn toml_config_validates() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    env::set_var("SCHEMACTL_CONFIG", fixture_path("config-valid.toml"));

    let config = CliConfig::load().expect("load config");
    config.validate().expect("validate config");
    assert_eq!(config.watch_interval_ms, 2_500);
    assert!(config.pretty);
    assert_eq!(
        config.policy().threshold(DataSource::Inverter),
        Duration::from_secs(600)
    );
    assert_eq!(
        config.policy().threshold(DataSource::Charger),
        Duration::from_secs(60)
    );
    let parser = config.parser().expect("parser");
    assert!(!parser.subsystems().any(|subsystem| subsystem == LiveSubsystem::Huawei));

    env::remove_var("SCHEMACTL_CONFIG");
}

#[test]
fn json_config_validates() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    env::set_var("SCHEMACTL_CONFIG", fixture_path("config-valid.json"));

    let config = CliConfig::load().expect("load config");
    config.validate().expect("validate config");
    assert_eq!(config.subsystems, vec!["battery", "huawei"]);
    assert_eq!(
        config.policy().threshold(DataSource::Charger),
        Duration::from_secs(90)
    );

    env::remove_var("SCHEMACTL_CONFIG");
}

#[test]
fn invalid_config_fails_validation() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    env::set_var("SCHEMACTL_CONFIG", fixture_path("config-invalid.toml"));

    let config = CliConfig::load().expect("load config");
    assert!(config.validate().is_err());
    assert!(config.parser().is_err());

    env::remove_var("SCHEMACTL_CONFIG");
}

#[test]
fn env_overrides_file_values() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    env::set_var("SCHEMACTL_SUBSYSTEMS", "power-meter, vedirect,");
    env::set_var("SCHEMACTL_STALE_POWER_METER_SECS", "5");
    env::set_var("SCHEMACTL_PRETTY", "false");

    let config = CliConfig::load_with_path(Some(fixture_path("config-valid.toml")))
        .expect("load config");
    config.validate().expect("validate config");
    assert_eq!(config.subsystems, vec!["power-meter", "vedirect"]);
    assert!(!config.pretty);
    assert_eq!(
        config.policy().threshold(DataSource::PowerMeter),
        Duration::from_secs(5)
    );
    let subsystems: Vec<_> = config.parser().expect("parser").subsystems().collect();
    assert_eq!(subsystems, vec![LiveSubsystem::PowerMeter, LiveSubsystem::Vedirect]);

    env::remove_var("SCHEMACTL_SUBSYSTEMS");
    env::remove_var("SCHEMACTL_STALE_POWER_METER_SECS");
    env::remove_var("SCHEMACTL_PRETTY");
}

#[test]
fn defaults_cover_every_subsystem() {
    let _guard = ENV_LOCK.lock().expect("env lock");

    let config = CliConfig::load_with_path(None).expect("load config");
    config.validate().expect("validate config");
    assert_eq!(config.subsystems.len(), LiveSubsystem::ALL.len());
    assert_eq!(config.watch_interval_ms, 1_000);
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    assert!(CliConfig::load_with_path(Some(fixture_path("absent.toml"))).is_err());
}

fn fixture_path(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path.to_string_lossy().to_string()
}
