use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use live_schema::{DataSource, LiveDataParser, LiveSubsystem, StalenessPolicy};

const DEFAULT_WATCH_INTERVAL_MS: u64 = 1_000;

#[derive(Clone, Debug)]
pub struct CliConfig {
    /// Optional live-data sections to interpret, by name.
    pub subsystems: Vec<String>,
    pub staleness: StalenessPolicy,
    pub watch_interval_ms: u64,
    pub pretty: bool,
}

impl CliConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    pub fn load_with_path(config_path: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(file_config) = load_file_config(config_path.as_deref())? {
            apply_file_config(&mut config, file_config);
        }

        apply_env_overrides(&mut config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for name in &self.subsystems {
            if name.parse::<LiveSubsystem>().is_err() {
                anyhow::bail!("live.subsystems contains unknown subsystem '{name}'");
            }
        }
        for source in DataSource::ALL {
            if self.staleness.threshold(source).is_zero() {
                anyhow::bail!("staleness.{}_secs must be >= 1", source.name());
            }
        }
        if self.watch_interval_ms == 0 {
            anyhow::bail!("watch.interval_ms must be >= 1");
        }
        Ok(())
    }

    pub fn parser(&self) -> Result<LiveDataParser> {
        let subsystems = self
            .subsystems
            .iter()
            .map(|name| name.parse::<LiveSubsystem>().map_err(anyhow::Error::msg))
            .collect::<Result<Vec<_>>>()?;
        Ok(LiveDataParser::with_subsystems(subsystems))
    }

    pub fn policy(&self) -> &StalenessPolicy {
        &self.staleness
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            subsystems: LiveSubsystem::ALL
                .iter()
                .map(|subsystem| subsystem.name().to_string())
                .collect(),
            staleness: StalenessPolicy::default(),
            watch_interval_ms: DEFAULT_WATCH_INTERVAL_MS,
            pretty: false,
        }
    }
}

fn apply_env_overrides(config: &mut CliConfig) {
    if let Ok(value) = env::var("SCHEMACTL_SUBSYSTEMS") {
        config.subsystems = parse_subsystem_list(&value);
    }
    let thresholds = [
        ("SCHEMACTL_STALE_INVERTER_SECS", DataSource::Inverter),
        ("SCHEMACTL_STALE_BATTERY_SECS", DataSource::Battery),
        ("SCHEMACTL_STALE_CHARGER_SECS", DataSource::Charger),
        ("SCHEMACTL_STALE_POWER_METER_SECS", DataSource::PowerMeter),
    ];
    for (key, source) in thresholds {
        if let Some(secs) = parse_env_u64(key) {
            set_threshold(config, source, secs);
        }
    }
    if let Some(interval) = parse_env_u64("SCHEMACTL_WATCH_INTERVAL_MS") {
        config.watch_interval_ms = interval;
    }
    if let Some(pretty) = parse_env_bool("SCHEMACTL_PRETTY") {
        config.pretty = pretty;
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    live: Option<FileLiveConfig>,
    staleness: Option<FileStalenessConfig>,
    watch: Option<FileWatchConfig>,
    output: Option<FileOutputConfig>,
}

#[derive(Debug, Deserialize)]
struct FileLiveConfig {
    subsystems: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct FileStalenessConfig {
    inverter_secs: Option<u64>,
    battery_secs: Option<u64>,
    charger_secs: Option<u64>,
    power_meter_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileWatchConfig {
    interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileOutputConfig {
    pretty: Option<bool>,
}

fn load_file_config(config_path: Option<&str>) -> Result<Option<FileConfig>> {
    let path = match config_path {
        Some(path) => path.to_string(),
        None => match env::var("SCHEMACTL_CONFIG") {
            Ok(value) => value,
            Err(_) => return Ok(None),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("read config file {path}"))?;
    let ext = Path::new(&path).extension().and_then(|value| value.to_str());

    let config = match ext {
        Some("json") => serde_json::from_str(&content).context("parse json config")?,
        _ => toml::from_str(&content).context("parse toml config")?,
    };

    Ok(Some(config))
}

fn apply_file_config(config: &mut CliConfig, file: FileConfig) {
    if let Some(subsystems) = file.live.and_then(|live| live.subsystems) {
        config.subsystems = subsystems
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
    }
    if let Some(staleness) = file.staleness {
        let thresholds = [
            (staleness.inverter_secs, DataSource::Inverter),
            (staleness.battery_secs, DataSource::Battery),
            (staleness.charger_secs, DataSource::Charger),
            (staleness.power_meter_secs, DataSource::PowerMeter),
        ];
        for (secs, source) in thresholds {
            if let Some(secs) = secs {
                set_threshold(config, source, secs);
            }
        }
    }
    if let Some(interval) = file.watch.and_then(|watch| watch.interval_ms) {
        config.watch_interval_ms = interval;
    }
    if let Some(pretty) = file.output.and_then(|output| output.pretty) {
        config.pretty = pretty;
    }
}

fn set_threshold(config: &mut CliConfig, source: DataSource, secs: u64) {
    config.staleness = config
        .staleness
        .clone()
        .with_threshold(source, Duration::from_secs(secs));
}

fn parse_env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_subsystem_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
