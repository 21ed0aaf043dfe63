use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config_schema::AnyConfig;
use live_schema::{LiveDataSnapshot, StalenessPolicy};
use schema_cli::report::{live_summary, migration_summary, render};
use schema_cli::CliConfig;
use snapshot_store::{LiveDataStore, SharedSnapshot};
use types::EntityKind;

#[derive(Debug, Parser)]
#[command(name = "schemactl", version, about = "Validate, migrate and inspect device documents")]
struct Cli {
    /// Configuration file (TOML, or JSON by extension). Falls back to SCHEMACTL_CONFIG.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a configuration record and print its current document.
    Validate { entity: EntityKind, file: PathBuf },
    /// Print a configuration record brought to the current revision, with the steps applied.
    Migrate { entity: EntityKind, file: PathBuf },
    /// Summarise a live-data document.
    Live { file: PathBuf },
    /// Re-read a live-data document until interrupted.
    Watch { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load_with_path(cli.config).context("load config failed")?;
    config.validate().context("config validation failed")?;

    match cli.command {
        Command::Validate { entity, file } => {
            let bytes = read_document(&file).await?;
            let record = AnyConfig::load(entity, &bytes)
                .with_context(|| format!("{entity} record {} rejected", file.display()))?;
            let document = record.to_document().context("serialize record")?;
            println!("{}", render(&document, config.pretty));
        }
        Command::Migrate { entity, file } => {
            let bytes = read_document(&file).await?;
            let value = serde_json::from_slice(&bytes)
                .with_context(|| format!("parse {}", file.display()))?;
            let migrated = migration::migrate(entity, value)
                .with_context(|| format!("migrate {entity} record {}", file.display()))?;
            println!("{}", render(&migration_summary(&migrated), config.pretty));
        }
        Command::Live { file } => {
            let bytes = read_document(&file).await?;
            let snapshot = config
                .parser()?
                .parse(&bytes)
                .with_context(|| format!("live data {} rejected", file.display()))?;
            println!("{}", render(&live_summary(&snapshot, config.policy()), config.pretty));
        }
        Command::Watch { file } => watch_document(&config, &file).await?,
    }

    Ok(())
}

async fn read_document(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("read document {}", path.display()))
}

async fn watch_document(config: &CliConfig, path: &Path) -> Result<()> {
    let store = LiveDataStore::new(config.parser()?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reporter = tokio::spawn(report_task(
        store.subscribe(),
        config.policy().clone(),
        shutdown_rx,
    ));

    let mut ticker = interval(config.watch_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut shutdown_signal = Box::pin(tokio::signal::ctrl_c());
    info!(file = %path.display(), interval_ms = config.watch_interval_ms, "watching live data");

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
                break;
            }
            _ = ticker.tick() => {
                match tokio::fs::read(path).await {
                    Ok(bytes) => {
                        // Rejections are logged by the store, which keeps the previous snapshot.
                        store.ingest(&bytes).ok();
                    }
                    Err(err) => warn!(file = %path.display(), error = %err, "live data read failed"),
                }
            }
        }
    }

    if let Err(err) = reporter.await {
        warn!(error = %err, "snapshot reporter task failed");
    }
    Ok(())
}

async fn report_task(
    mut snapshots: watch::Receiver<SharedSnapshot>,
    policy: StalenessPolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = snapshots.borrow_and_update().clone();
                if let Some(snapshot) = current {
                    log_snapshot(&snapshot, &policy);
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

fn log_snapshot(snapshot: &Arc<LiveDataSnapshot>, policy: &StalenessPolicy) {
    for inverter in snapshot.stale_inverters(policy) {
        warn!(
            serial = %inverter.serial,
            data_age = inverter.data_age,
            "inverter data stale"
        );
    }
    for (subsystem, error) in snapshot.malformed() {
        warn!(section = subsystem.name(), error = %error, "subsystem malformed");
    }
    for problem in &snapshot.problems {
        warn!(section = %problem.section, error = %problem.error, "section unreadable");
    }
    info!(
        inverters = snapshot.inverters.len(),
        total_power = ?snapshot.total.as_ref().map(|total| total.power.value),
        "live data refreshed"
    );
}
