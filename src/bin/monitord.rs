use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use pingwarden::{
    actors::{
        config_watcher::{POLL_INTERVAL, WatcherHandle},
        reconciler::Reconciler,
        recorder::RecorderHandle,
        target_monitor::MonitorDeps,
    },
    alerts::AlertManager,
    api::{ApiState, spawn_api_server},
    config::{StorageConfig, read_config_file, shared_thresholds},
    lifecycle::Coordinator,
    probe::SystemPinger,
    storage::{MemoryBackend, SqliteBackend, StorageBackend},
};
use tokio::sync::broadcast;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

const RECORD_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![("pingwarden", LevelFilter::TRACE)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    dotenv::dotenv().ok();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    // A config that does not parse at startup is fatal. Later reload
    // failures only log and keep the previous configuration.
    let config = read_config_file(&args.file)
        .with_context(|| format!("reading startup config {}", args.file))?;

    let thresholds = shared_thresholds(config.thresholds);
    let (record_tx, _) = broadcast::channel(RECORD_CHANNEL_CAPACITY);

    let mut retention_days = None;
    let backend: Box<dyn StorageBackend> = match config.storage.unwrap_or_default() {
        StorageConfig::Memory => Box::new(MemoryBackend::new()),
        StorageConfig::Sqlite {
            path,
            retention_days: days,
        } => {
            retention_days = Some(days);
            Box::new(SqliteBackend::new(&path).await?)
        }
    };

    let (recorder, recorder_join) =
        RecorderHandle::spawn(record_tx.subscribe(), backend, retention_days);

    let alerts = AlertManager::from_config(&config.alerts);
    let deps = MonitorDeps {
        thresholds: thresholds.clone(),
        prober: Arc::new(SystemPinger),
        alerts,
        record_tx,
    };

    let reconciler = Arc::new(Reconciler::new(deps));
    let summary = reconciler.reconcile(&config.targets).await;
    info!(started = summary.started.len(), "monitoring started");

    let watcher = WatcherHandle::spawn(
        PathBuf::from(&args.file),
        POLL_INTERVAL,
        reconciler.clone(),
        thresholds,
    );

    if let Some(api) = &config.api {
        let bind_addr = api
            .bind
            .parse()
            .with_context(|| format!("invalid API bind address {}", api.bind))?;
        spawn_api_server(bind_addr, ApiState::new(recorder.clone(), reconciler.clone())).await?;
    }

    let coordinator = Coordinator::new(watcher, reconciler, recorder, recorder_join);

    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl-c")?;
    info!("received ctrl-c");

    coordinator.shutdown().await;
    Ok(())
}
