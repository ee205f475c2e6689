//! Config file watcher
//!
//! Polls the config file's modification time. When it moves forward the
//! file is re-read, the shared thresholds are swapped in place and the
//! reconciler is handed the new target set. A file that fails to parse is
//! logged and skipped; the previous configuration stays active.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{SharedThresholds, read_config_file};

use super::{
    messages::{ReconcileSummary, WatcherCommand},
    reconciler::Reconciler,
};

const COMMAND_BUFFER: usize = 8;

/// Default mtime poll cadence.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

const WATCHER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ConfigWatcherActor {
    path: PathBuf,
    poll_interval: Duration,
    reconciler: Arc<Reconciler>,
    thresholds: SharedThresholds,
    command_rx: mpsc::Receiver<WatcherCommand>,
    last_modified: Option<std::time::SystemTime>,
}

impl ConfigWatcherActor {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn run(mut self) {
        // Baseline the mtime first so the startup configuration, which the
        // caller already applied, does not trigger a redundant reload.
        self.last_modified = self.modified_time().await;
        debug!("config watcher started");

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.changed().await {
                        info!("config file changed, reloading");
                        if let Err(err) = self.reload().await {
                            error!("config reload failed, keeping previous configuration: {err:#}");
                        }
                    }
                }
                command = self.command_rx.recv() => match command {
                    Some(WatcherCommand::ReloadNow { respond_to }) => {
                        self.last_modified = self.modified_time().await;
                        let _ = respond_to.send(self.reload().await);
                    }
                    Some(WatcherCommand::Shutdown) | None => break,
                },
            }
        }

        debug!("config watcher stopped");
    }

    async fn modified_time(&self) -> Option<std::time::SystemTime> {
        match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata.modified().ok(),
            Err(err) => {
                warn!("could not stat config file: {err}");
                None
            }
        }
    }

    async fn changed(&mut self) -> bool {
        let Some(modified) = self.modified_time().await else {
            return false;
        };
        match self.last_modified {
            Some(last) if modified <= last => false,
            _ => {
                self.last_modified = Some(modified);
                true
            }
        }
    }

    async fn reload(&mut self) -> anyhow::Result<ReconcileSummary> {
        let config = read_config_file(&self.path)
            .with_context(|| format!("reloading {}", self.path.display()))?;

        *self.thresholds.write().await = config.thresholds;

        let summary = self.reconciler.reconcile(&config.targets).await;
        if summary.is_noop() {
            info!("thresholds updated, target set unchanged");
        } else {
            info!(
                started = summary.started.len(),
                stopped = summary.stopped.len(),
                "applied new target set"
            );
        }
        Ok(summary)
    }
}

/// Handle owning the spawned watcher task.
#[derive(Debug)]
pub struct WatcherHandle {
    sender: mpsc::Sender<WatcherCommand>,
    join: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn spawn(
        path: PathBuf,
        poll_interval: Duration,
        reconciler: Arc<Reconciler>,
        thresholds: SharedThresholds,
    ) -> Self {
        let (sender, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = ConfigWatcherActor {
            path,
            poll_interval,
            reconciler,
            thresholds,
            command_rx,
            last_modified: None,
        };
        let join = tokio::spawn(actor.run());
        Self { sender, join }
    }

    /// Force a reload without waiting for the next mtime poll.
    pub async fn reload_now(&self) -> anyhow::Result<ReconcileSummary> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WatcherCommand::ReloadNow { respond_to: tx })
            .await
            .context("config watcher is gone")?;
        rx.await.context("config watcher dropped the request")?
    }

    /// Stop the watcher and wait (bounded) for its task to exit.
    pub async fn stop(self) {
        let _ = self.sender.send(WatcherCommand::Shutdown).await;
        if tokio::time::timeout(WATCHER_STOP_TIMEOUT, self.join)
            .await
            .is_err()
        {
            warn!("config watcher did not stop in time");
        }
    }
}
