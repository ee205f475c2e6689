//! Record sink actor
//!
//! Subscribes to the ping record broadcast channel and writes everything it
//! receives into the storage backend. Records are batched and flushed when
//! the batch fills up or the flush interval elapses. The recorder is the
//! sole owner of the backend; query commands from the API surface are
//! serviced here, and the backend is closed exactly once when the actor
//! exits.

use std::time::Duration;

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::{
    PingRecord,
    storage::{HealthStatus, RecordQuery, StorageBackend, StorageError, StorageResult, TargetStats},
};

use super::messages::RecorderCommand;

const COMMAND_BUFFER: usize = 32;

/// Flush once this many records are buffered.
const BATCH_SIZE_TRIGGER: usize = 50;

/// Flush at least this often while records are buffered.
const BATCH_TIME_TRIGGER: Duration = Duration::from_secs(2);

/// Cadence for deleting records past the retention window.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60 * 24);

pub struct RecorderActor {
    backend: Box<dyn StorageBackend>,
    record_rx: broadcast::Receiver<PingRecord>,
    command_rx: mpsc::Receiver<RecorderCommand>,
    batch: Vec<PingRecord>,
    retention_days: Option<u32>,
    total_written: u64,
}

impl RecorderActor {
    #[instrument(skip(self))]
    async fn run(mut self) {
        debug!("recorder started");

        let mut flush_ticker = tokio::time::interval(BATCH_TIME_TRIGGER);
        flush_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut cleanup_ticker = tokio::time::interval(CLEANUP_INTERVAL);
        cleanup_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first cleanup tick fires immediately, which doubles as a
        // startup sweep of stale records.

        loop {
            tokio::select! {
                result = self.record_rx.recv() => match result {
                    Ok(record) => {
                        trace!(target = %record.target, status = %record.status, "buffering record");
                        self.batch.push(record);
                        if self.batch.len() >= BATCH_SIZE_TRIGGER {
                            self.flush().await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "recorder lagged behind the record stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = flush_ticker.tick() => {
                    if !self.batch.is_empty() {
                        self.flush().await;
                    }
                }
                _ = cleanup_ticker.tick(), if self.retention_days.is_some() => {
                    self.cleanup().await;
                }
                command = self.command_rx.recv() => match command {
                    Some(RecorderCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
            }
        }

        self.drain_pending();
        self.flush().await;
        if let Err(err) = self.backend.close().await {
            error!("closing storage backend failed: {err}");
        }
        info!(total_written = self.total_written, "recorder stopped");
    }

    async fn handle_command(&mut self, command: RecorderCommand) {
        match command {
            RecorderCommand::Flush { respond_to } => {
                self.drain_pending();
                let count = self.batch.len();
                let result = self.flush_inner().await;
                if result.is_ok() {
                    self.total_written += count as u64;
                }
                let _ = respond_to.send(result);
            }
            RecorderCommand::QueryRecords { query, respond_to } => {
                let _ = respond_to.send(self.backend.query_records(query).await);
            }
            RecorderCommand::LatestPerTarget { respond_to } => {
                let _ = respond_to.send(self.backend.latest_per_target().await);
            }
            RecorderCommand::TargetStats {
                target,
                window,
                respond_to,
            } => {
                let _ = respond_to.send(self.backend.target_stats(&target, window).await);
            }
            RecorderCommand::HealthCheck { respond_to } => {
                let _ = respond_to.send(self.backend.health_check().await);
            }
            RecorderCommand::Shutdown => unreachable!("handled in the select loop"),
        }
    }

    /// Pull everything already sitting in the broadcast buffer into the
    /// batch. Explicit flushes and shutdown use this so records published
    /// before the command are never left behind by select ordering.
    fn drain_pending(&mut self) {
        loop {
            match self.record_rx.try_recv() {
                Ok(record) => self.batch.push(record),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "recorder lagged behind the record stream");
                }
                Err(_) => break,
            }
        }
    }

    async fn flush(&mut self) {
        let count = self.batch.len();
        match self.flush_inner().await {
            Ok(()) => {
                self.total_written += count as u64;
                trace!(count, "flushed record batch");
            }
            // The batch is dropped on a failed flush; it must not grow
            // unboundedly against a dead backend.
            Err(err) => error!(count, "failed to flush record batch: {err}"),
        }
    }

    async fn flush_inner(&mut self) -> StorageResult<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.batch);
        self.backend.insert_batch(batch).await
    }

    async fn cleanup(&mut self) {
        let Some(days) = self.retention_days else {
            return;
        };
        let before = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
        match self.backend.cleanup_old_records(before).await {
            Ok(0) => {}
            Ok(deleted) => info!(deleted, retention_days = days, "pruned old records"),
            Err(err) => error!("record cleanup failed: {err}"),
        }
    }
}

/// Cloneable handle to the recorder actor.
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    sender: mpsc::Sender<RecorderCommand>,
}

impl RecorderHandle {
    pub fn spawn(
        record_rx: broadcast::Receiver<PingRecord>,
        backend: Box<dyn StorageBackend>,
        retention_days: Option<u32>,
    ) -> (Self, JoinHandle<()>) {
        let (sender, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = RecorderActor {
            backend,
            record_rx,
            command_rx,
            batch: Vec::new(),
            retention_days,
            total_written: 0,
        };
        let join = tokio::spawn(actor.run());
        (Self { sender }, join)
    }

    pub async fn flush(&self) -> StorageResult<()> {
        self.request(|respond_to| RecorderCommand::Flush { respond_to })
            .await?
    }

    pub async fn query_records(&self, query: RecordQuery) -> StorageResult<Vec<PingRecord>> {
        self.request(|respond_to| RecorderCommand::QueryRecords { query, respond_to })
            .await?
    }

    pub async fn latest_per_target(&self) -> StorageResult<Vec<PingRecord>> {
        self.request(|respond_to| RecorderCommand::LatestPerTarget { respond_to })
            .await?
    }

    pub async fn target_stats(&self, target: &str, window: usize) -> StorageResult<TargetStats> {
        let target = target.to_owned();
        self.request(|respond_to| RecorderCommand::TargetStats {
            target,
            window,
            respond_to,
        })
        .await?
    }

    pub async fn health_check(&self) -> StorageResult<HealthStatus> {
        self.request(|respond_to| RecorderCommand::HealthCheck { respond_to })
            .await?
    }

    /// Ask the recorder to flush, close its backend and exit.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(RecorderCommand::Shutdown).await;
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RecorderCommand,
    ) -> StorageResult<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| StorageError::ConnectionFailed("recorder is not running".into()))?;
        rx.await
            .map_err(|_| StorageError::ConnectionFailed("recorder dropped the request".into()))
    }
}
