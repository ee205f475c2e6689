//! Per-target monitor actor
//!
//! One monitor runs per configured target. Each cycle resolves the target,
//! probes it, classifies the outcome against the current thresholds, fans
//! the resulting alert out (if any) and publishes a record to the broadcast
//! channel. Between cycles the actor waits interruptibly on its command
//! channel, so shutdown and on-demand probes never wait out the interval.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, instrument, trace, warn};

use crate::{
    PingRecord, StatusKind,
    alerts::AlertManager,
    config::{SharedThresholds, Thresholds},
    evaluate::{AlertCounters, AlertKind, classify},
    probe::Prober,
};

use super::messages::{MonitorCommand, MonitorState};

const COMMAND_BUFFER: usize = 8;

/// How long [`TargetHandle::stop`] waits for the actor task to exit.
pub const MONITOR_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a monitor needs besides its target name. Cloned for each
/// spawned monitor.
#[derive(Clone)]
pub struct MonitorDeps {
    pub thresholds: SharedThresholds,
    pub prober: Arc<dyn Prober>,
    pub alerts: AlertManager,
    pub record_tx: broadcast::Sender<PingRecord>,
}

pub struct TargetMonitorActor {
    target: String,
    deps: MonitorDeps,
    command_rx: mpsc::Receiver<MonitorCommand>,
    counters: AlertCounters,
    attempt: u64,
}

impl TargetMonitorActor {
    fn new(target: String, deps: MonitorDeps, command_rx: mpsc::Receiver<MonitorCommand>) -> Self {
        Self {
            target,
            deps,
            command_rx,
            counters: AlertCounters::default(),
            attempt: 1,
        }
    }

    #[instrument(skip(self), fields(target = %self.target))]
    async fn run(mut self) {
        debug!("target monitor started");

        'monitor: loop {
            let thresholds = *self.deps.thresholds.read().await;
            self.run_cycle(&thresholds).await;

            let wait = Duration::from_secs(thresholds.interval_seconds.max(1));
            let sleep = tokio::time::sleep(wait);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    command = self.command_rx.recv() => match command {
                        Some(MonitorCommand::ProbeNow { respond_to }) => {
                            let thresholds = *self.deps.thresholds.read().await;
                            self.run_cycle(&thresholds).await;
                            let _ = respond_to.send(self.state());
                        }
                        Some(MonitorCommand::GetState { respond_to }) => {
                            let _ = respond_to.send(self.state());
                        }
                        Some(MonitorCommand::Shutdown) | None => break 'monitor,
                    },
                }
            }
        }

        debug!("target monitor stopped");
    }

    /// One resolve/probe/classify/record pass.
    async fn run_cycle(&mut self, thresholds: &Thresholds) {
        let timestamp = Utc::now();
        let attempt = self.attempt;
        self.attempt += 1;

        let address = match self.deps.prober.resolve(&self.target).await {
            Ok(address) => address,
            Err(err) => {
                warn!("{err}");
                // Resolution failures leave the consecutive counters alone,
                // but still consume an attempt and get recorded.
                self.publish(PingRecord {
                    timestamp,
                    target: self.target.clone(),
                    resolved_ip: None,
                    status: StatusKind::ResolutionFailure,
                    latency_ms: None,
                    attempt,
                });
                return;
            }
        };

        let outcome = self.deps.prober.probe(address).await;
        let classification = classify(
            outcome,
            thresholds.ping_threshold_ms,
            thresholds.alert_threshold,
            &mut self.counters,
        );

        trace!(
            status = %classification.status,
            latency_ms = ?outcome.latency_ms,
            attempt,
            "probe cycle complete"
        );

        if let Some(alert) = classification.alert {
            match alert {
                AlertKind::Failure { attempts } => {
                    self.deps
                        .alerts
                        .send_failure_alert(&self.target, attempts)
                        .await;
                }
                AlertKind::HighLatency { latency_ms } => {
                    self.deps
                        .alerts
                        .send_latency_alert(&self.target, latency_ms)
                        .await;
                }
            }
        }

        self.publish(PingRecord {
            timestamp,
            target: self.target.clone(),
            resolved_ip: Some(address.to_string()),
            status: classification.status,
            latency_ms: outcome.latency_ms,
            attempt,
        });
    }

    fn publish(&self, record: PingRecord) {
        if let Err(err) = self.deps.record_tx.send(record) {
            error!("failed to publish ping record: {err}");
        }
    }

    fn state(&self) -> MonitorState {
        MonitorState {
            target: self.target.clone(),
            consecutive_failures: self.counters.consecutive_failures,
            consecutive_latency_alerts: self.counters.consecutive_latency_alerts,
            next_attempt: self.attempt,
        }
    }
}

/// Handle owning a spawned target monitor. Dropping the handle closes the
/// command channel, which stops the actor at its next wait.
#[derive(Debug)]
pub struct TargetHandle {
    target: String,
    sender: mpsc::Sender<MonitorCommand>,
    join: JoinHandle<()>,
}

impl TargetHandle {
    pub fn spawn(target: String, deps: MonitorDeps) -> Self {
        let (sender, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = TargetMonitorActor::new(target.clone(), deps, command_rx);
        let join = tokio::spawn(actor.run());
        Self {
            target,
            sender,
            join,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Trigger an immediate probe cycle and return the counters afterwards.
    pub async fn probe_now(&self) -> Option<MonitorState> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::ProbeNow { respond_to: tx })
            .await
            .ok()?;
        rx.await.ok()
    }

    pub async fn state(&self) -> Option<MonitorState> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::GetState { respond_to: tx })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Ask the monitor to stop and wait (bounded) for its task to exit.
    /// Returns `false` if the task did not finish within `timeout`.
    pub async fn stop(self, timeout: Duration) -> bool {
        let _ = self.sender.send(MonitorCommand::Shutdown).await;
        match tokio::time::timeout(timeout, self.join).await {
            Ok(_) => true,
            Err(_) => {
                warn!(target = %self.target, "monitor did not stop in time");
                false
            }
        }
    }
}
