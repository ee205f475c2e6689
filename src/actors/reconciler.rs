//! Target set reconciliation
//!
//! The reconciler owns the map of running monitors. Given a desired target
//! set it stops monitors for removed targets and spawns monitors for added
//! ones, all under a single lock so overlapping reconciliations cannot
//! interleave and double-start a target.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    messages::{MonitorState, ReconcileSummary},
    target_monitor::{MONITOR_STOP_TIMEOUT, MonitorDeps, TargetHandle},
};

pub struct Reconciler {
    deps: MonitorDeps,
    monitors: Mutex<HashMap<String, TargetHandle>>,
}

impl Reconciler {
    pub fn new(deps: MonitorDeps) -> Self {
        Self {
            deps,
            monitors: Mutex::new(HashMap::new()),
        }
    }

    /// Bring the running monitor set in line with `desired`.
    ///
    /// Monitors for targets no longer desired are stopped before new ones
    /// start. A target that is already running keeps its monitor, and with
    /// it the monitor's counters and attempt numbering.
    pub async fn reconcile(&self, desired: &BTreeSet<String>) -> ReconcileSummary {
        let mut monitors = self.monitors.lock().await;

        let running: BTreeSet<String> = monitors.keys().cloned().collect();
        let to_stop: Vec<String> = running.difference(desired).cloned().collect();
        let to_start: Vec<String> = desired.difference(&running).cloned().collect();

        if to_stop.is_empty() && to_start.is_empty() {
            debug!("target set unchanged, nothing to reconcile");
            return ReconcileSummary::default();
        }

        for name in &to_stop {
            if let Some(handle) = monitors.remove(name) {
                info!(target = %name, "stopping monitor");
                if !handle.stop(MONITOR_STOP_TIMEOUT).await {
                    warn!(target = %name, "monitor shutdown timed out");
                }
            }
        }

        for name in &to_start {
            info!(target = %name, "starting monitor");
            monitors.insert(
                name.clone(),
                TargetHandle::spawn(name.clone(), self.deps.clone()),
            );
        }

        ReconcileSummary {
            started: to_start,
            stopped: to_stop,
        }
    }

    /// Stop every running monitor. Used during shutdown.
    pub async fn stop_all(&self) {
        // The lock is held across the whole drain so a racing reconcile
        // cannot start monitors for names that are being stopped.
        let mut monitors = self.monitors.lock().await;
        let handles: Vec<TargetHandle> = monitors.drain().map(|(_, handle)| handle).collect();

        for handle in handles {
            let name = handle.target().to_owned();
            if !handle.stop(MONITOR_STOP_TIMEOUT).await {
                warn!(target = %name, "monitor shutdown timed out");
            }
        }
    }

    pub async fn running_targets(&self) -> Vec<String> {
        let monitors = self.monitors.lock().await;
        let mut targets: Vec<String> = monitors.keys().cloned().collect();
        targets.sort();
        targets
    }

    pub async fn is_monitored(&self, target: &str) -> bool {
        self.monitors.lock().await.contains_key(target)
    }

    /// Run an immediate probe cycle on one monitor. Mostly useful in tests
    /// and diagnostics; normal probing is interval driven.
    pub async fn probe_now(&self, target: &str) -> Option<MonitorState> {
        let monitors = self.monitors.lock().await;
        let handle = monitors.get(target)?;
        handle.probe_now().await
    }

    pub async fn monitor_state(&self, target: &str) -> Option<MonitorState> {
        let monitors = self.monitors.lock().await;
        let handle = monitors.get(target)?;
        handle.state().await
    }
}
