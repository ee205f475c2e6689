//! Helper functions and stubs for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use pingwarden::{
    PingRecord, ProbeOutcome,
    actors::target_monitor::MonitorDeps,
    alerts::{AlertManager, Notifier},
    config::{SharedThresholds, Thresholds, shared_thresholds},
    probe::{Prober, ResolutionError},
};

/// Prober that replays a scripted sequence of outcomes, then falls back to
/// a fixed outcome once the script runs out. Resolution always succeeds
/// (localhost) unless built with [`ScriptedProber::unresolvable`].
pub struct ScriptedProber {
    outcomes: Mutex<VecDeque<ProbeOutcome>>,
    fallback: ProbeOutcome,
    resolvable: bool,
}

impl ScriptedProber {
    pub fn new(outcomes: impl IntoIterator<Item = ProbeOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            fallback: ProbeOutcome::success(10.0),
            resolvable: true,
        }
    }

    /// Every probe fails, forever.
    pub fn always_failing() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            fallback: ProbeOutcome::failure(),
            resolvable: true,
        }
    }

    /// Name resolution always fails; the probe itself is never reached.
    pub fn unresolvable() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            fallback: ProbeOutcome::failure(),
            resolvable: false,
        }
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn resolve(&self, target: &str) -> Result<IpAddr, ResolutionError> {
        if self.resolvable {
            Ok(IpAddr::V4(Ipv4Addr::LOCALHOST))
        } else {
            Err(ResolutionError {
                target: target.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "scripted resolution failure",
                ),
            })
        }
    }

    async fn probe(&self, _address: IpAddr) -> ProbeOutcome {
        self.outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

/// Notifier stub that counts deliveries instead of sending anything.
#[derive(Default)]
pub struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    pub fn sent(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    fn channel(&self) -> &'static str {
        "counting"
    }

    async fn notify(&self, _title: &str, _body: &str) -> anyhow::Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Thresholds with an interval long enough that monitors only probe when
/// explicitly told to via `probe_now`.
pub fn parked_thresholds(alert_threshold: usize, ping_threshold_ms: f64) -> SharedThresholds {
    shared_thresholds(Thresholds {
        ping_threshold_ms,
        alert_threshold,
        interval_seconds: 3600,
    })
}

pub struct TestRig {
    pub deps: MonitorDeps,
    pub notifier: Arc<CountingNotifier>,
    pub record_rx: broadcast::Receiver<PingRecord>,
}

/// Wire up monitor dependencies around a stub prober and counting notifier.
pub fn test_deps(
    prober: Arc<dyn Prober>,
    alert_threshold: usize,
    ping_threshold_ms: f64,
) -> TestRig {
    let notifier = Arc::new(CountingNotifier::default());
    let (record_tx, record_rx) = broadcast::channel(256);

    let deps = MonitorDeps {
        thresholds: parked_thresholds(alert_threshold, ping_threshold_ms),
        prober,
        alerts: AlertManager::with_notifiers(vec![notifier.clone() as Arc<dyn Notifier>]),
        record_tx,
    };

    TestRig {
        deps,
        notifier,
        record_rx,
    }
}

/// Drain all records already sitting in the broadcast channel.
pub fn drain_records(rx: &mut broadcast::Receiver<PingRecord>) -> Vec<PingRecord> {
    let mut records = Vec::new();
    while let Ok(record) = rx.try_recv() {
        records.push(record);
    }
    records
}
