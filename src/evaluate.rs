//! Per-cycle classification of a probe outcome
//!
//! ## Consecutive-event counters
//!
//! Two counters drive alerting, and the alert threshold acts as a repeating
//! trigger, not a one-shot latch:
//!
//! ```text
//! Probe failed:
//!   failures += 1, latency counter = 0
//!   failures >= threshold        -> fire failure alert, failures = 0
//!
//! Probe succeeded, latency > threshold:
//!   failures = 0, latency counter += 1
//!   latency counter >= threshold -> fire latency alert, latency counter = 0
//!
//! Probe succeeded, latency <= threshold:
//!   both counters = 0
//! ```
//!
//! So a run of N consecutive bad events fires exactly N / threshold alerts
//! and leaves the counter at N % threshold.

use crate::{ProbeOutcome, StatusKind};

/// Mutable per-target alert state, owned exclusively by that target's monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertCounters {
    pub consecutive_failures: usize,
    pub consecutive_latency_alerts: usize,
}

/// Alert to fire as a result of one cycle's classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertKind {
    /// `attempts` consecutive probes failed
    Failure { attempts: usize },

    /// Latency exceeded the threshold for the configured number of cycles
    HighLatency { latency_ms: f64 },
}

/// Result of classifying a single probe outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub status: StatusKind,
    pub alert: Option<AlertKind>,
}

/// Classify one probe outcome and advance the counters.
///
/// Pure except for the counter mutation - no I/O, so the alert policy is
/// testable in isolation from the monitor loop.
pub fn classify(
    outcome: ProbeOutcome,
    ping_threshold_ms: f64,
    alert_threshold: usize,
    counters: &mut AlertCounters,
) -> Classification {
    if !outcome.success {
        counters.consecutive_failures += 1;
        counters.consecutive_latency_alerts = 0;

        if counters.consecutive_failures >= alert_threshold {
            let attempts = counters.consecutive_failures;
            counters.consecutive_failures = 0;
            return Classification {
                status: StatusKind::PingFailure,
                alert: Some(AlertKind::Failure { attempts }),
            };
        }

        return Classification {
            status: StatusKind::PingFailure,
            alert: None,
        };
    }

    counters.consecutive_failures = 0;
    let latency_ms = outcome.latency_ms.unwrap_or(0.0);

    if latency_ms > ping_threshold_ms {
        counters.consecutive_latency_alerts += 1;

        if counters.consecutive_latency_alerts >= alert_threshold {
            counters.consecutive_latency_alerts = 0;
            return Classification {
                status: StatusKind::HighLatency,
                alert: Some(AlertKind::HighLatency { latency_ms }),
            };
        }

        return Classification {
            status: StatusKind::HighLatency,
            alert: None,
        };
    }

    counters.consecutive_latency_alerts = 0;
    Classification {
        status: StatusKind::Success,
        alert: None,
    }
}
