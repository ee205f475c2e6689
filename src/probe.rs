//! Probe adapter - resolves target names and performs reachability checks
//!
//! The probe shells out to the platform `ping` utility and parses its output,
//! which keeps the check unprivileged (raw ICMP sockets need CAP_NET_RAW).
//! A hard timeout bounds every invocation regardless of target responsiveness.

use std::net::IpAddr;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{instrument, trace, warn};

use crate::ProbeOutcome;

/// Upper bound on a single probe invocation. The `ping` process is killed if
/// it has not exited by then and the probe is reported as a failure.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Name resolution failed - a transient condition distinct from probe failure.
#[derive(Debug)]
pub struct ResolutionError {
    pub target: String,
    pub source: std::io::Error,
}

impl std::fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to resolve '{}': {}", self.target, self.source)
    }
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Reachability probe interface.
///
/// `probe` never errors on ordinary network failure - an unreachable host is
/// a successful check with `success == false`. Implementations must bound
/// their own execution time.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn resolve(&self, target: &str) -> Result<IpAddr, ResolutionError>;

    async fn probe(&self, address: IpAddr) -> ProbeOutcome;
}

/// Probe via the system `ping` utility.
pub struct SystemPinger;

fn latency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)time[=<]\s*(\d+(?:\.\d+)?)\s*(ms|s)?").expect("latency regex is valid")
    })
}

/// Extract the round-trip time in milliseconds from ping output.
///
/// Matches both `time=12.3 ms` (Linux/macOS) and `time<1ms` (Windows); a
/// bare `s` unit is converted to milliseconds.
pub fn parse_latency_ms(output: &str) -> Option<f64> {
    let captures = latency_regex().captures(output)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;

    match captures.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(unit) if unit == "s" => Some(value * 1000.0),
        _ => Some(value),
    }
}

fn ping_args(address: IpAddr) -> Vec<String> {
    let count_flag = if cfg!(windows) { "-n" } else { "-c" };
    vec![
        count_flag.to_string(),
        "1".to_string(),
        address.to_string(),
    ]
}

#[async_trait]
impl Prober for SystemPinger {
    #[instrument(skip(self))]
    async fn resolve(&self, target: &str) -> Result<IpAddr, ResolutionError> {
        // lookup_host requires a port; it is irrelevant for resolution
        let mut addrs = tokio::net::lookup_host((target, 0))
            .await
            .map_err(|source| ResolutionError {
                target: target.to_string(),
                source,
            })?;

        addrs
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| ResolutionError {
                target: target.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "resolver returned no addresses",
                ),
            })
    }

    #[instrument(skip(self))]
    async fn probe(&self, address: IpAddr) -> ProbeOutcome {
        let invocation = Command::new("ping")
            .args(ping_args(address))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(PROBE_TIMEOUT, invocation).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("failed to spawn ping for {address}: {e}");
                return ProbeOutcome::failure();
            }
            Err(_) => {
                trace!("ping for {address} exceeded {PROBE_TIMEOUT:?}");
                return ProbeOutcome::failure();
            }
        };

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        match parse_latency_ms(&combined) {
            Some(latency_ms) => ProbeOutcome::success(latency_ms),
            None => ProbeOutcome::failure(),
        }
    }
}
