use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory ring buffer (no persistence)
    Memory,

    /// SQLite database (default for most deployments)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,

        /// Retention period in days (records older than this are deleted)
        #[serde(default = "default_retention_days")]
        retention_days: u32,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./ping_records.db")
}

fn default_retention_days() -> u32 {
    30
}

/// Alerting thresholds and probe cadence.
///
/// These are hot-reloadable: every monitor reads them fresh at the start of
/// each cycle, so a config change takes effect on the very next iteration
/// without restarting any monitor.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Thresholds {
    /// Latency above this (ms) classifies a successful probe as High Latency
    #[serde(default = "default_ping_threshold_ms")]
    pub ping_threshold_ms: f64,

    /// Consecutive same-kind bad events required to fire an alert
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: usize,

    /// Seconds between probe cycles for every target
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ping_threshold_ms: default_ping_threshold_ms(),
            alert_threshold: default_alert_threshold(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

fn default_ping_threshold_ms() -> f64 {
    100.0
}

fn default_alert_threshold() -> usize {
    3
}

fn default_interval_seconds() -> u64 {
    30
}

/// Shared, hot-reloadable view of the thresholds.
///
/// The config watcher replaces the value in place; monitors take a read lock
/// once per cycle and work with a copy for the rest of the cycle.
pub type SharedThresholds = Arc<RwLock<Thresholds>>;

pub fn shared_thresholds(thresholds: Thresholds) -> SharedThresholds {
    Arc::new(RwLock::new(thresholds))
}

/// Email alert channel settings. The SMTP password is deliberately not part
/// of the config file; it is read from the `SMTP_PASSWORD` environment
/// variable (loaded from `.env` at startup).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub sender: String,
    pub receiver: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// Sound alert channel settings.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SoundConfig {
    /// Audio file to play when an alert fires
    pub file: PathBuf,

    /// Player command to spawn (e.g. "paplay", "afplay")
    #[serde(default = "default_player")]
    pub player: String,
}

fn default_player() -> String {
    String::from("paplay")
}

/// Alert delivery configuration. Every channel is optional and independent;
/// a missing channel simply never fires.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub desktop: bool,
    pub email: Option<EmailConfig>,
    pub sound: Option<SoundConfig>,
}

/// API server configuration
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_bind")]
    pub bind: String,
}

fn default_api_bind() -> String {
    String::from("127.0.0.1:8080")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Desired set of monitored targets (hostnames)
    #[serde(default)]
    pub targets: BTreeSet<String>,

    #[serde(default)]
    pub thresholds: Thresholds,

    /// Storage configuration (optional - defaults to SQLite)
    pub storage: Option<StorageConfig>,

    #[serde(default)]
    pub alerts: AlertConfig,

    /// Query API (optional - disabled when absent)
    pub api: Option<ApiConfig>,
}

pub fn read_config_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("invalid configuration file: {e}"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}
