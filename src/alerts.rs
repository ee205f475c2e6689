//! Alert delivery channels
//!
//! Three channels mirror the classic desktop ping-monitor setup: a desktop
//! notification, an SMTP email and an audible alert. Every channel is
//! best-effort and independent - a failing channel is logged and never blocks
//! the others, and no delivery failure ever reaches the monitor loop.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::process::Command;
use tracing::{debug, error, instrument, warn};

use crate::config::{AlertConfig, EmailConfig, SoundConfig};

/// Environment variable holding the SMTP password (kept out of the config file).
const SMTP_PASSWORD: &str = "SMTP_PASSWORD";

/// A single alert delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name for logging
    fn channel(&self) -> &'static str;

    async fn notify(&self, title: &str, body: &str) -> anyhow::Result<()>;
}

/// Desktop notification via the platform notifier utility.
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn command(title: &str, body: &str) -> Command {
        let mut cmd;
        if cfg!(target_os = "macos") {
            cmd = Command::new("osascript");
            cmd.arg("-e").arg(format!(
                "display notification \"{}\" with title \"{}\"",
                body.replace('"', "'"),
                title.replace('"', "'")
            ));
        } else {
            cmd = Command::new("notify-send");
            cmd.arg(title).arg(body);
        }
        cmd
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn channel(&self) -> &'static str {
        "desktop"
    }

    async fn notify(&self, title: &str, body: &str) -> anyhow::Result<()> {
        let status = Self::command(title, body)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .context("failed to spawn desktop notifier")?;

        anyhow::ensure!(status.success(), "desktop notifier exited with {status}");
        Ok(())
    }
}

/// Email alerts over SMTP (STARTTLS).
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    receiver: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> anyhow::Result<Self> {
        let password = std::env::var(SMTP_PASSWORD)
            .context("SMTP_PASSWORD not set - email alerts need it in the environment or .env")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .context("invalid SMTP server")?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.sender.clone(), password))
            .build();

        Ok(Self {
            transport,
            sender: config.sender.parse().context("invalid sender address")?,
            receiver: config.receiver.parse().context("invalid receiver address")?,
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn notify(&self, title: &str, body: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(self.receiver.clone())
            .subject(title)
            .body(body.to_string())
            .context("failed to build email")?;

        self.transport
            .send(message)
            .await
            .context("SMTP send failed")?;

        Ok(())
    }
}

/// Audible alert: spawns the configured player on the alert sound file.
pub struct SoundNotifier {
    player: String,
    file: PathBuf,
}

impl SoundNotifier {
    pub fn new(config: &SoundConfig) -> Self {
        Self {
            player: config.player.clone(),
            file: config.file.clone(),
        }
    }
}

#[async_trait]
impl Notifier for SoundNotifier {
    fn channel(&self) -> &'static str {
        "sound"
    }

    async fn notify(&self, _title: &str, _body: &str) -> anyhow::Result<()> {
        let status = Command::new(&self.player)
            .arg(&self.file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .context("failed to spawn audio player")?;

        anyhow::ensure!(status.success(), "audio player exited with {status}");
        Ok(())
    }
}

/// Fans an alert out to every configured channel.
#[derive(Clone, Default)]
pub struct AlertManager {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl std::fmt::Debug for AlertManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels: Vec<_> = self.notifiers.iter().map(|n| n.channel()).collect();
        f.debug_struct("AlertManager")
            .field("channels", &channels)
            .finish()
    }
}

impl AlertManager {
    /// Build the channel set from the alert configuration. A channel that
    /// cannot be constructed (e.g. missing SMTP password) is skipped with a
    /// warning rather than preventing startup.
    pub fn from_config(config: &AlertConfig) -> Self {
        let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();

        if config.desktop {
            notifiers.push(Arc::new(DesktopNotifier));
        }

        if let Some(email) = &config.email {
            match EmailNotifier::new(email) {
                Ok(notifier) => notifiers.push(Arc::new(notifier)),
                Err(e) => warn!("email alerts disabled: {e:#}"),
            }
        }

        if let Some(sound) = &config.sound {
            notifiers.push(Arc::new(SoundNotifier::new(sound)));
        }

        if notifiers.is_empty() {
            debug!("no alert channels configured");
        }

        Self { notifiers }
    }

    /// Inject channels directly (tests use this with counting stubs).
    pub fn with_notifiers(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    #[instrument(skip(self))]
    pub async fn send_failure_alert(&self, target: &str, attempts: usize) {
        let title = format!("{target} - Ping Failure Warning");
        let body = format!("Could not reach {target} after {attempts} attempts.");
        self.dispatch(&title, &body).await;
    }

    #[instrument(skip(self))]
    pub async fn send_latency_alert(&self, target: &str, latency_ms: f64) {
        let title = format!("{target} - High Latency Warning");
        let body = format!("{target} latency reached {latency_ms:.2} ms.");
        self.dispatch(&title, &body).await;
    }

    /// Deliver to every channel concurrently; each outcome is independent.
    async fn dispatch(&self, title: &str, body: &str) {
        let sends = self.notifiers.iter().map(|notifier| async move {
            if let Err(e) = notifier.notify(title, body).await {
                error!("{} alert failed: {e:#}", notifier.channel());
            } else {
                debug!("{} alert sent", notifier.channel());
            }
        });

        futures::future::join_all(sends).await;
    }
}
