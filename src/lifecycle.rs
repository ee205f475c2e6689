//! Shutdown coordination
//!
//! The coordinator owns the top-level handles and tears the system down in
//! dependency order: first the config watcher (so no reconcile can race the
//! teardown), then every target monitor (so no new records are produced),
//! and the recorder last (so every record already in flight is flushed
//! before the backend closes).

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::actors::{
    config_watcher::WatcherHandle, reconciler::Reconciler, recorder::RecorderHandle,
};

const RECORDER_STOP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Coordinator {
    watcher: Mutex<Option<WatcherHandle>>,
    reconciler: Arc<Reconciler>,
    recorder: RecorderHandle,
    recorder_join: Mutex<Option<JoinHandle<()>>>,
    finished: AtomicBool,
}

impl Coordinator {
    pub fn new(
        watcher: WatcherHandle,
        reconciler: Arc<Reconciler>,
        recorder: RecorderHandle,
        recorder_join: JoinHandle<()>,
    ) -> Self {
        Self {
            watcher: Mutex::new(Some(watcher)),
            reconciler,
            recorder,
            recorder_join: Mutex::new(Some(recorder_join)),
            finished: AtomicBool::new(false),
        }
    }

    /// Tear everything down. Safe to call more than once; only the first
    /// call does any work.
    pub async fn shutdown(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            debug!("shutdown already performed");
            return;
        }

        info!("shutting down");

        if let Some(watcher) = self.watcher.lock().await.take() {
            watcher.stop().await;
        }

        self.reconciler.stop_all().await;

        self.recorder.shutdown().await;
        if let Some(join) = self.recorder_join.lock().await.take() {
            if tokio::time::timeout(RECORDER_STOP_TIMEOUT, join).await.is_err() {
                warn!("recorder did not stop in time");
            }
        }

        info!("shutdown complete");
    }
}
