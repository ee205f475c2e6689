//! Actor-based monitoring engine
//!
//! Every component runs as an independent tokio task communicating via
//! channels. Commands travel over per-actor mpsc channels; observations fan
//! out over one broadcast channel.
//!
//! ```text
//!   ConfigWatcher ──(reconcile)──▶ Reconciler ──(spawn/stop)──▶ TargetMonitor-1..N
//!                                                                     │
//!                                                    PingRecord broadcast channel
//!                                                                     │
//!                                                                 Recorder ──▶ StorageBackend
//! ```
//!
//! ## Actor types
//!
//! - **TargetMonitorActor**: one per target; probe/alert/record cycle
//! - **Reconciler**: diffs the desired target set against the running one
//! - **ConfigWatcherActor**: polls the config file for changes
//! - **RecorderActor**: batches records into the storage backend
//!
//! ## Communication patterns
//!
//! 1. **Commands**: each actor has an mpsc command channel for control
//! 2. **Events**: monitors publish `PingRecord`s to a broadcast channel
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod config_watcher;
pub mod messages;
pub mod reconciler;
pub mod recorder;
pub mod target_monitor;
