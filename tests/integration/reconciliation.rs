//! Reconciler behavior: diffing the desired target set against the running
//! monitors.

use std::collections::BTreeSet;
use std::sync::Arc;

use pingwarden::actors::reconciler::Reconciler;
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn targets(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn starts_monitors_for_new_targets() {
    let rig = test_deps(Arc::new(ScriptedProber::new([])), 3, 100.0);
    let reconciler = Reconciler::new(rig.deps);

    let summary = reconciler.reconcile(&targets(&["a.example", "b.example"])).await;

    assert_eq!(summary.started, vec!["a.example", "b.example"]);
    assert!(summary.stopped.is_empty());
    assert_eq!(
        reconciler.running_targets().await,
        vec!["a.example", "b.example"]
    );

    reconciler.stop_all().await;
}

#[tokio::test]
async fn identical_set_is_a_noop() {
    let rig = test_deps(Arc::new(ScriptedProber::new([])), 3, 100.0);
    let reconciler = Reconciler::new(rig.deps);

    let desired = targets(&["a.example", "b.example"]);
    reconciler.reconcile(&desired).await;
    let summary = reconciler.reconcile(&desired).await;

    assert!(summary.is_noop());

    reconciler.stop_all().await;
}

#[tokio::test]
async fn removed_target_stops_and_readding_starts_fresh() {
    let rig = test_deps(Arc::new(ScriptedProber::always_failing()), 10, 100.0);
    let reconciler = Reconciler::new(rig.deps);

    reconciler.reconcile(&targets(&["a.example"])).await;

    // Build up some state on the original monitor.
    reconciler.probe_now("a.example").await.unwrap();
    let state = reconciler.probe_now("a.example").await.unwrap();
    assert_eq!(state.consecutive_failures, 3);
    assert_eq!(state.next_attempt, 4);

    let summary = reconciler.reconcile(&targets(&[])).await;
    assert_eq!(summary.stopped, vec!["a.example"]);
    assert!(reconciler.running_targets().await.is_empty());

    // Re-adding spawns a brand new monitor with zeroed counters and attempt
    // numbering starting over.
    reconciler.reconcile(&targets(&["a.example"])).await;
    let state = reconciler.monitor_state("a.example").await.unwrap();
    assert_eq!(state.consecutive_failures, 1, "only the spawn cycle ran");
    assert_eq!(state.next_attempt, 2);

    reconciler.stop_all().await;
}

#[tokio::test]
async fn partial_update_only_touches_the_difference() {
    let rig = test_deps(Arc::new(ScriptedProber::always_failing()), 10, 100.0);
    let reconciler = Reconciler::new(rig.deps);

    reconciler.reconcile(&targets(&["a.example", "b.example"])).await;

    // Accumulate failures on the monitor that survives the update.
    reconciler.probe_now("a.example").await.unwrap();
    let before = reconciler.monitor_state("a.example").await.unwrap();

    let summary = reconciler
        .reconcile(&targets(&["a.example", "c.example"]))
        .await;
    assert_eq!(summary.started, vec!["c.example"]);
    assert_eq!(summary.stopped, vec!["b.example"]);

    // The surviving monitor kept its counters.
    let after = reconciler.monitor_state("a.example").await.unwrap();
    assert_eq!(before, after);

    reconciler.stop_all().await;
}

#[tokio::test]
async fn stop_all_drains_every_monitor() {
    let rig = test_deps(Arc::new(ScriptedProber::new([])), 3, 100.0);
    let reconciler = Reconciler::new(rig.deps);

    reconciler
        .reconcile(&targets(&["a.example", "b.example", "c.example"]))
        .await;
    assert_eq!(reconciler.running_targets().await.len(), 3);

    reconciler.stop_all().await;
    assert!(reconciler.running_targets().await.is_empty());
    assert!(!reconciler.is_monitored("a.example").await);
}
