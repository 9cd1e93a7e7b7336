// tests/integration/gating_tests.rs
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use facewatch::{
    cache::MemoryCache,
    core::gating::{EffectKind, Gate, GateOutcome},
};

async fn race(gate: Arc<Gate>, runs: Arc<AtomicUsize>, contenders: usize) -> Vec<GateOutcome> {
    let tasks = (0..contenders).map(|_| {
        let gate = gate.clone();
        let runs = runs.clone();
        tokio::spawn(async move {
            gate.try_run(
                EffectKind::Alert,
                "p1",
                "cam-1",
                Duration::from_secs(10),
                move || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(())
                },
            )
            .await
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .map(|outcome| outcome.expect("gate task panicked"))
        .collect()
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_atomic_gate_admits_single_contender() {
    let gate = Arc::new(Gate::new(Arc::new(MemoryCache::new()), true));
    let runs = Arc::new(AtomicUsize::new(0));

    let outcomes = race(gate, runs.clone(), 16).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(
        outcomes.iter().filter(|o| **o == GateOutcome::Executed).count(),
        1
    );
    assert_eq!(
        outcomes.iter().filter(|o| **o == GateOutcome::Suppressed).count(),
        15
    );
}

async fn attempt(gate: &Gate, runs: &AtomicUsize, kind: EffectKind, ttl_secs: u64) -> GateOutcome {
    gate.try_run(kind, "p1", "cam-1", Duration::from_secs(ttl_secs), move || async move {
        runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .await
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_windows_follow_configured_ttls() {
    let gate = Gate::new(Arc::new(MemoryCache::new()), false);
    let runs = AtomicUsize::new(0);

    assert_eq!(attempt(&gate, &runs, EffectKind::Alert, 10).await, GateOutcome::Executed);
    assert_eq!(attempt(&gate, &runs, EffectKind::ActivityLog, 120).await, GateOutcome::Executed);

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(attempt(&gate, &runs, EffectKind::Alert, 10).await, GateOutcome::Executed);
    assert_eq!(attempt(&gate, &runs, EffectKind::ActivityLog, 120).await, GateOutcome::Suppressed);

    tokio::time::advance(Duration::from_secs(110)).await;
    assert_eq!(attempt(&gate, &runs, EffectKind::ActivityLog, 120).await, GateOutcome::Executed);
    assert_eq!(runs.load(Ordering::SeqCst), 4);
}
